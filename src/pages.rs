//! Page-range expressions such as `1,3,5-10`, `7-`, `end`, or `all`.
//!
//! Page numbers are 1-based, matching the keys of [`lopdf::Document::get_pages`].

use crate::error::{Error, Result};

/// Parses `spec` against a document of `total_pages` pages.
///
/// The result is sorted and free of duplicates. Reversed ranges (`5-2`) are
/// accepted and mean the same as their forward form. An empty or blank spec
/// selects nothing.
pub fn parse_page_ranges(spec: &str, total_pages: usize) -> Result<Vec<usize>> {
    let trimmed = spec.trim();
    if trimmed.eq_ignore_ascii_case("all") {
        return Ok((1..=total_pages).collect());
    }

    let mut pages = Vec::new();
    for part in trimmed.split(',') {
        let part = part.trim().to_ascii_lowercase();
        if part.is_empty() {
            continue;
        }

        if part.contains('-') {
            let bounds: Vec<&str> = part.split('-').collect();
            if bounds.len() != 2 {
                return Err(Error::page_range(spec, format!("invalid range syntax '{part}'")));
            }

            let start_str = bounds[0].trim();
            let end_str = bounds[1].trim();
            if start_str.is_empty() {
                return Err(Error::page_range(
                    spec,
                    format!("range '{part}' has no start page"),
                ));
            }

            let start = parse_page(spec, start_str, total_pages)?;
            let end = if end_str.is_empty() {
                if total_pages == 0 {
                    return Err(Error::page_range(spec, "document has no pages"));
                }
                total_pages
            } else {
                parse_page(spec, end_str, total_pages)?
            };

            let (low, high) = if start <= end { (start, end) } else { (end, start) };
            pages.extend(low..=high);
        } else {
            pages.push(parse_page(spec, &part, total_pages)?);
        }
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn parse_page(spec: &str, token: &str, total_pages: usize) -> Result<usize> {
    let page = if token == "end" {
        total_pages
    } else {
        token
            .parse::<usize>()
            .map_err(|_| Error::page_range(spec, format!("invalid page number '{token}'")))?
    };

    if total_pages == 0 {
        return Err(Error::page_range(spec, "document has no pages"));
    }
    if page < 1 || page > total_pages {
        return Err(Error::page_range(
            spec,
            format!("page {page} is out of range (1-{total_pages})"),
        ));
    }
    Ok(page)
}

/// True when `pages` has no gaps.
pub fn is_contiguous(pages: &[usize]) -> bool {
    pages.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Short human description of a page selection for log lines.
pub fn describe(pages: &[usize]) -> String {
    match pages {
        [] => "no pages".to_string(),
        [only] => format!("page {only}"),
        _ if pages.len() <= 20 => format!("pages {pages:?}"),
        _ if is_contiguous(pages) => format!("pages {} to {}", pages[0], pages[pages.len() - 1]),
        _ => format!(
            "{} pages (including {}, {}, ..., {})",
            pages.len(),
            pages[0],
            pages[1],
            pages[pages.len() - 1]
        ),
    }
}
