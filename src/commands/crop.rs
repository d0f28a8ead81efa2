//! Centered crop of every page to a fixed physical size.

use crate::document::{self, deref, inherited_attribute};
use crate::error::{Error, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::{debug, info, warn};

pub const POINTS_PER_INCH: f32 = 72.0;
pub const DEFAULT_WIDTH_INCHES: f32 = 9.0;
pub const DEFAULT_HEIGHT_INCHES: f32 = 6.0;

/// A page box in default user space units, normalized so `ll <= ur`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    fn from_object(doc: &Document, obj: &Object) -> Option<Self> {
        let Object::Array(items) = deref(doc, obj) else {
            return None;
        };
        let coords: Vec<f32> = items
            .iter()
            .map(|item| match deref(doc, item) {
                Object::Integer(v) => Some(*v as f32),
                Object::Real(v) => Some(*v as f32),
                _ => None,
            })
            .collect::<Option<_>>()?;
        match coords.as_slice() {
            &[x0, y0, x1, y1] => Some(Self::new(x0, y0, x1, y1)),
            _ => None,
        }
    }

    fn to_object(self) -> Object {
        Object::Array(
            [self.llx, self.lly, self.urx, self.ury]
                .into_iter()
                .map(|v| Object::Real(v.into()))
                .collect(),
        )
    }
}

/// The `width` × `height` rectangle centred in `media`, shrunk to `media` in
/// any dimension where the page is smaller than the target.
pub fn centered_crop(media: Rect, width: f32, height: f32) -> Rect {
    let width = width.min(media.width());
    let height = height.min(media.height());
    let llx = media.llx + (media.width() - width) / 2.0;
    let lly = media.lly + (media.height() - height) / 2.0;
    Rect::new(llx, lly, llx + width, lly + height)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CropOutcome {
    pub pages: usize,
    pub cropped: usize,
    /// Pages smaller than the target in at least one dimension.
    pub undersized: usize,
    /// Pages left as they were because their media box was unusable.
    pub unchanged: usize,
}

pub fn run(
    input: &Path,
    output: &Path,
    width_inches: f32,
    height_inches: f32,
    overwrite: bool,
) -> Result<CropOutcome> {
    for (name, value) in [("width", width_inches), ("height", height_inches)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "crop {name} must be a positive number of inches, got {value}"
            )));
        }
    }
    document::guard_output(output, &[input], overwrite)?;

    let width = width_inches * POINTS_PER_INCH;
    let height = height_inches * POINTS_PER_INCH;
    let mut doc = document::load(input)?;
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    info!(
        pages = pages.len(),
        "cropping to {width_inches}\" x {height_inches}\" ({width:.2} x {height:.2} pt)"
    );

    let mut outcome = CropOutcome {
        pages: pages.len(),
        ..CropOutcome::default()
    };
    for (number, page_id) in pages {
        let media = inherited_attribute(&doc, page_id, b"MediaBox")
            .and_then(|(_, value)| Rect::from_object(&doc, value));
        let Some(media) = media else {
            warn!(page = number, "page has no usable /MediaBox, keeping it uncropped");
            outcome.unchanged += 1;
            continue;
        };

        if media.width() < width || media.height() < height {
            info!(
                page = number,
                "page is {:.2}\" x {:.2}\", smaller than the target; cropping to its own size",
                media.width() / POINTS_PER_INCH,
                media.height() / POINTS_PER_INCH
            );
            outcome.undersized += 1;
        }

        let crop = centered_crop(media, width, height);
        match doc.get_dictionary_mut(page_id) {
            Ok(page) => {
                page.set("CropBox", crop.to_object());
                debug!(page = number, ?crop, "set crop box");
                outcome.cropped += 1;
            }
            Err(err) => {
                warn!(page = number, "could not update page, keeping it uncropped: {err}");
                outcome.unchanged += 1;
            }
        }
    }

    document::save_atomic(&mut doc, output)?;
    Ok(outcome)
}
