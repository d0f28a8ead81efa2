//! One module per command. Each `run` does the work and returns what the
//! binary needs for its summary line; progress and warnings go to `tracing`.

pub mod crop;
pub mod cut;
pub mod extract;
pub mod info;
pub mod merge;
pub mod paste;
pub mod split;
pub mod toc;
