//! Source location and range model for the diplomat SystemVerilog tools.
//!
//! This crate provides the foundational position types shared by the
//! cross-reference index, the alignment formatter, and the LSP driver.
//! Locations are file/line/column triples (1-based) over canonicalized
//! paths; ranges are inclusive location pairs confined to one file.
//!
//! # Core Types
//!
//! - [`SourceLocation`] - A `(file, line, column)` triple
//! - [`SourceRange`] - An inclusive `[start, end]` pair in one file
//! - [`PathInterner`] - Canonicalizes and shares file paths
//!
//! Line/column are 1-based in this crate; the LSP boundary converts to
//! 0-based on the wire.

mod location;
mod path;
mod range;

pub use location::SourceLocation;
pub use path::{weakly_canonical, PathInterner};
pub use range::SourceRange;

use std::path::PathBuf;

/// Errors produced by the position model.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    /// A range was constructed from locations in two different files.
    #[error("range endpoints lie in different files: {start} / {end}")]
    DifferentFiles {
        /// Path of the start location.
        start: PathBuf,
        /// Path of the end location.
        end: PathBuf,
    },

    /// A location string did not have the `file:line:col` shape.
    #[error("malformed location string: {0:?}")]
    MalformedLocation(String),
}
