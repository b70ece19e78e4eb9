//! Column-aligning SystemVerilog formatter.
//!
//! Rewrites only whitespace trivia: declaration blocks get their
//! modifiers, types, packed dimensions, names, and unpacked dimensions
//! laid out in shared columns, port lists get aligned trailing commas,
//! and instantiations get one connection per line under a nested indent.
//! The token stream is preserved byte-for-byte modulo spacing.

mod engine;
mod formatter;

pub use engine::{IndentGuard, SpacingEngine};
pub use formatter::{format_file, format_in_place, FormatOptions};
