//! Scope-aware cross-reference index for SystemVerilog designs.
//!
//! Maps every identifier occurrence in an elaborated design back to the
//! symbol it denotes, answering go-to-definition, find-references,
//! rename, and document-symbol queries.
//!
//! # Pipeline
//!
//! ```text
//! parsed files -> sv_elab::elaborate -> build_index -> resolve_references
//! ```
//!
//! [`IndexCore`] owns the scope tree and symbol registry; the build
//! visitor fills it from the elaborated tree, then the reference
//! resolver walks each file's CST to record occurrences.

mod builder;
mod core;
mod dump;
mod file;
mod resolver;
mod scope;
mod symbol;

pub use builder::{build_index, BuildError, BuildOutput};
pub use core::{IndexCore, ScopeId, SymbolId};
pub use dump::dump;
pub use file::{IndexFile, ReferenceRecord};
pub use resolver::resolve_references;
pub use scope::IndexScope;
pub use symbol::IndexSymbol;

use sv_elab::Design;
use sv_syntax::{FileId, SourceManager, SyntaxNode};

/// Builds and cross-references an index for an elaborated design in one
/// step.
pub fn index_design(
    sm: &SourceManager,
    design: &Design,
    files: &[(FileId, SyntaxNode)],
) -> Result<BuildOutput, BuildError> {
    let mut output = build_index(design)?;
    resolve_references(
        sm,
        &mut output.core,
        &output.module_scopes,
        &design.definitions,
        files,
    );
    Ok(output)
}
