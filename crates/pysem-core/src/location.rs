//! Source locations and the `Locatable` capability trait (§3.1 of SPEC_FULL.md).

use std::path::PathBuf;

use ruff_text_size::TextRange;

/// A single place a symbol's declaration (or one of its declarations, for
/// names rebuilt across branches) came from.
///
/// Carries a file path (or a document URI string for in-memory buffers) plus
/// the byte range within that file/document, matching `ruff_text_size`'s
/// range representation so a location can be converted straight into an LSP
/// range by a downstream consumer without re-deriving line/column info here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    /// Absolute path of the source file, or `None` for a synthetic/builtin
    /// entity that has no backing file (e.g. a scraped module's members).
    pub path: Option<PathBuf>,
    /// Byte offset range within the file.
    pub range: TextRange,
}

impl SourceLocation {
    #[must_use]
    pub fn new(path: impl Into<Option<PathBuf>>, range: TextRange) -> Self {
        Self { path: path.into(), range }
    }

    /// A location with no backing file, used for builtins and synthesized
    /// Unknown constants (§4.1: "an Unknown-typed constant tied to the
    /// expression's source location" still needs *a* range, even a zero one).
    #[must_use]
    pub fn synthetic() -> Self {
        Self { path: None, range: TextRange::default() }
    }
}

/// Capability trait implemented by every concrete member kind so that
/// downstream consumers (go-to-definition, hover) have one place to ask
/// "where did this come from" regardless of which `Member` variant they hold.
pub trait Locatable {
    fn locations(&self) -> &[SourceLocation];
}

/// Capability trait backing the external `fully_qualified_name` API (§6).
///
/// Implemented by walking `declaring_module`/`declaring_class` back-references;
/// see `member::QualifiedNameParts` for the shared formatting helper.
pub trait HasQualifiedName {
    fn qualified_name(&self) -> String;
}
