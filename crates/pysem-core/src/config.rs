//! `InterpreterConfiguration` (§6, expanded in SPEC_FULL.md §4.11).

use std::path::PathBuf;

use crate::version::PythonVersion;

/// Interpreter-level configuration passed into a walk: version, executable,
/// explicit search paths, and the library path used when running `scrape`.
///
/// Loading this from a project config file (pyproject.toml, a settings JSON)
/// is explicitly out of scope (§1) — this is the in-memory value the rest of
/// the engine consumes, built by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InterpreterConfiguration {
    pub version: PythonVersion,
    pub executable: Option<PathBuf>,
    pub search_paths: Vec<PathBuf>,
    pub library_path: Option<PathBuf>,
}

impl InterpreterConfiguration {
    #[must_use]
    pub fn new(version: PythonVersion) -> Self {
        Self { version, executable: None, search_paths: Vec::new(), library_path: None }
    }

    #[must_use]
    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }
}
