//! Path resolver (C7, §4.7): classifies a dotted module name against a
//! read-only snapshot of configured search paths and typeshed-style stub
//! directories. Pure filesystem classification; no caching, no locking — that
//! is [`crate::cache`]'s job.

use std::path::{Path, PathBuf};

use pysem_core::version::PythonVersion;

/// §4.7 "names ending with `-stubs` are treated as directories regardless of
/// init": the standalone stub-package naming convention.
const STUB_PACKAGE_SUFFIX: &str = "-stubs";

/// Extensions recognised as native extension modules (§4.7 "Compiled").
const COMPILED_EXTENSIONS: &[&str] = &["so", "pyd", "dll"];

/// Result of classifying a dotted module name against the search paths,
/// before any disk-cache or stub fusion is applied (§4.7 "Resolution").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedModule {
    /// A single resolved source file.
    Module(PathBuf),
    /// A directory with no init file, under a Python version where that's a
    /// namespace-package candidate rather than a plain miss.
    PossibleModule,
    /// A dotted import resolved against an already-known namespace package.
    PackageImport(PathBuf),
    /// The interpreter's own builtins module.
    Builtin,
    /// A native extension module: must be scraped out-of-process (§4.7,
    /// §4.8) rather than parsed.
    Compiled(PathBuf),
    NotFound,
}

/// A read-only snapshot of the configured search paths plus typeshed-style
/// stub directories, used to classify dotted module names (§4.7).
#[derive(Debug, Clone)]
pub struct PathResolver {
    search_paths: Vec<PathBuf>,
    stub_paths: Vec<PathBuf>,
    version: PythonVersion,
}

impl PathResolver {
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>, stub_paths: Vec<PathBuf>, version: PythonVersion) -> Self {
        Self { search_paths, stub_paths, version }
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// §4.7 "Resolution": search paths are scanned in configured order; the
    /// first classification that isn't a clean miss wins.
    #[must_use]
    pub fn resolve(&self, dotted_name: &str) -> ResolvedModule {
        if dotted_name == "builtins" || dotted_name == "__builtin__" {
            return ResolvedModule::Builtin;
        }

        let relative = dotted_to_relative(dotted_name);
        for root in &self.search_paths {
            if let Some(found) = self.classify_under(root, &relative, dotted_name) {
                return found;
            }
        }
        ResolvedModule::NotFound
    }

    /// §4.7 "Typeshed-style stubs": additionally search
    /// `{path}/stdlib/{version_string|major|"2and3"}` and
    /// `{path}/third_party/{...}` for a `.pyi` stub.
    #[must_use]
    pub fn resolve_stub(&self, dotted_name: &str) -> Option<PathBuf> {
        let relative = dotted_to_relative(dotted_name);
        let version_dirs =
            [format!("{}.{}", self.version.major, self.version.minor), self.version.major.to_string(), "2and3".to_string()];
        for stub_root in &self.stub_paths {
            for area in ["stdlib", "third_party"] {
                for version_dir in &version_dirs {
                    let base = stub_root.join(area).join(version_dir);
                    if let Some(path) = find_pyi(&base, &relative) {
                        return Some(path);
                    }
                }
            }
        }
        None
    }

    /// §4.2 "M is a namespace package": enumerate the submodule names visible
    /// under `dotted_name`'s directory across every search path root (a PEP
    /// 420 namespace package may have contributions from more than one).
    /// Returns `None` when no search path has a matching directory at all.
    #[must_use]
    pub fn namespace_children(&self, dotted_name: &str) -> Option<Vec<String>> {
        let relative = dotted_to_relative(dotted_name);
        let mut children = std::collections::BTreeSet::new();
        let mut any_dir = false;
        for root in &self.search_paths {
            let dir = root.join(&relative);
            let Ok(entries) = std::fs::read_dir(&dir) else { continue };
            any_dir = true;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        children.insert(name.to_string());
                    }
                } else if path.extension().is_some_and(|ext| ext == "py" || ext == "pyi")
                    && let Some(stem) = path.file_stem().and_then(|n| n.to_str())
                    && stem != "__init__"
                {
                    children.insert(stem.to_string());
                }
            }
        }
        any_dir.then(|| children.into_iter().collect())
    }

    fn classify_under(&self, root: &Path, relative: &Path, dotted_name: &str) -> Option<ResolvedModule> {
        let as_module = root.join(relative).with_extension("py");
        if as_module.is_file() {
            return Some(ResolvedModule::Module(as_module));
        }

        for ext in COMPILED_EXTENSIONS {
            let compiled = root.join(relative).with_extension(ext);
            if compiled.is_file() {
                return Some(ResolvedModule::Compiled(compiled));
            }
        }

        let package_dir = root.join(relative);
        let is_stub_package = dotted_name.ends_with(STUB_PACKAGE_SUFFIX);
        let dir = if is_stub_package { stub_suffixed(root, relative) } else { package_dir.clone() };
        let Some(dir) = dir else { return None };
        if !dir.is_dir() {
            return None;
        }

        let init_py = dir.join("__init__.py");
        let init_pyi = dir.join("__init__.pyi");
        if init_py.is_file() {
            return Some(ResolvedModule::Module(init_py));
        }
        if init_pyi.is_file() {
            return Some(ResolvedModule::Module(init_pyi));
        }
        // §4.7: "package-ness is determined by presence of an init file (if
        // the language version requires it) or directory existence
        // otherwise" — a `-stubs` directory is always a package regardless
        // of init; an ordinary directory with no init is a PEP 420
        // namespace-package candidate from Python 3 on, and not a package at
        // all under Python 2.
        if is_stub_package {
            return Some(ResolvedModule::PackageImport(dir));
        }
        if self.version.is_py2() {
            return None;
        }
        Some(ResolvedModule::PossibleModule)
    }
}

fn dotted_to_relative(dotted_name: &str) -> PathBuf {
    dotted_name.split('.').collect::<PathBuf>()
}

fn find_pyi(base: &Path, relative: &Path) -> Option<PathBuf> {
    let as_module = base.join(relative).with_extension("pyi");
    if as_module.is_file() {
        return Some(as_module);
    }
    let as_package = base.join(relative).join("__init__.pyi");
    if as_package.is_file() { Some(as_package) } else { None }
}

fn stub_suffixed(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut components: Vec<_> = relative.components().collect();
    let last = components.pop()?;
    let last_name = last.as_os_str().to_str()?;
    let mut dir = root.to_path_buf();
    for component in &components {
        dir.push(component);
    }
    dir.push(format!("{last_name}{STUB_PACKAGE_SUFFIX}"));
    Some(dir)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn resolver(root: &Path) -> PathResolver {
        PathResolver::new(vec![root.to_path_buf()], Vec::new(), PythonVersion::new(3, 11))
    }

    #[test]
    fn resolves_a_plain_module_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("foo.py"), "x = 1").unwrap();

        assert_eq!(resolver(dir.path()).resolve("foo"), ResolvedModule::Module(dir.path().join("foo.py")));
    }

    #[test]
    fn resolves_a_package_with_init() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg").join("__init__.py"), "").unwrap();

        assert_eq!(resolver(dir.path()).resolve("pkg"), ResolvedModule::Module(dir.path().join("pkg").join("__init__.py")));
    }

    #[test]
    fn directory_without_init_is_a_possible_module_on_py3() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ns")).unwrap();

        assert_eq!(resolver(dir.path()).resolve("ns"), ResolvedModule::PossibleModule);
    }

    #[test]
    fn directory_without_init_is_not_found_on_py2() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ns")).unwrap();
        let py2 = PathResolver::new(vec![dir.path().to_path_buf()], Vec::new(), PythonVersion::new(2, 7));

        assert_eq!(py2.resolve("ns"), ResolvedModule::NotFound);
    }

    #[test]
    fn stubs_suffixed_directory_is_a_package_regardless_of_init() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("foo-stubs")).unwrap();

        match resolver(dir.path()).resolve("foo-stubs") {
            ResolvedModule::PackageImport(_) => {}
            other => panic!("expected PackageImport, got {other:?}"),
        }
    }

    #[test]
    fn resolve_stub_finds_the_typeshed_layout() {
        let dir = tempdir().unwrap();
        let stub_root = dir.path().join("stubs");
        let stdlib_3_11 = stub_root.join("stdlib").join("3.11");
        std::fs::create_dir_all(&stdlib_3_11).unwrap();
        std::fs::write(stdlib_3_11.join("os.pyi"), "").unwrap();

        let resolver = PathResolver::new(Vec::new(), vec![stub_root.clone()], PythonVersion::new(3, 11));
        assert_eq!(resolver.resolve_stub("os"), Some(stdlib_3_11.join("os.pyi")));
    }

    #[test]
    fn unresolvable_name_is_not_found() {
        let dir = tempdir().unwrap();
        assert_eq!(resolver(dir.path()).resolve("nope"), ResolvedModule::NotFound);
    }

    #[test]
    fn namespace_children_lists_submodules_and_subpackages() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ns")).unwrap();
        std::fs::write(dir.path().join("ns").join("a.py"), "").unwrap();
        std::fs::create_dir(dir.path().join("ns").join("sub")).unwrap();

        let mut children = resolver(dir.path()).namespace_children("ns").unwrap();
        children.sort();
        assert_eq!(children, vec!["a".to_string(), "sub".to_string()]);
    }

    #[test]
    fn namespace_children_is_none_for_a_nonexistent_directory() {
        let dir = tempdir().unwrap();
        assert_eq!(resolver(dir.path()).namespace_children("nope"), None);
    }
}
