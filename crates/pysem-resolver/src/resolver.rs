//! Ties C7's [`crate::pathresolver::PathResolver`] and C8's
//! [`crate::cache::ModuleCache`]/[`crate::diskcache::DiskCache`] together
//! behind the two seams the rest of the engine needs: `pysem_core`'s
//! [`ModuleProvider`] (consumed by the walker) and this crate's own
//! [`ModuleLoader`] (consumed by the cache to actually produce a module on a
//! miss). §4.7 step 4's "search path, then disk cache, then stub fuse" order
//! lives here.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use pysem_core::{
    diagnostics::{DiagnosticEvent, Diagnostics, NoopDiagnostics},
    import_provider::{ImportResolution, ModuleProvider},
    member::{Member, MemberContainer},
    scope::LookupContext,
    types::module::{ModuleMember, ModuleOrigin},
    version::PythonVersion,
    walker,
};

use crate::{
    cache::{ImportStatus, ModuleCache, ModuleLoader},
    diskcache::DiskCache,
    pathresolver::{PathResolver, ResolvedModule},
    scrape::{self, ScrapeOutcome},
};

/// Everything [`Resolver`] needs besides the filesystem itself: mirrors
/// `pysem_core::config::InterpreterConfiguration` plus the handful of extra
/// knobs C7/C8 need that don't belong on the engine-facing config type
/// (stub paths, the on-disk cache location, the scrape subprocess).
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub version: PythonVersion,
    pub search_paths: Vec<PathBuf>,
    pub stub_paths: Vec<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub interpreter: Option<PathBuf>,
    pub scrape_module: Option<PathBuf>,
    pub library_path: Option<PathBuf>,
    /// §4.7 "fuse/override with ... a stub": when set, a stub entirely
    /// replaces its code module instead of being merged over it.
    pub stubs_exclusively: bool,
    /// §5's condvar wait cap for a waiter blocked on an in-flight import;
    /// `None` uses [`ModuleCache`]'s own default. Exposed so a caller (tests,
    /// an editor integration with its own responsiveness budget) can shrink
    /// it instead of blocking for the full default.
    pub wait_cap: Option<std::time::Duration>,
}

impl ResolverConfig {
    #[must_use]
    pub fn new(version: PythonVersion) -> Self {
        Self {
            version,
            search_paths: Vec::new(),
            stub_paths: Vec::new(),
            database_path: None,
            interpreter: None,
            scrape_module: None,
            library_path: None,
            stubs_exclusively: false,
            wait_cap: None,
        }
    }

    #[must_use]
    pub fn with_wait_cap(mut self, wait_cap: std::time::Duration) -> Self {
        self.wait_cap = Some(wait_cap);
        self
    }

    #[must_use]
    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }

    #[must_use]
    pub fn with_stub_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.stub_paths.extend(paths);
        self
    }

    #[must_use]
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = Some(path);
        self
    }
}

/// The concrete `ModuleProvider` + `ModuleLoader` pair (C7+C8): resolves a
/// dotted name against search paths and typeshed-style stubs, serves
/// concurrent imports through a sentinel-backed cache, and falls back to the
/// disk cache / scrape subprocess for compiled modules.
pub struct Resolver {
    path_resolver: PathResolver,
    cache: ModuleCache,
    disk_cache: Option<DiskCache>,
    config: ResolverConfig,
    builtins: OnceLock<Arc<ModuleMember>>,
}

impl Resolver {
    #[must_use]
    pub fn new(config: ResolverConfig) -> Self {
        let path_resolver =
            PathResolver::new(config.search_paths.clone(), config.stub_paths.clone(), config.version);
        let disk_cache = config.database_path.clone().map(DiskCache::new);
        let cache = config.wait_cap.map_or_else(ModuleCache::new, ModuleCache::with_wait_cap);
        Self { path_resolver, cache, disk_cache, config, builtins: OnceLock::new() }
    }

    #[must_use]
    pub fn path_resolver(&self) -> &PathResolver {
        &self.path_resolver
    }

    /// The fully-observed entry point: resolves (and, on a miss, parses and
    /// walks) `name`, threading `diagnostics` through the whole operation —
    /// including whatever that module's own body does while it's walked.
    /// This is what a caller like `pysem-cli` should use; the `ModuleProvider`
    /// methods below only have this much surface because the walker's own
    /// call sites (§4.2) have no diagnostics parameter to give them.
    pub fn import_with_diagnostics(&self, name: &str, diagnostics: &mut dyn Diagnostics) -> ImportStatus {
        self.cache.import(name, self, diagnostics)
    }

    /// Used by the `ModuleProvider` trait methods, which the walker calls
    /// without a `Diagnostics` handle of their own. Diagnostics raised while
    /// resolving a *nested* import (triggered while walking some other
    /// module) are therefore not observable to the original caller — only
    /// the top-level module passed to [`Self::import_with_diagnostics`] gets
    /// full coverage. See `DESIGN.md` for why this is the honest tradeoff
    /// `ModuleProvider`'s fixed signature leaves available.
    fn import_module(&self, name: &str) -> ImportStatus {
        self.cache.import(name, self, &mut NoopDiagnostics)
    }

    fn builtins(&self) -> Arc<ModuleMember> {
        self.builtins.get_or_init(|| self.build_builtins()).clone()
    }

    fn build_builtins(&self) -> Arc<ModuleMember> {
        if let Some(stub_path) = self.path_resolver.resolve_stub("builtins")
            && let Ok(source) = std::fs::read_to_string(&stub_path)
            && let Some(Member::Module(module)) = self.walk_source(
                "builtins",
                &source,
                Some(&stub_path),
                ModuleOrigin::Builtin,
                &mut NoopDiagnostics,
            )
        {
            return module;
        }
        Arc::new(ModuleMember::new("builtins", ModuleOrigin::Builtin, pysem_core::location::SourceLocation::synthetic()))
    }

    /// Parses `source` and runs the full single-pass walk over it (§4.2),
    /// producing a `Member::Module`. `dotted_name == "builtins"` suppresses
    /// the builtins scope (§4.1 `suppress_builtins`) instead of recursing
    /// into [`Self::builtins`].
    fn walk_source(
        &self,
        dotted_name: &str,
        source: &str,
        path: Option<&Path>,
        origin: ModuleOrigin,
        diagnostics: &mut dyn Diagnostics,
    ) -> Option<Member> {
        let parsed = ruff_python_parser::parse_module(source).ok()?;
        let body = parsed.into_syntax().body;

        let is_stub_file = path.is_some_and(|p| p.extension().is_some_and(|ext| ext == "pyi"));
        let location = pysem_core::location::SourceLocation::new(
            path.map(Path::to_path_buf),
            ruff_text_size::TextRange::default(),
        );
        let module = Arc::new(ModuleMember::new(dotted_name, origin, location));

        let builtins = (dotted_name != "builtins").then(|| self.builtins());
        let deferred = pysem_core::deferred::DeferredWalkerSet::default();
        let mut state = walker::WalkerState {
            module: module.clone(),
            scope: LookupContext::new(builtins),
            deferred: &deferred,
            provider: self,
            diagnostics,
            python_version: self.config.version,
            path: path.map(Path::to_path_buf),
            typing_scope: std::sync::Mutex::new(indexmap::IndexMap::new()),
            is_stub_file,
        };
        walker::walk_module(&mut state, &body);
        Some(Member::Module(module))
    }

    fn parse_and_walk(&self, dotted_name: &str, path: &Path, diagnostics: &mut dyn Diagnostics) -> Option<Member> {
        let source = std::fs::read_to_string(path).ok()?;
        self.walk_source(dotted_name, &source, Some(path), ModuleOrigin::Source, diagnostics)
    }

    /// §4.7 step 4: search-path resolution, then disk cache, then stub
    /// fuse/override, by `ResolvedModule` classification.
    fn load_uncached(&self, dotted_name: &str, diagnostics: &mut dyn Diagnostics) -> Option<Member> {
        match self.path_resolver.resolve(dotted_name) {
            ResolvedModule::Builtin => Some(Member::Module(self.builtins())),
            ResolvedModule::Module(path) => self.load_from_path(dotted_name, &path, diagnostics),
            ResolvedModule::PackageImport(dir) => Some(self.load_namespace_dir(dotted_name, &dir)),
            ResolvedModule::Compiled(lib_path) => self.load_compiled(dotted_name, &lib_path, diagnostics),
            ResolvedModule::PossibleModule | ResolvedModule::NotFound => {
                self.load_from_stub_or_disk(dotted_name, diagnostics)
            }
        }
    }

    fn load_from_path(&self, dotted_name: &str, path: &Path, diagnostics: &mut dyn Diagnostics) -> Option<Member> {
        let code_module = self.parse_and_walk(dotted_name, path, diagnostics)?;
        // `typing`'s own stub is consumed directly as the typing shim module
        // (see `typing_shim_module` below), not fused over a `typing.py` body.
        if dotted_name == "typing" {
            return Some(code_module);
        }
        match self.path_resolver.resolve_stub(dotted_name) {
            Some(stub_path) => {
                diagnostics.emit(DiagnosticEvent::ImportTypeStub { module: dotted_name.to_string() });
                let stub_module = self.parse_and_walk(dotted_name, &stub_path, diagnostics)?;
                Some(self.fuse_stub(code_module, stub_module))
            }
            None => Some(code_module),
        }
    }

    /// §4.7 "fuse/override with ... a stub": stub members shadow the code
    /// module's own unless configured to use stubs exclusively. A name
    /// present in both sides isn't a plain overwrite: it goes through
    /// `multiple::fuse` (§4.6) the same way two bindings for the same name
    /// in one scope do, so a stub-only overload or a code-only one doesn't
    /// get silently dropped.
    fn fuse_stub(&self, code: Member, stub: Member) -> Member {
        if self.config.stubs_exclusively {
            return stub;
        }
        let (Member::Module(code_module), Member::Module(stub_module)) = (&code, &stub) else {
            return stub;
        };
        let fused = Arc::new(ModuleMember::new(
            code_module.name(),
            ModuleOrigin::Source,
            pysem_core::location::SourceLocation::synthetic(),
        ));
        for name in code_module.public_names() {
            if let Some(member) = code_module.get_member(&name) {
                fused.insert_raw(name, member);
            }
        }
        for name in stub_module.public_names() {
            if let Some(incoming) = stub_module.get_member(&name) {
                let merged = match fused.get_member(&name) {
                    Some(existing) => pysem_core::types::multiple::fuse(&name, existing, incoming),
                    None => incoming,
                };
                fused.insert_raw(name, merged);
            }
        }
        Member::Module(fused)
    }

    /// A namespace package directory reached through an already-confirmed
    /// dotted import (§4.7 `PackageImport`): an empty module, since there's
    /// no init body to walk.
    fn load_namespace_dir(&self, dotted_name: &str, dir: &Path) -> Member {
        let location = pysem_core::location::SourceLocation::new(dir.to_path_buf(), ruff_text_size::TextRange::default());
        Member::Module(Arc::new(ModuleMember::new(dotted_name, ModuleOrigin::Source, location)))
    }

    fn load_compiled(&self, dotted_name: &str, lib_path: &Path, diagnostics: &mut dyn Diagnostics) -> Option<Member> {
        if let Some(disk_cache) = &self.disk_cache
            && let Some(cached) = disk_cache.lookup(dotted_name, Some(lib_path))
        {
            return self.parse_and_walk(dotted_name, &cached, diagnostics);
        }

        let interpreter = self.config.interpreter.as_deref()?;
        let scrape_module = self.config.scrape_module.as_deref()?;
        let library_path = self.config.library_path.as_deref().unwrap_or(lib_path);

        match scrape::scrape(interpreter, scrape_module, dotted_name, library_path, diagnostics) {
            ScrapeOutcome::Output(source) => {
                let module = self.walk_source(dotted_name, &source, None, ModuleOrigin::Scraped, diagnostics)?;
                if let Some(disk_cache) = &self.disk_cache {
                    let cache_path = disk_cache.hashed_cache_path(lib_path);
                    diagnostics.emit(DiagnosticEvent::WriteCachedModule { module: dotted_name.to_string(), cache_path });
                }
                Some(module)
            }
            ScrapeOutcome::Failed => None,
        }
    }

    fn load_from_stub_or_disk(&self, dotted_name: &str, diagnostics: &mut dyn Diagnostics) -> Option<Member> {
        if let Some(stub_path) = self.path_resolver.resolve_stub(dotted_name) {
            diagnostics.emit(DiagnosticEvent::ImportTypeStub { module: dotted_name.to_string() });
            return self.parse_and_walk(dotted_name, &stub_path, diagnostics);
        }
        if let Some(disk_cache) = &self.disk_cache
            && let Some(cached) = disk_cache.lookup(dotted_name, None)
        {
            return self.parse_and_walk(dotted_name, &cached, diagnostics);
        }
        None
    }
}

impl ModuleLoader for Resolver {
    fn load(&self, module_name: &str, diagnostics: &mut dyn Diagnostics) -> Option<Member> {
        self.load_uncached(module_name, diagnostics)
    }
}

impl ModuleProvider for Resolver {
    fn resolve_dotted_import(&self, dotted_name: &str, current_module: &str) -> ImportResolution {
        if dotted_name == current_module {
            return ImportResolution::SelfImport;
        }
        if matches!(self.path_resolver.resolve(dotted_name), ResolvedModule::PossibleModule) {
            return ImportResolution::PossibleModule;
        }
        match self.import_module(dotted_name) {
            ImportStatus::Success(member) => ImportResolution::NestedLazy(member),
            ImportStatus::ModuleNotFound | ImportStatus::NeedRetry | ImportStatus::NotSupported | ImportStatus::Timeout => {
                ImportResolution::Unknown
            }
        }
    }

    fn materialise_module_members(&self, dotted_name: &str) -> Option<Vec<(String, Member)>> {
        match self.import_module(dotted_name) {
            ImportStatus::Success(Member::Module(module)) => Some(
                module
                    .public_names()
                    .into_iter()
                    .filter_map(|name| module.get_member(&name).map(|member| (name.clone(), member)))
                    .collect(),
            ),
            _ => None,
        }
    }

    fn namespace_package_children(&self, dotted_name: &str) -> Option<Vec<String>> {
        if !matches!(self.path_resolver.resolve(dotted_name), ResolvedModule::PossibleModule) {
            return None;
        }
        self.path_resolver.namespace_children(dotted_name)
    }

    fn typing_shim_module(&self) -> Option<Member> {
        match self.import_module("typing") {
            ImportStatus::Success(member) => Some(member),
            _ => None,
        }
    }
}
