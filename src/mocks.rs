//! In-memory collaborators used by the crate's tests: a scriptable project
//! service with a firable watcher registry, a compilation engine that builds
//! programs from the root set and scripted resolution tables, a resolution
//! cache and a builder that record what the project asks of them.

use crate::{
    builder::ProgramBuilder,
    config::{default_lib_file_name, CompilerOptions},
    program::{LanguageService, Program, ProgramFile, ProgramHost, ProgramUpdate, StructureReuse},
    project::{Project, ProjectContext},
    plugins::PluginModule,
    resolution::ResolutionCache,
    script::{ScriptInfo, ScriptKind, ScriptStore},
    service::{ProjectServices, SystemHost},
    utils::CanonicalPath,
    watch::{
        DirectoryWatchCallback, FileWatchCallback, FileWatchEvent, WatchType, WatcherCloseReason,
        WatcherHandle,
    },
};
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet},
    path::{Component, Path, PathBuf},
    rc::Rc,
};

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) enum WatcherKind {
    File(FileWatchCallback),
    Directory(DirectoryWatchCallback),
}

pub(crate) struct ActiveWatcher {
    pub(crate) handle: WatcherHandle,
    pub(crate) watch_type: WatchType,
    pub(crate) path: PathBuf,
    pub(crate) kind: WatcherKind,
}

/// Scriptable project service: watcher registry, script store, typings
/// helper and scheduling hooks, all recording.
pub(crate) struct MockServices {
    case_sensitive: bool,
    next_handle: Cell<u64>,
    pub(crate) scripts: RefCell<BTreeMap<CanonicalPath, Rc<ScriptInfo>>>,
    pub(crate) watchers: RefCell<Vec<ActiveWatcher>>,
    pub(crate) closed_watchers: RefCell<Vec<(WatchType, PathBuf, WatcherCloseReason)>>,
    pub(crate) typings: RefCell<Vec<PathBuf>>,
    pub(crate) typings_queries: Cell<usize>,
    pub(crate) scheduled_refreshes: RefCell<Vec<String>>,
    pub(crate) reloaded_projects: RefCell<Vec<String>>,
    pub(crate) config_watched_roots: RefCell<Vec<PathBuf>>,
    pub(crate) single_inferred: Cell<bool>,
    pub(crate) allow_local_plugins: Cell<bool>,
    pub(crate) global_plugin_names: RefCell<Vec<String>>,
    pub(crate) probe_locations: RefCell<Vec<PathBuf>>,
}

impl MockServices {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(MockServices {
            case_sensitive: true,
            next_handle: Cell::new(1),
            scripts: RefCell::new(BTreeMap::new()),
            watchers: RefCell::new(Vec::new()),
            closed_watchers: RefCell::new(Vec::new()),
            typings: RefCell::new(Vec::new()),
            typings_queries: Cell::new(0),
            scheduled_refreshes: RefCell::new(Vec::new()),
            reloaded_projects: RefCell::new(Vec::new()),
            config_watched_roots: RefCell::new(Vec::new()),
            single_inferred: Cell::new(false),
            allow_local_plugins: Cell::new(false),
            global_plugin_names: RefCell::new(Vec::new()),
            probe_locations: RefCell::new(Vec::new()),
        })
    }

    fn canonical(&self, file_name: &Path) -> CanonicalPath {
        CanonicalPath::new(file_name, self.case_sensitive)
    }

    fn next(&self) -> WatcherHandle {
        let handle = WatcherHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        handle
    }

    pub(crate) fn open_watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }

    pub(crate) fn has_watcher(&self, watch_type: WatchType, path: &Path) -> bool {
        self.watchers
            .borrow()
            .iter()
            .any(|w| w.watch_type == watch_type && w.path == path)
    }

    pub(crate) fn close_reasons_for(&self, path: &Path) -> Vec<WatcherCloseReason> {
        self.closed_watchers
            .borrow()
            .iter()
            .filter(|(_, p, _)| p == path)
            .map(|(_, _, reason)| *reason)
            .collect()
    }

    /// Delivers a file event to every open watcher on `file`. Callbacks are
    /// collected first so they run without the registry borrowed, the same
    /// way the real service queues them onto its task.
    pub(crate) fn fire_file_event(&self, file: &Path, event: FileWatchEvent) {
        let callbacks: Vec<FileWatchCallback> = self
            .watchers
            .borrow()
            .iter()
            .filter(|w| w.path == file)
            .filter_map(|w| match &w.kind {
                WatcherKind::File(cb) => Some(Rc::clone(cb)),
                WatcherKind::Directory(_) => None,
            })
            .collect();
        for callback in callbacks {
            callback(file, event);
        }
    }

    pub(crate) fn fire_directory_event(&self, directory: &Path, changed: &Path) {
        let callbacks: Vec<DirectoryWatchCallback> = self
            .watchers
            .borrow()
            .iter()
            .filter(|w| w.path == directory)
            .filter_map(|w| match &w.kind {
                WatcherKind::Directory(cb) => Some(Rc::clone(cb)),
                WatcherKind::File(_) => None,
            })
            .collect();
        for callback in callbacks {
            callback(changed);
        }
    }
}

impl ScriptStore for MockServices {
    fn script_info(&self, file_name: &Path) -> Option<Rc<ScriptInfo>> {
        let path = self.canonical(file_name);
        self.scripts.borrow().get(&path).cloned()
    }

    fn script_info_for_path(&self, path: &CanonicalPath) -> Option<Rc<ScriptInfo>> {
        self.scripts.borrow().get(path).cloned()
    }

    fn get_or_create_script_info(&self, file_name: &Path) -> Option<Rc<ScriptInfo>> {
        let path = self.canonical(file_name);
        let mut scripts = self.scripts.borrow_mut();
        let info = scripts.entry(path.clone()).or_insert_with(|| {
            Rc::new(ScriptInfo::new(
                file_name.to_path_buf(),
                path.clone(),
                ScriptKind::from_file_name(file_name),
                false,
            ))
        });
        Some(Rc::clone(info))
    }
}

impl ProjectServices for MockServices {
    fn to_canonical(&self, file_name: &Path) -> CanonicalPath {
        self.canonical(file_name)
    }

    fn watch_file(
        &self,
        watch_type: WatchType,
        _project: &str,
        file: &Path,
        callback: FileWatchCallback,
    ) -> WatcherHandle {
        let handle = self.next();
        self.watchers.borrow_mut().push(ActiveWatcher {
            handle,
            watch_type,
            path: file.to_path_buf(),
            kind: WatcherKind::File(callback),
        });
        handle
    }

    fn close_file_watcher(
        &self,
        watch_type: WatchType,
        _project: &str,
        file: &Path,
        handle: WatcherHandle,
        reason: WatcherCloseReason,
    ) {
        let mut watchers = self.watchers.borrow_mut();
        let before = watchers.len();
        watchers.retain(|w| w.handle != handle);
        debug_assert_eq!(before, watchers.len() + 1, "double close of {}", file.display());
        self.closed_watchers
            .borrow_mut()
            .push((watch_type, file.to_path_buf(), reason));
    }

    fn watch_directory(
        &self,
        watch_type: WatchType,
        _project: &str,
        directory: &Path,
        _recursive: bool,
        callback: DirectoryWatchCallback,
    ) -> WatcherHandle {
        let handle = self.next();
        self.watchers.borrow_mut().push(ActiveWatcher {
            handle,
            watch_type,
            path: directory.to_path_buf(),
            kind: WatcherKind::Directory(callback),
        });
        handle
    }

    fn close_directory_watcher(
        &self,
        watch_type: WatchType,
        _project: &str,
        directory: &Path,
        handle: WatcherHandle,
        reason: WatcherCloseReason,
    ) {
        let mut watchers = self.watchers.borrow_mut();
        let before = watchers.len();
        watchers.retain(|w| w.handle != handle);
        debug_assert_eq!(before, watchers.len() + 1, "double close of {}", directory.display());
        self.closed_watchers
            .borrow_mut()
            .push((watch_type, directory.to_path_buf(), reason));
    }

    fn typings_for_project(
        &self,
        _project: &str,
        _unresolved_imports: &[String],
        _has_changes: bool,
    ) -> Vec<PathBuf> {
        self.typings_queries.set(self.typings_queries.get() + 1);
        self.typings.borrow().clone()
    }

    fn schedule_project_graph_refresh(&self, project: &str) {
        self.scheduled_refreshes.borrow_mut().push(project.to_string());
    }

    fn reload_configured_project(&self, project: &str) {
        self.reloaded_projects.borrow_mut().push(project.to_string());
    }

    fn watch_config_files_for_root(&self, root: &Rc<ScriptInfo>) {
        self.config_watched_roots
            .borrow_mut()
            .push(root.file_name().to_path_buf());
    }

    fn stop_watching_config_files_for_root(&self, root: &Rc<ScriptInfo>) {
        let mut roots = self.config_watched_roots.borrow_mut();
        if let Some(pos) = roots.iter().position(|r| r == root.file_name()) {
            roots.remove(pos);
        }
    }

    fn use_single_inferred_project(&self) -> bool {
        self.single_inferred.get()
    }

    fn allow_local_plugin_loads(&self) -> bool {
        self.allow_local_plugins.get()
    }

    fn plugin_probe_locations(&self) -> Vec<PathBuf> {
        self.probe_locations.borrow().clone()
    }

    fn global_plugins(&self) -> Vec<String> {
        self.global_plugin_names.borrow().clone()
    }
}

/// Host with a registry of loadable plugin modules.
pub(crate) struct MockHost {
    pub(crate) plugin_modules: RefCell<BTreeMap<String, Rc<dyn PluginModule>>>,
    pub(crate) require_log: RefCell<Vec<(PathBuf, String)>>,
}

impl MockHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(MockHost {
            plugin_modules: RefCell::new(BTreeMap::new()),
            require_log: RefCell::new(Vec::new()),
        })
    }
}

impl SystemHost for MockHost {
    fn resolve_path(&self, path: &Path) -> PathBuf {
        let mut resolved = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                }
                other => resolved.push(other),
            }
        }
        resolved
    }

    fn require(
        &self,
        search_path: &Path,
        module_name: &str,
    ) -> std::result::Result<Rc<dyn PluginModule>, String> {
        self.require_log
            .borrow_mut()
            .push((search_path.to_path_buf(), module_name.to_string()));
        self.plugin_modules
            .borrow()
            .get(module_name)
            .cloned()
            .ok_or_else(|| format!("cannot find module {module_name}"))
    }

    fn executing_file_path(&self) -> PathBuf {
        PathBuf::from("/server/node_modules/tsls/lib/server.js")
    }
}

/// Engine that derives the program from the root set, the typing files and
/// scripted per-file resolution tables. An unchanged input set returns the
/// previous snapshot with `StructureReuse::Completely`.
pub(crate) struct MockEngine {
    pub(crate) resolutions: RefCell<BTreeMap<PathBuf, BTreeMap<String, Option<PathBuf>>>>,
    /// Paths reported as referenced-but-missing instead of becoming files.
    pub(crate) missing_refs: RefCell<BTreeSet<PathBuf>>,
    pub(crate) external_library_files: RefCell<BTreeSet<PathBuf>>,
    pub(crate) include_default_lib: Cell<bool>,
    pub(crate) program_builds: Cell<usize>,
    pub(crate) semantic_cache_cleans: Cell<usize>,
    pub(crate) disposals: Cell<usize>,
    last: RefCell<Option<Rc<Program>>>,
    last_options: RefCell<Option<CompilerOptions>>,
}

impl MockEngine {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(MockEngine {
            resolutions: RefCell::new(BTreeMap::new()),
            missing_refs: RefCell::new(BTreeSet::new()),
            external_library_files: RefCell::new(BTreeSet::new()),
            include_default_lib: Cell::new(false),
            program_builds: Cell::new(0),
            semantic_cache_cleans: Cell::new(0),
            disposals: Cell::new(0),
            last: RefCell::new(None),
            last_options: RefCell::new(None),
        })
    }

    pub(crate) fn set_resolution(&self, file: &str, specifier: &str, resolved: Option<&str>) {
        self.resolutions
            .borrow_mut()
            .entry(PathBuf::from(file))
            .or_default()
            .insert(specifier.to_string(), resolved.map(PathBuf::from));
    }

    pub(crate) fn mark_missing(&self, file: &str) {
        self.missing_refs.borrow_mut().insert(PathBuf::from(file));
    }

    pub(crate) fn mark_present(&self, file: &str) {
        self.missing_refs.borrow_mut().remove(Path::new(file));
    }

    fn same_program(previous: &Program, files: &[Rc<ProgramFile>], missing: &[PathBuf]) -> bool {
        previous.missing_file_paths() == missing
            && previous.source_files().len() == files.len()
            && previous.source_files().iter().zip(files).all(|(a, b)| {
                a.file_name == b.file_name && a.resolved_modules == b.resolved_modules
            })
    }
}

impl LanguageService for MockEngine {
    fn update_program(&self, host: ProgramHost<'_>) -> ProgramUpdate {
        let mut names: Vec<PathBuf> = host.root_file_names.clone();
        for typing in host.typing_files {
            if !names.contains(typing) {
                names.push(typing.clone());
            }
        }
        let mut default_lib = None;
        if self.include_default_lib.get() && host.options.no_lib != Some(true) {
            let lib = PathBuf::from(format!("/lib/{}", default_lib_file_name(host.options)));
            if !names.contains(&lib) {
                names.push(lib.clone());
            }
            default_lib = Some(lib);
        }

        let mut files: Vec<Rc<ProgramFile>> = Vec::new();
        let mut missing: Vec<PathBuf> = Vec::new();
        for name in names {
            if self.missing_refs.borrow().contains(&name) {
                missing.push(name);
                continue;
            }
            let resolved_modules =
                self.resolutions.borrow().get(&name).cloned().unwrap_or_default();
            files.push(Rc::new(ProgramFile {
                path: CanonicalPath::new(&name, true),
                file_name: name.clone(),
                resolved_modules,
                is_from_external_library: self.external_library_files.borrow().contains(&name),
                is_default_library: default_lib.as_deref() == Some(name.as_path()),
            }));
        }

        if let Some(previous) = self.last.borrow().as_ref() {
            if self.last_options.borrow().as_ref() == Some(host.options)
                && Self::same_program(previous, &files, &missing)
            {
                return ProgramUpdate {
                    program: Rc::clone(previous),
                    structure_reuse: StructureReuse::Completely,
                };
            }
        }
        self.program_builds.set(self.program_builds.get() + 1);
        let program = Rc::new(Program::new(files, missing));
        *self.last.borrow_mut() = Some(Rc::clone(&program));
        *self.last_options.borrow_mut() = Some(host.options.clone());
        ProgramUpdate { program, structure_reuse: StructureReuse::Not }
    }

    fn clean_semantic_cache(&self) {
        self.semantic_cache_cleans.set(self.semantic_cache_cleans.get() + 1);
    }

    fn dispose(&self) {
        self.disposals.set(self.disposals.get() + 1);
    }
}

pub(crate) struct MockResolutionCache {
    invalidated: RefCell<BTreeSet<CanonicalPath>>,
    pending_changed: RefCell<Vec<CanonicalPath>>,
    recording: Cell<bool>,
    pub(crate) clears: Cell<usize>,
    pub(crate) closed: Cell<bool>,
    pub(crate) invalidate_calls: RefCell<Vec<CanonicalPath>>,
}

impl MockResolutionCache {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(MockResolutionCache {
            invalidated: RefCell::new(BTreeSet::new()),
            pending_changed: RefCell::new(Vec::new()),
            recording: Cell::new(false),
            clears: Cell::new(0),
            closed: Cell::new(false),
            invalidate_calls: RefCell::new(Vec::new()),
        })
    }

    /// Stages a path to be reported by the next recording window.
    pub(crate) fn stage_changed_resolution(&self, path: CanonicalPath) {
        self.pending_changed.borrow_mut().push(path);
    }
}

impl ResolutionCache for MockResolutionCache {
    fn invalidate(&self, path: &CanonicalPath) {
        self.invalidate_calls.borrow_mut().push(path.clone());
        self.invalidated.borrow_mut().insert(path.clone());
    }

    fn start_recording_changes(&self) {
        debug_assert!(!self.recording.get(), "recording windows do not nest");
        self.recording.set(true);
    }

    fn finish_recording_changes(&self) -> Vec<CanonicalPath> {
        debug_assert!(self.recording.get(), "no recording window open");
        self.recording.set(false);
        std::mem::take(&mut *self.pending_changed.borrow_mut())
    }

    fn has_invalidated_resolution(&self, path: &CanonicalPath) -> bool {
        self.invalidated.borrow().contains(path)
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
        self.invalidated.borrow_mut().clear();
    }

    fn close(&self) {
        self.closed.set(true);
    }
}

pub(crate) struct MockBuilder {
    pub(crate) updates: Cell<usize>,
    pub(crate) clears: Cell<usize>,
    pub(crate) affected: RefCell<BTreeMap<CanonicalPath, Vec<PathBuf>>>,
    pub(crate) emits: RefCell<BTreeMap<CanonicalPath, Vec<(PathBuf, String)>>>,
    pub(crate) last_program: RefCell<Option<Rc<Program>>>,
}

impl MockBuilder {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(MockBuilder {
            updates: Cell::new(0),
            clears: Cell::new(0),
            affected: RefCell::new(BTreeMap::new()),
            emits: RefCell::new(BTreeMap::new()),
            last_program: RefCell::new(None),
        })
    }
}

impl ProgramBuilder for MockBuilder {
    fn on_program_update(
        &self,
        program: &Rc<Program>,
        _has_invalidated_resolution: &dyn Fn(&CanonicalPath) -> bool,
    ) {
        self.updates.set(self.updates.get() + 1);
        *self.last_program.borrow_mut() = Some(Rc::clone(program));
    }

    fn affected_files(&self, path: &CanonicalPath) -> Vec<PathBuf> {
        self.affected.borrow().get(path).cloned().unwrap_or_default()
    }

    fn emit_file(&self, path: &CanonicalPath, write_file: &mut dyn FnMut(&Path, &str)) -> bool {
        match self.emits.borrow().get(path) {
            Some(outputs) => {
                for (file, text) in outputs {
                    write_file(file, text);
                }
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
    }
}

/// Bundles the mock collaborators and common setup.
pub(crate) struct Fixture {
    pub(crate) services: Rc<MockServices>,
    pub(crate) host: Rc<MockHost>,
    pub(crate) engine: Rc<MockEngine>,
    pub(crate) resolver: Rc<MockResolutionCache>,
    pub(crate) builder: Rc<MockBuilder>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Fixture {
            services: MockServices::new(),
            host: MockHost::new(),
            engine: MockEngine::new(),
            resolver: MockResolutionCache::new(),
            builder: MockBuilder::new(),
        }
    }

    pub(crate) fn context(&self) -> ProjectContext {
        ProjectContext {
            services: Rc::clone(&self.services) as Rc<dyn ProjectServices>,
            host: Rc::clone(&self.host) as Rc<dyn SystemHost>,
            language_service: Rc::clone(&self.engine) as Rc<dyn LanguageService>,
            resolution_cache: Rc::clone(&self.resolver) as Rc<dyn ResolutionCache>,
            builder: Some(Rc::clone(&self.builder) as Rc<dyn ProgramBuilder>),
        }
    }

    pub(crate) fn inferred(&self) -> Rc<std::cell::RefCell<Project>> {
        Project::new_inferred(self.context(), None, CompilerOptions::default())
    }

    pub(crate) fn script(&self, name: &str) -> Rc<ScriptInfo> {
        self.services.get_or_create_script_info(Path::new(name)).unwrap()
    }

    pub(crate) fn canonical(&self, name: &str) -> CanonicalPath {
        self.services.to_canonical(Path::new(name))
    }
}
