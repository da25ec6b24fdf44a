//! The per-project state machine.
//!
//! A project ties together the script roots it was given, the compilation
//! engine that turns them into program snapshots, the resolution cache, the
//! incremental builder and the watcher set, and reports versioned change
//! deltas to the client session. Three flavors share this machinery and
//! diverge in policy only: root provenance, plugin loading, type-acquisition
//! defaults and config reload. The flavor-specific state lives in a tagged
//! payload rather than a type hierarchy.

use crate::{
    builder::ProgramBuilder,
    changes::{ProjectChanges, ProjectFileChanges, ProjectInfo},
    config::{CompilerOptions, TypeAcquisition},
    configured::ConfiguredState,
    error::{ProjectDiagnostic, ProjectError, Result},
    program::{LanguageService, Program},
    resolution::ResolutionCache,
    script::ScriptInfo,
    service::{ProjectServices, SystemHost},
    unresolved::UnresolvedImportsIndex,
    utils::{self, CanonicalPath},
    watch::{FileWatchCallback, FileWatchEvent, WatchType, WatcherCloseReason, WatcherHandle},
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    rc::{Rc, Weak},
    sync::atomic::{AtomicUsize, Ordering},
};

/// Discriminant of the project flavor, used for logging and policy checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectKind {
    Inferred,
    Configured,
    External,
}

/// Flavor-specific state.
#[derive(Debug)]
pub enum ProjectFlavor {
    Inferred(InferredState),
    Configured(ConfiguredState),
    External(ExternalState),
}

impl ProjectFlavor {
    pub fn kind(&self) -> ProjectKind {
        match self {
            ProjectFlavor::Inferred(_) => ProjectKind::Inferred,
            ProjectFlavor::Configured(_) => ProjectKind::Configured,
            ProjectFlavor::External(_) => ProjectKind::External,
        }
    }
}

#[derive(Debug)]
pub struct InferredState {
    /// Root directory supplied by the client, if any.
    pub(crate) project_root_path: Option<PathBuf>,
    /// Set while at least one root is a source in the dynamically typed
    /// dialect; drives the JS-flavored option overrides.
    pub(crate) is_js_inferred: bool,
}

#[derive(Debug)]
pub struct ExternalState {
    /// Path of the external build-system project file, when the caller
    /// supplied one.
    pub(crate) project_file_path: Option<PathBuf>,
    pub(crate) type_acquisition: TypeAcquisition,
}

/// A root-table entry: a live script info, or a placeholder for a file the
/// config lists but that does not exist on disk yet.
#[derive(Debug)]
pub(crate) enum RootEntry {
    Info(Rc<ScriptInfo>),
    Missing(PathBuf),
}

/// Watcher opened for a referenced-but-absent file.
#[derive(Debug)]
pub(crate) struct MissingFileWatch {
    pub(crate) file_name: PathBuf,
    pub(crate) handle: WatcherHandle,
}

/// Shared collaborators handed to every project by the surrounding service.
#[derive(Clone)]
pub struct ProjectContext {
    pub services: Rc<dyn ProjectServices>,
    pub host: Rc<dyn SystemHost>,
    pub language_service: Rc<dyn LanguageService>,
    pub resolution_cache: Rc<dyn ResolutionCache>,
    pub builder: Option<Rc<dyn ProgramBuilder>>,
}

static NEXT_INFERRED_PROJECT_ID: AtomicUsize = AtomicUsize::new(1);

fn make_inferred_project_name() -> String {
    let id = NEXT_INFERRED_PROJECT_ID.fetch_add(1, Ordering::Relaxed);
    format!("/dev/null/inferredProject{id}*")
}

pub struct Project {
    pub(crate) project_name: String,
    pub(crate) flavor: ProjectFlavor,
    pub(crate) compiler_options: CompilerOptions,
    pub(crate) compile_on_save_enabled: bool,
    pub(crate) language_service_enabled: bool,

    /// Ordered roots plus the canonical-path index over them. Missing
    /// configured roots appear only in the map, as placeholders.
    pub(crate) root_files: Vec<Rc<ScriptInfo>>,
    pub(crate) root_files_map: BTreeMap<CanonicalPath, RootEntry>,

    pub(crate) program: Option<Rc<Program>>,
    pub(crate) language_service: Rc<dyn LanguageService>,
    pub(crate) resolution_cache: Rc<dyn ResolutionCache>,
    pub(crate) builder: Option<Rc<dyn ProgramBuilder>>,

    /// One watcher per referenced-but-absent path, reconciled against the
    /// current program at the end of every graph update.
    pub(crate) missing_files: BTreeMap<CanonicalPath, MissingFileWatch>,
    pub(crate) unresolved_imports: UnresolvedImportsIndex,
    pub(crate) last_cached_unresolved_imports: Option<Rc<[String]>>,
    /// Declaration files delivered by the typings helper, sorted.
    pub(crate) typing_files: Vec<PathBuf>,
    /// Plugin-provided files, sorted; the diff against the previous list
    /// drives attach/detach.
    pub(crate) external_files: Vec<PathBuf>,

    pub(crate) project_state_version: usize,
    pub(crate) project_structure_version: usize,
    pub(crate) dirty: bool,

    pub(crate) last_reported_file_names: Option<BTreeSet<PathBuf>>,
    pub(crate) last_reported_version: usize,
    pub(crate) updated_file_names: BTreeSet<PathBuf>,

    pub(crate) services: Rc<dyn ProjectServices>,
    pub(crate) host: Rc<dyn SystemHost>,
    pub(crate) self_weak: Weak<RefCell<Project>>,
    pub(crate) closed: bool,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("project_name", &self.project_name)
            .field("kind", &self.kind())
            .field("state_version", &self.project_state_version)
            .field("structure_version", &self.project_structure_version)
            .field("dirty", &self.dirty)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Project {
    pub(crate) fn new_common(
        project_name: String,
        flavor: ProjectFlavor,
        context: ProjectContext,
        options: CompilerOptions,
    ) -> Rc<RefCell<Project>> {
        let project = Rc::new_cyclic(|weak| {
            RefCell::new(Project {
                project_name,
                flavor,
                compiler_options: CompilerOptions::default(),
                compile_on_save_enabled: false,
                language_service_enabled: true,
                root_files: Vec::new(),
                root_files_map: BTreeMap::new(),
                program: None,
                language_service: context.language_service,
                resolution_cache: context.resolution_cache,
                builder: context.builder,
                missing_files: BTreeMap::new(),
                unresolved_imports: UnresolvedImportsIndex::default(),
                last_cached_unresolved_imports: None,
                typing_files: Vec::new(),
                external_files: Vec::new(),
                project_state_version: 0,
                project_structure_version: 0,
                dirty: false,
                last_reported_file_names: None,
                last_reported_version: 0,
                updated_file_names: BTreeSet::new(),
                services: context.services,
                host: context.host,
                self_weak: weak.clone(),
                closed: false,
            })
        });
        project.borrow_mut().set_compiler_options(options);
        project
    }

    /// Creates an inferred project with a synthetic name.
    pub fn new_inferred(
        context: ProjectContext,
        project_root_path: Option<PathBuf>,
        options: CompilerOptions,
    ) -> Rc<RefCell<Project>> {
        let name = make_inferred_project_name();
        debug!("creating inferred project {name}");
        Self::new_common(
            name,
            ProjectFlavor::Inferred(InferredState { project_root_path, is_js_inferred: false }),
            context,
            options,
        )
    }

    /// Creates a caller-named external project.
    pub fn new_external(
        context: ProjectContext,
        project_name: String,
        project_file_path: Option<PathBuf>,
        options: CompilerOptions,
    ) -> Rc<RefCell<Project>> {
        debug!("creating external project {project_name}");
        Self::new_common(
            project_name,
            ProjectFlavor::External(ExternalState {
                project_file_path,
                type_acquisition: TypeAcquisition::default(),
            }),
            context,
            options,
        )
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn kind(&self) -> ProjectKind {
        self.flavor.kind()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn state_version(&self) -> usize {
        self.project_state_version
    }

    pub fn structure_version(&self) -> usize {
        self.project_structure_version
    }

    /// Version string handed to the compilation engine; changes whenever the
    /// project state could invalidate the graph.
    pub fn project_version(&self) -> String {
        self.project_state_version.to_string()
    }

    pub fn language_service_enabled(&self) -> bool {
        self.language_service_enabled
    }

    pub fn compile_on_save_enabled(&self) -> bool {
        self.compile_on_save_enabled
    }

    pub fn set_compile_on_save_enabled(&mut self, enabled: bool) {
        self.compile_on_save_enabled = enabled;
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.compiler_options
    }

    pub fn current_program(&self) -> Option<Rc<Program>> {
        self.program.clone()
    }

    pub fn has_roots(&self) -> bool {
        !self.root_files_map.is_empty()
    }

    /// `true` once every root has been removed again; the project service
    /// retires orphaned inferred projects.
    pub fn is_orphan(&self) -> bool {
        !self.has_roots()
    }

    pub fn root_script_infos(&self) -> &[Rc<ScriptInfo>] {
        &self.root_files
    }

    pub fn is_js_inferred(&self) -> bool {
        matches!(&self.flavor, ProjectFlavor::Inferred(state) if state.is_js_inferred)
    }

    fn assert_open(&self) {
        debug_assert!(!self.closed, "operation on closed project {}", self.project_name);
    }

    /// Bumps the state version; every mutation that could invalidate the
    /// graph funnels through here.
    pub fn mark_as_dirty(&mut self) {
        self.dirty = true;
        self.project_state_version += 1;
    }

    pub fn is_root(&self, info: &Rc<ScriptInfo>) -> bool {
        matches!(
            self.root_files_map.get(info.path()),
            Some(RootEntry::Info(existing)) if Rc::ptr_eq(existing, info)
        )
    }

    /// Appends a root file and attaches its script info.
    pub fn add_root(&mut self, info: Rc<ScriptInfo>) {
        self.assert_open();
        debug_assert!(
            !self.is_root(&info),
            "{} is already a root of {}",
            info.file_name().display(),
            self.project_name
        );
        trace!("{}: adding root {}", self.project_name, info.file_name().display());
        self.root_files.push(Rc::clone(&info));
        self.root_files_map
            .insert(info.path().clone(), RootEntry::Info(Rc::clone(&info)));
        info.attach_to_project(&self.project_name);

        if matches!(self.flavor, ProjectFlavor::Inferred(_)) {
            if !self.is_js_inferred() && info.is_javascript() {
                self.toggle_js_inferred(true);
            }
            // A config file created later in a containing directory can
            // promote this file into a configured project.
            self.services.watch_config_files_for_root(&info);
        }
        self.mark_as_dirty();
    }

    /// Inserts a placeholder for a configured root that does not exist on
    /// disk yet.
    pub fn add_missing_file_root(&mut self, file_name: PathBuf) {
        self.assert_open();
        let path = self.services.to_canonical(&file_name);
        trace!(
            "{}: adding missing root {}",
            self.project_name,
            file_name.display()
        );
        self.root_files_map.insert(path, RootEntry::Missing(file_name));
        self.mark_as_dirty();
    }

    /// Removes a file from the project: drops its root entry if it is one,
    /// invalidates its resolutions and unresolved-imports entry, and
    /// optionally detaches the script info.
    pub fn remove_file(&mut self, info: &Rc<ScriptInfo>, detach_from_project: bool) {
        self.assert_open();
        if self.is_root(info) {
            self.remove_root(info);
        }
        self.resolution_cache.invalidate(info.path());
        self.unresolved_imports.remove(info.path());
        if detach_from_project {
            info.detach_from_project(&self.project_name);
        }
        self.mark_as_dirty();
    }

    fn remove_root(&mut self, info: &Rc<ScriptInfo>) {
        trace!("{}: removing root {}", self.project_name, info.file_name().display());
        if let Some(pos) = self.root_files.iter().position(|root| Rc::ptr_eq(root, info)) {
            self.root_files.remove(pos);
        }
        self.root_files_map.remove(info.path());

        if matches!(self.flavor, ProjectFlavor::Inferred(_)) {
            self.services.stop_watching_config_files_for_root(info);
            if !self.root_files.iter().any(|root| root.is_javascript()) {
                self.toggle_js_inferred(false);
            }
        }
    }

    fn toggle_js_inferred(&mut self, is_js: bool) {
        let flipped = match &mut self.flavor {
            ProjectFlavor::Inferred(state) if state.is_js_inferred != is_js => {
                state.is_js_inferred = is_js;
                true
            }
            _ => false,
        };
        if flipped {
            trace!("{}: JS-inferred flag now {is_js}", self.project_name);
            let options = self.compiler_options.clone();
            self.set_compiler_options(options);
        }
    }

    /// Installs new compiler options. The incoming record is owned, so the
    /// caller's copy is never mutated by the flavor overrides applied here.
    pub fn set_compiler_options(&mut self, options: CompilerOptions) {
        self.assert_open();
        let mut options = options;
        if let ProjectFlavor::Inferred(state) = &self.flavor {
            options.allow_js = Some(true);
            options.max_node_module_js_depth =
                if state.is_js_inferred { Some(2) } else { None };
        }
        options.allow_non_ts_extensions = Some(true);
        if matches!(self.kind(), ProjectKind::Inferred | ProjectKind::External) {
            options.no_emit_for_js_files = Some(true);
        }
        if options.affects_module_resolution(&self.compiler_options) {
            trace!(
                "{}: options change affects module resolution, dropping caches",
                self.project_name
            );
            self.unresolved_imports.clear();
            self.last_cached_unresolved_imports = None;
            self.resolution_cache.clear();
        }
        self.compiler_options = options;
        self.mark_as_dirty();
    }

    /// File names of the current program, optionally without external-library
    /// files. For configured projects the config file and its extended
    /// sources are appended unless suppressed.
    pub fn file_names(
        &self,
        exclude_files_from_external_libraries: bool,
        exclude_config_files: bool,
    ) -> Vec<PathBuf> {
        let Some(program) = &self.program else {
            return Vec::new();
        };
        let mut result: Vec<PathBuf> = Vec::new();
        for file in program.source_files() {
            if exclude_files_from_external_libraries && file.is_from_external_library {
                continue;
            }
            result.push(file.file_name.clone());
        }
        if !exclude_config_files {
            if let ProjectFlavor::Configured(state) = &self.flavor {
                result.push(state.config.config_file_name.clone());
                result.extend(state.config.extended_config_files.iter().cloned());
            }
        }
        result
    }

    /// Root file names in canonical-path order, missing placeholders
    /// included. This is the engine's input list.
    pub(crate) fn root_file_names(&self) -> Vec<PathBuf> {
        self.root_files_map
            .values()
            .map(|entry| match entry {
                RootEntry::Info(info) => info.file_name().to_path_buf(),
                RootEntry::Missing(file_name) => file_name.clone(),
            })
            .collect()
    }

    pub fn all_root_files_are_js_or_dts(&self) -> bool {
        !self.root_files.is_empty() && self.root_files.iter().all(|root| root.is_js_or_dts())
    }

    pub fn all_files_are_js_or_dts(&self) -> bool {
        let Some(program) = &self.program else { return false };
        let mut any = false;
        for file in program.source_files() {
            if file.is_default_library {
                continue;
            }
            if !utils::is_js_or_dts(&file.file_name) {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn has_one_or_more_js_and_no_ts_files(&self) -> bool {
        let Some(program) = &self.program else { return false };
        let mut js = 0usize;
        for file in program.source_files() {
            if file.is_default_library {
                continue;
            }
            let name = &file.file_name;
            if utils::has_js_extension(name) {
                js += 1;
            } else if utils::has_ts_extension(name) && !utils::is_declaration_file(name) {
                return false;
            }
        }
        js > 0
    }

    pub fn is_non_ts_project(&self) -> bool {
        self.all_files_are_js_or_dts()
    }

    pub fn is_js_only_project(&self) -> bool {
        self.has_one_or_more_js_and_no_ts_files()
    }

    /// Looks up the script info for a file name. Errors when the file exists
    /// in the store but is not attached to this project.
    pub fn script_info_for_file(&self, file_name: &Path) -> Result<Option<Rc<ScriptInfo>>> {
        match self.services.script_info(file_name) {
            Some(info) if !info.is_attached(&self.project_name) => Err(
                ProjectError::DocumentNotInProject(
                    file_name.to_path_buf(),
                    self.project_name.clone(),
                ),
            ),
            other => Ok(other),
        }
    }

    /// Grants access to the (possibly plugin-wrapped) language service,
    /// optionally running a graph update first.
    pub fn language_service(&mut self, ensure_synchronized: bool) -> Rc<dyn LanguageService> {
        if ensure_synchronized {
            self.update_graph();
        }
        Rc::clone(&self.language_service)
    }

    pub fn enable_language_service(&mut self) {
        self.assert_open();
        if self.language_service_enabled {
            return;
        }
        debug!("{}: enabling language service", self.project_name);
        self.language_service_enabled = true;
        // No rebuild yet; the next graph update recreates the program.
        self.mark_as_dirty();
    }

    pub fn disable_language_service(&mut self) {
        self.assert_open();
        if !self.language_service_enabled {
            return;
        }
        debug!("{}: disabling language service", self.project_name);
        self.language_service.clean_semantic_cache();
        self.language_service_enabled = false;
        if let Some(builder) = &self.builder {
            builder.clear();
        }
        self.mark_as_dirty();
    }

    /// Files whose emit output is affected when `info` is saved. Runs a graph
    /// update first so the builder sees the current program.
    pub fn compile_on_save_affected_file_list(&mut self, info: &Rc<ScriptInfo>) -> Vec<PathBuf> {
        self.assert_open();
        if !self.language_service_enabled {
            return Vec::new();
        }
        self.update_graph();
        match &self.builder {
            Some(builder) => builder.affected_files(info.path()),
            None => Vec::new(),
        }
    }

    /// Emits a single file through the builder. Returns `false` when emit was
    /// skipped.
    pub fn emit_file(
        &self,
        info: &Rc<ScriptInfo>,
        write_file: &mut dyn FnMut(&Path, &str),
    ) -> bool {
        if !self.language_service_enabled {
            return false;
        }
        match &self.builder {
            Some(builder) => builder.emit_file(info.path(), write_file),
            None => false,
        }
    }

    /// Records an edit for the `updated` bucket of the next delta response.
    /// Called by the script store.
    pub fn register_file_update(&mut self, file_name: &Path) {
        self.updated_file_names.insert(file_name.to_path_buf());
    }

    /// Project-wide diagnostics: entries that carry no file reference.
    pub fn global_project_errors(&self) -> Vec<ProjectDiagnostic> {
        match &self.flavor {
            ProjectFlavor::Configured(state) => state
                .project_errors
                .iter()
                .filter(|diagnostic| diagnostic.file.is_none())
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// All recorded project diagnostics, file-scoped ones included.
    pub fn project_errors(&self) -> &[ProjectDiagnostic] {
        match &self.flavor {
            ProjectFlavor::Configured(state) => &state.project_errors,
            _ => &[],
        }
    }

    /// Reports what changed since the version the caller last saw: the full
    /// file list on first contact or version mismatch, a diff against the
    /// previously reported list otherwise, or just the header when nothing
    /// moved.
    pub fn changes_since_version(&mut self, last_known_version: Option<usize>) -> ProjectChanges {
        self.assert_open();
        let info = ProjectInfo {
            project_name: self.project_name.clone(),
            version: self.project_structure_version,
            is_inferred: matches!(self.flavor, ProjectFlavor::Inferred(_)),
            options: self.compiler_options.clone(),
            language_service_disabled: !self.language_service_enabled,
        };
        let updated_file_names = std::mem::take(&mut self.updated_file_names);
        let project_errors = self.global_project_errors();

        if self.last_reported_file_names.is_some()
            && last_known_version == Some(self.last_reported_version)
        {
            if self.project_structure_version == self.last_reported_version
                && updated_file_names.is_empty()
            {
                return ProjectChanges { info, files: None, changes: None, project_errors };
            }
            let last_reported = self.last_reported_file_names.take().unwrap();
            let current: BTreeSet<PathBuf> = self.file_names(false, false).into_iter().collect();
            let added = current.difference(&last_reported).cloned().collect();
            let removed = last_reported.difference(&current).cloned().collect();
            let updated = updated_file_names.into_iter().collect();
            self.last_reported_file_names = Some(current);
            self.last_reported_version = self.project_structure_version;
            ProjectChanges {
                info,
                files: None,
                changes: Some(ProjectFileChanges { added, removed, updated }),
                project_errors,
            }
        } else {
            let files = self.file_names(false, false);
            self.last_reported_file_names = Some(files.iter().cloned().collect());
            self.last_reported_version = self.project_structure_version;
            ProjectChanges { info, files: Some(files), changes: None, project_errors }
        }
    }

    /// Root directory the project is anchored at, per flavor policy.
    pub fn project_root_path(&self) -> Option<PathBuf> {
        match &self.flavor {
            ProjectFlavor::Inferred(state) => state.project_root_path.clone().or_else(|| {
                if self.services.use_single_inferred_project() {
                    None
                } else {
                    self.root_files
                        .first()
                        .map(|root| utils::directory_of(root.file_name()))
                }
            }),
            ProjectFlavor::Configured(state) => {
                Some(utils::directory_of(&state.config.config_file_name))
            }
            ProjectFlavor::External(state) => Some(match &state.project_file_path {
                Some(path) => utils::directory_of(path),
                None => utils::directory_of(Path::new(&self.project_name)),
            }),
        }
    }

    /// Effective type-acquisition settings, per flavor policy.
    pub fn type_acquisition(&self) -> TypeAcquisition {
        match &self.flavor {
            ProjectFlavor::Inferred(_) => TypeAcquisition {
                enable: Some(self.all_root_files_are_js_or_dts()),
                include: Vec::new(),
                exclude: Vec::new(),
            },
            ProjectFlavor::Configured(state) => {
                state.config.type_acquisition.clone().unwrap_or_default()
            }
            ProjectFlavor::External(state) => state.type_acquisition.clone(),
        }
    }

    /// Installs type-acquisition settings on an external project, defaulting
    /// missing fields. The record is taken by value, so callers never observe
    /// the normalization.
    pub fn set_type_acquisition(&mut self, type_acquisition: Option<TypeAcquisition>) {
        self.assert_open();
        let enable_default = self.all_root_files_are_js_or_dts();
        if let ProjectFlavor::External(state) = &mut self.flavor {
            let mut normalized = type_acquisition.unwrap_or_default();
            if normalized.enable.is_none() {
                normalized.enable = Some(enable_default);
            }
            state.type_acquisition = normalized;
        }
    }

    pub(crate) fn add_missing_file_watcher(&mut self, path: CanonicalPath, file_name: PathBuf) {
        let weak = self.self_weak.clone();
        let watched = path.clone();
        let callback: FileWatchCallback = Rc::new(move |_file, event| {
            if event == FileWatchEvent::Created {
                if let Some(project) = weak.upgrade() {
                    project.borrow_mut().on_missing_file_created(&watched);
                }
            }
        });
        let handle = self.services.watch_file(
            WatchType::MissingFilePath,
            &self.project_name,
            &file_name,
            callback,
        );
        self.missing_files.insert(path, MissingFileWatch { file_name, handle });
    }

    pub(crate) fn on_missing_file_created(&mut self, path: &CanonicalPath) {
        if self.closed {
            return;
        }
        if let Some(watch) = self.missing_files.remove(path) {
            trace!(
                "{}: missing file {} was created",
                self.project_name,
                watch.file_name.display()
            );
            self.services.close_file_watcher(
                WatchType::MissingFilePath,
                &self.project_name,
                &watch.file_name,
                watch.handle,
                WatcherCloseReason::FileCreated,
            );
            self.mark_as_dirty();
            self.services.schedule_project_graph_refresh(&self.project_name);
        }
    }

    pub(crate) fn detach_script_info(&self, file_name: &Path) {
        if let Some(info) = self.services.script_info(file_name) {
            info.detach_from_project(&self.project_name);
            self.resolution_cache.invalidate(info.path());
        }
    }

    fn close_missing_file_watchers(&mut self) {
        let missing = std::mem::take(&mut self.missing_files);
        for (_, watch) in missing {
            self.services.close_file_watcher(
                WatchType::MissingFilePath,
                &self.project_name,
                &watch.file_name,
                watch.handle,
                WatcherCloseReason::ProjectClose,
            );
        }
    }

    /// Releases every resource the project owns. Safe to call once; the
    /// project is inert afterwards.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!("{}: closing", self.project_name);
        let program = self.program.take();
        if let Some(program) = &program {
            for file in program.source_files() {
                if let Some(info) = self.services.script_info(&file.file_name) {
                    info.detach_from_project(&self.project_name);
                }
            }
        }
        if program.is_none() || !self.language_service_enabled {
            // Roots never made it into a program; release them directly.
            for root in &self.root_files {
                root.detach_from_project(&self.project_name);
            }
        }
        self.root_files.clear();
        self.root_files_map.clear();
        self.external_files.clear();
        self.typing_files.clear();
        self.builder = None;
        self.last_cached_unresolved_imports = None;
        self.unresolved_imports.clear();

        // Watcher drain order: missing-file, failed-lookup (owned by the
        // resolution cache), then the flavor's type-root, wildcard and
        // config-file watchers.
        self.close_missing_file_watchers();
        self.resolution_cache.clear();
        self.resolution_cache.close();
        self.close_flavor_watchers(WatcherCloseReason::ProjectClose);

        self.language_service.dispose();
        self.closed = true;
    }
}
