//! Configured-project specialization.
//!
//! A configured project is anchored at a config file. Beyond the shared
//! machinery it owns three watcher collections (the config file itself, the
//! directories captured by include globs, and the effective type roots),
//! a pending-reload latch driven by config-file events, the plugin pipeline
//! and the no-input-files diagnostic.

use crate::{
    config::{effective_type_roots, CompilerOptions, ConfigSnapshot, WildcardWatchMode},
    error::ProjectDiagnostic,
    plugins::{ActivePlugin, PluginCreateInfo, PluginImport, PluginModule},
    project::{Project, ProjectContext, ProjectFlavor},
    utils::CanonicalPath,
    watch::{DirectoryWatchCallback, FileWatchCallback, WatchType, WatcherCloseReason, WatcherHandle},
};
use itertools::Itertools;
use std::{
    cell::RefCell,
    collections::BTreeMap,
    path::{Path, PathBuf},
    rc::Rc,
};

/// An open wildcard-directory watcher.
#[derive(Debug)]
pub(crate) struct WildcardWatch {
    pub(crate) directory: PathBuf,
    pub(crate) handle: WatcherHandle,
    pub(crate) mode: WildcardWatchMode,
}

/// An open type-root watcher.
#[derive(Debug)]
pub(crate) struct TypeRootWatch {
    pub(crate) directory: PathBuf,
    pub(crate) handle: WatcherHandle,
}

#[derive(Debug)]
pub struct ConfiguredState {
    pub(crate) config: ConfigSnapshot,
    pub(crate) canonical_config_file_path: CanonicalPath,
    /// Number of open scripts referencing this project; the project service
    /// deletes the project when it drops to zero.
    pub(crate) open_ref_count: usize,
    /// Set when the config file itself changed; honored by the next graph
    /// update, which delegates to the service's reload path.
    pub(crate) pending_reload: bool,
    pub(crate) config_file_watcher: Option<WatcherHandle>,
    pub(crate) wildcard_watchers: BTreeMap<CanonicalPath, WildcardWatch>,
    pub(crate) type_root_watchers: BTreeMap<CanonicalPath, TypeRootWatch>,
    pub(crate) plugins: Vec<ActivePlugin>,
    pub(crate) project_errors: Vec<ProjectDiagnostic>,
}

impl Project {
    /// Creates a configured project from a resolved config file: opens the
    /// config-file, wildcard-directory and type-root watchers, and activates
    /// the declared plugins.
    pub fn new_configured(
        context: ProjectContext,
        config: ConfigSnapshot,
        options: CompilerOptions,
    ) -> Rc<RefCell<Project>> {
        let config_file_name = config.config_file_name.clone();
        let canonical_config_file_path = context.services.to_canonical(&config_file_name);
        let project_name = config_file_name.to_string_lossy().into_owned();
        debug!("creating configured project {project_name}");
        let wildcard_directories = config.wildcard_directories.clone();
        let project = Self::new_common(
            project_name,
            ProjectFlavor::Configured(ConfiguredState {
                config,
                canonical_config_file_path,
                open_ref_count: 0,
                pending_reload: false,
                config_file_watcher: None,
                wildcard_watchers: BTreeMap::new(),
                type_root_watchers: BTreeMap::new(),
                plugins: Vec::new(),
                project_errors: Vec::new(),
            }),
            context,
            options,
        );
        {
            let mut this = project.borrow_mut();
            this.watch_config_file();
            this.watch_wildcard_directories(wildcard_directories);
            this.refresh_type_root_watchers();
            this.enable_plugins();
        }
        project
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        match &self.flavor {
            ProjectFlavor::Configured(state) => Some(&state.config.config_file_name),
            _ => None,
        }
    }

    pub fn canonical_config_file_path(&self) -> Option<&CanonicalPath> {
        match &self.flavor {
            ProjectFlavor::Configured(state) => Some(&state.canonical_config_file_path),
            _ => None,
        }
    }

    pub fn open_ref_count(&self) -> usize {
        match &self.flavor {
            ProjectFlavor::Configured(state) => state.open_ref_count,
            _ => 0,
        }
    }

    /// Records another open script referencing this project.
    pub fn add_open_ref(&mut self) -> usize {
        match &mut self.flavor {
            ProjectFlavor::Configured(state) => {
                state.open_ref_count += 1;
                state.open_ref_count
            }
            _ => 0,
        }
    }

    /// Drops one open-script reference; the caller deletes the project when
    /// the returned count is zero.
    pub fn delete_open_ref(&mut self) -> usize {
        match &mut self.flavor {
            ProjectFlavor::Configured(state) => {
                debug_assert!(state.open_ref_count > 0, "open ref count underflow");
                state.open_ref_count -= 1;
                state.open_ref_count
            }
            _ => 0,
        }
    }

    pub fn pending_reload(&self) -> bool {
        matches!(&self.flavor, ProjectFlavor::Configured(state) if state.pending_reload)
    }

    /// Arms the reload latch. Also set internally when the config-file
    /// watcher fires.
    pub fn set_pending_reload(&mut self) {
        if let ProjectFlavor::Configured(state) = &mut self.flavor {
            state.pending_reload = true;
        }
    }

    /// Maintains the no-input-files diagnostic: removed once the project has
    /// files, recorded while it has none and the config lists no explicit
    /// `files`.
    pub fn update_error_on_no_input_files(&mut self, has_file_names: bool) {
        let ProjectFlavor::Configured(state) = &mut self.flavor else { return };
        if has_file_names {
            state.project_errors.retain(|diagnostic| !diagnostic.is_no_input_files());
        } else if !state.config.has_explicit_files
            && !state.project_errors.iter().any(|diagnostic| diagnostic.is_no_input_files())
        {
            state
                .project_errors
                .push(ProjectDiagnostic::no_input_files(&state.config.config_file_name));
        }
    }

    /// Re-applies a freshly parsed config: new options, reconciled wildcard
    /// and type-root watchers. Used by the service's reload path. Plugins are
    /// not re-activated.
    pub fn apply_config_snapshot(&mut self, config: ConfigSnapshot, options: CompilerOptions) {
        let wildcard_directories = config.wildcard_directories.clone();
        match &mut self.flavor {
            ProjectFlavor::Configured(state) => state.config = config,
            _ => return,
        }
        self.set_compiler_options(options);
        self.watch_wildcard_directories(wildcard_directories);
        self.refresh_type_root_watchers();
    }

    fn watch_config_file(&mut self) {
        let config_file_name = match &self.flavor {
            ProjectFlavor::Configured(state) => state.config.config_file_name.clone(),
            _ => return,
        };
        let weak = self.self_weak.clone();
        let callback: FileWatchCallback = Rc::new(move |_file, _event| {
            if let Some(project) = weak.upgrade() {
                project.borrow_mut().on_config_file_changed();
            }
        });
        let handle = self.services.watch_file(
            WatchType::ConfigFilePath,
            &self.project_name,
            &config_file_name,
            callback,
        );
        if let ProjectFlavor::Configured(state) = &mut self.flavor {
            state.config_file_watcher = Some(handle);
        }
    }

    pub(crate) fn on_config_file_changed(&mut self) {
        if self.closed {
            return;
        }
        trace!("{}: config file changed, scheduling reload", self.project_name);
        self.set_pending_reload();
        self.mark_as_dirty();
        self.services.schedule_project_graph_refresh(&self.project_name);
    }

    /// Reconciles the wildcard-directory watchers against the configured
    /// set: new directories get a watcher, vanished ones are closed as
    /// `NotNeeded`, and a changed recursion mode closes and reopens the
    /// watcher as `RecursiveChanged`.
    pub fn watch_wildcard_directories(
        &mut self,
        directories: BTreeMap<PathBuf, WildcardWatchMode>,
    ) {
        let existing = match &mut self.flavor {
            ProjectFlavor::Configured(state) => std::mem::take(&mut state.wildcard_watchers),
            _ => return,
        };
        let desired: BTreeMap<CanonicalPath, (PathBuf, WildcardWatchMode)> = directories
            .into_iter()
            .map(|(directory, mode)| {
                (self.services.to_canonical(&directory), (directory, mode))
            })
            .collect();

        let mut kept: BTreeMap<CanonicalPath, WildcardWatch> = BTreeMap::new();
        for (path, watch) in existing {
            let reason = match desired.get(&path) {
                Some((_, mode)) if *mode == watch.mode => {
                    kept.insert(path, watch);
                    continue;
                }
                Some(_) => WatcherCloseReason::RecursiveChanged,
                None => WatcherCloseReason::NotNeeded,
            };
            self.services.close_directory_watcher(
                WatchType::WildcardDirectories,
                &self.project_name,
                &watch.directory,
                watch.handle,
                reason,
            );
        }
        for (path, (directory, mode)) in desired {
            if kept.contains_key(&path) {
                continue;
            }
            let weak = self.self_weak.clone();
            let callback: DirectoryWatchCallback = Rc::new(move |changed: &Path| {
                if let Some(project) = weak.upgrade() {
                    project.borrow_mut().on_wildcard_directory_changed(changed);
                }
            });
            let handle = self.services.watch_directory(
                WatchType::WildcardDirectories,
                &self.project_name,
                &directory,
                mode == WildcardWatchMode::Recursive,
                callback,
            );
            kept.insert(path, WildcardWatch { directory, handle, mode });
        }
        if let ProjectFlavor::Configured(state) = &mut self.flavor {
            state.wildcard_watchers = kept;
        }
    }

    pub(crate) fn on_wildcard_directory_changed(&mut self, changed: &Path) {
        if self.closed {
            return;
        }
        trace!(
            "{}: change under wildcard directory: {}",
            self.project_name,
            changed.display()
        );
        // Root re-enumeration belongs to the service's reload path; the
        // project only requests a refresh.
        self.mark_as_dirty();
        self.services.schedule_project_graph_refresh(&self.project_name);
    }

    /// Reconciles the type-root watchers against the effective type roots of
    /// the current compiler options.
    pub fn refresh_type_root_watchers(&mut self) {
        if !matches!(self.flavor, ProjectFlavor::Configured(_)) {
            return;
        }
        let current_directory =
            self.project_root_path().unwrap_or_else(|| PathBuf::from("."));
        let roots = effective_type_roots(&self.compiler_options, &current_directory);
        let desired: BTreeMap<CanonicalPath, PathBuf> = roots
            .into_iter()
            .map(|root| (self.services.to_canonical(&root), root))
            .collect();

        let existing = match &mut self.flavor {
            ProjectFlavor::Configured(state) => std::mem::take(&mut state.type_root_watchers),
            _ => return,
        };
        let mut kept: BTreeMap<CanonicalPath, TypeRootWatch> = BTreeMap::new();
        for (path, watch) in existing {
            if desired.contains_key(&path) {
                kept.insert(path, watch);
            } else {
                self.services.close_directory_watcher(
                    WatchType::TypeRoot,
                    &self.project_name,
                    &watch.directory,
                    watch.handle,
                    WatcherCloseReason::NotNeeded,
                );
            }
        }
        for (path, directory) in desired {
            if kept.contains_key(&path) {
                continue;
            }
            let weak = self.self_weak.clone();
            let callback: DirectoryWatchCallback = Rc::new(move |changed: &Path| {
                if let Some(project) = weak.upgrade() {
                    project.borrow_mut().on_type_root_changed(changed);
                }
            });
            let handle = self.services.watch_directory(
                WatchType::TypeRoot,
                &self.project_name,
                &directory,
                true,
                callback,
            );
            kept.insert(path, TypeRootWatch { directory, handle });
        }
        if let ProjectFlavor::Configured(state) = &mut self.flavor {
            state.type_root_watchers = kept;
        }
    }

    pub(crate) fn on_type_root_changed(&mut self, changed: &Path) {
        if self.closed {
            return;
        }
        trace!("{}: type root changed: {}", self.project_name, changed.display());
        let path = self.services.to_canonical(changed);
        self.resolution_cache.invalidate(&path);
        self.mark_as_dirty();
        self.services.schedule_project_graph_refresh(&self.project_name);
    }

    /// Closes the flavor-owned watchers in drain order: type-root, wildcard,
    /// config-file.
    pub(crate) fn close_flavor_watchers(&mut self, reason: WatcherCloseReason) {
        let ProjectFlavor::Configured(state) = &mut self.flavor else { return };
        let type_roots = std::mem::take(&mut state.type_root_watchers);
        let wildcards = std::mem::take(&mut state.wildcard_watchers);
        let config_watcher = state.config_file_watcher.take();
        let config_file_name = state.config.config_file_name.clone();

        for (_, watch) in type_roots {
            self.services.close_directory_watcher(
                WatchType::TypeRoot,
                &self.project_name,
                &watch.directory,
                watch.handle,
                reason,
            );
        }
        for (_, watch) in wildcards {
            self.services.close_directory_watcher(
                WatchType::WildcardDirectories,
                &self.project_name,
                &watch.directory,
                watch.handle,
                reason,
            );
        }
        if let Some(handle) = config_watcher {
            self.services.close_file_watcher(
                WatchType::ConfigFilePath,
                &self.project_name,
                &config_file_name,
                handle,
                reason,
            );
        }
    }

    /// Resolves and activates the config-declared plugins, then the
    /// service-wide global plugins that were not already named.
    fn enable_plugins(&mut self) {
        if !matches!(self.flavor, ProjectFlavor::Configured(_)) {
            return;
        }
        let executing = self.host.executing_file_path();
        let mut search_paths: Vec<PathBuf> =
            vec![self.host.resolve_path(&executing.join("../../.."))];
        search_paths.extend(self.services.plugin_probe_locations());
        if self.services.allow_local_plugin_loads() {
            if let Some(config_directory) = self.project_root_path() {
                trace!(
                    "{}: local plugin loading enabled, probing {}",
                    self.project_name,
                    config_directory.display()
                );
                search_paths.insert(0, config_directory);
            }
        }

        let mut to_activate: Vec<PluginImport> = match &self.flavor {
            ProjectFlavor::Configured(state) => state.config.plugins.clone(),
            _ => Vec::new(),
        };
        for global in self.services.global_plugins() {
            if !to_activate.iter().any(|plugin| plugin.name == global) {
                to_activate.push(PluginImport::named(global));
            }
        }
        for plugin in to_activate {
            self.enable_plugin(plugin, &search_paths);
        }
    }

    fn enable_plugin(&mut self, plugin: PluginImport, search_paths: &[PathBuf]) {
        trace!("{}: enabling plugin {}", self.project_name, plugin.name);
        for search_path in search_paths {
            match self.host.require(search_path, &plugin.name) {
                Ok(module) => {
                    self.enable_proxy(module, plugin);
                    return;
                }
                Err(error) => trace!(
                    "{}: plugin {} not loadable from {}: {error}",
                    self.project_name,
                    plugin.name,
                    search_path.display()
                ),
            }
        }
        warn!("{}: couldn't find plugin {}", self.project_name, plugin.name);
    }

    fn enable_proxy(&mut self, module: Rc<dyn PluginModule>, plugin: PluginImport) {
        let info = PluginCreateInfo {
            project_name: self.project_name.clone(),
            language_service: Rc::clone(&self.language_service),
            config: plugin.config,
        };
        match module.create(info) {
            Ok(wrapped) => {
                trace!("{}: plugin {} activated", self.project_name, plugin.name);
                self.language_service = wrapped;
                if let ProjectFlavor::Configured(state) = &mut self.flavor {
                    state.plugins.push(ActivePlugin { name: plugin.name, module });
                }
            }
            Err(error) => warn!(
                "{}: plugin {} activation failed: {error}",
                self.project_name, plugin.name
            ),
        }
    }

    /// Union of every plugin's external-file contribution, sorted and
    /// deduplicated. Plugins without the capability are skipped silently;
    /// a failing plugin is logged and skipped.
    pub(crate) fn plugin_external_files(&self) -> Vec<PathBuf> {
        let ProjectFlavor::Configured(state) = &self.flavor else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = Vec::new();
        for plugin in &state.plugins {
            match plugin.module.external_files(&self.project_name) {
                None => {}
                Some(Ok(mut extra)) => files.append(&mut extra),
                Some(Err(error)) => warn!(
                    "{}: plugin {} external files failed: {error}",
                    self.project_name, plugin.name
                ),
            }
        }
        files.into_iter().sorted().dedup().collect()
    }
}
