//! The surfaces the surrounding project service and host expose to a project.
//!
//! The multi-project registry, the filesystem watcher primitives, the script
//! store and the typings-acquisition helper all live outside the core; a
//! project reaches them exclusively through [`ProjectServices`]. The raw host
//! (module loading, hashing, path resolution) is [`SystemHost`].

use crate::{
    plugins::PluginModule,
    script::{ScriptInfo, ScriptStore},
    utils::{self, CanonicalPath},
    watch::{
        DirectoryWatchCallback, FileWatchCallback, WatchType, WatcherCloseReason, WatcherHandle,
    },
};
use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

/// Per-project view of the project service. One instance is shared by every
/// project the service owns; calls identify the project by name.
pub trait ProjectServices: ScriptStore {
    /// Canonicalizes a user-facing file name with the host's case rules.
    fn to_canonical(&self, file_name: &Path) -> CanonicalPath;

    fn watch_file(
        &self,
        watch_type: WatchType,
        project: &str,
        file: &Path,
        callback: FileWatchCallback,
    ) -> WatcherHandle;

    fn close_file_watcher(
        &self,
        watch_type: WatchType,
        project: &str,
        file: &Path,
        handle: WatcherHandle,
        reason: WatcherCloseReason,
    );

    fn watch_directory(
        &self,
        watch_type: WatchType,
        project: &str,
        directory: &Path,
        recursive: bool,
        callback: DirectoryWatchCallback,
    ) -> WatcherHandle;

    fn close_directory_watcher(
        &self,
        watch_type: WatchType,
        project: &str,
        directory: &Path,
        handle: WatcherHandle,
        reason: WatcherCloseReason,
    );

    /// Asks the typings helper for the declaration files the project should
    /// fold into its inputs, given its current unresolved imports.
    fn typings_for_project(
        &self,
        project: &str,
        unresolved_imports: &[String],
        has_changes: bool,
    ) -> Vec<PathBuf>;

    fn global_typings_cache_location(&self) -> Option<PathBuf> {
        None
    }

    /// Requests a delayed graph refresh for the project. Multiple requests
    /// coalesce into a single `update_graph` call.
    fn schedule_project_graph_refresh(&self, project: &str);

    /// Re-reads the config file of a configured project and republishes its
    /// roots. Invoked from `update_graph` when the pending-reload latch is
    /// set.
    fn reload_configured_project(&self, project: &str);

    /// Starts watching for config files that could claim this inferred-root
    /// file, so its later creation can promote the file into a configured
    /// project.
    fn watch_config_files_for_root(&self, root: &Rc<ScriptInfo>);

    fn stop_watching_config_files_for_root(&self, root: &Rc<ScriptInfo>);

    fn use_single_inferred_project(&self) -> bool {
        false
    }

    fn allow_local_plugin_loads(&self) -> bool {
        false
    }

    fn plugin_probe_locations(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn global_plugins(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Raw host operations a project consumes directly.
pub trait SystemHost {
    /// Resolves a possibly relative path against the host's current
    /// directory.
    fn resolve_path(&self, path: &Path) -> PathBuf;

    /// Loads a plugin module by name from `search_path`. The error string is
    /// logged, never propagated.
    fn require(
        &self,
        search_path: &Path,
        module_name: &str,
    ) -> std::result::Result<Rc<dyn PluginModule>, String>;

    /// Content hash used for emit signatures and change detection.
    fn create_hash(&self, data: &str) -> String {
        utils::content_hash(data)
    }

    /// Path of the running server binary; plugin probing starts from its
    /// package root.
    fn executing_file_path(&self) -> PathBuf;
}
