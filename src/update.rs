//! The graph-update protocol.
//!
//! `update_graph` is the project's central operation. A full pass performs
//! these steps:
//!
//! 1. Open a resolution-cache recording window and publish the
//!    `has_invalidated_resolution` predicate so the engine can decide
//!    per-file which cached results to discard.
//! 2. Run the graph worker: ask the engine for the current program, detach
//!    script infos that dropped out of it, reconcile the missing-file
//!    watchers against the new snapshot and diff the plugin-provided
//!    external files.
//! 3. Close the recording window and drop the unresolved-imports entry of
//!    every file whose resolutions changed.
//! 4. If anything changed, re-extract unresolved imports across the program.
//! 5. Ask the typings helper for the project's typing files. A changed list
//!    dirties the project and re-runs the worker exactly once; the list only
//!    grows the input set, so the second pass converges.
//! 6. Reconcile the configured project's no-input-files diagnostic against
//!    the post-update root set.
//! 7. Feed the builder the final snapshot (or clear it while the language
//!    service is disabled).
//!
//! A configured project with an armed reload latch skips all of this and
//! delegates to the service's reload path instead.

use crate::{
    program::{ProgramHost, StructureReuse},
    project::{Project, ProjectFlavor},
    unresolved::extract_unresolved_imports,
    utils::{enumerate_inserts_and_deletes, CanonicalPath},
    watch::{WatchType, WatcherCloseReason},
};
use itertools::Itertools;
use std::{collections::BTreeMap, path::PathBuf, rc::Rc};

impl Project {
    /// Synchronizes the project with its roots, resolutions and typings.
    /// Returns `true` iff the file set is unchanged.
    pub fn update_graph(&mut self) -> bool {
        debug_assert!(!self.closed, "updating graph of closed project {}", self.project_name);
        if self.pending_reload() {
            if let ProjectFlavor::Configured(state) = &mut self.flavor {
                state.pending_reload = false;
            }
            debug!("{}: config file changed, delegating to reload", self.project_name);
            self.dirty = false;
            self.services.reload_configured_project(&self.project_name);
            // The reload path publishes its own structural updates.
            return true;
        }

        trace!(
            "{}: updating graph at state version {}",
            self.project_name,
            self.project_state_version
        );
        self.resolution_cache.start_recording_changes();
        let mut has_changes = self.update_graph_worker();
        let changed_resolutions = self.resolution_cache.finish_recording_changes();
        for path in &changed_resolutions {
            self.unresolved_imports.remove(path);
        }

        if has_changes || !changed_resolutions.is_empty() {
            self.refresh_unresolved_imports();
        }
        let unresolved: Vec<String> = self
            .last_cached_unresolved_imports
            .as_deref()
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        let services = Rc::clone(&self.services);
        let typings =
            services.typings_for_project(&self.project_name, &unresolved, has_changes);
        if self.set_typings(typings) {
            has_changes = self.update_graph_worker() || has_changes;
        }

        self.update_error_on_no_input_files(!self.root_file_names().is_empty());
        self.notify_builder();
        if has_changes {
            self.project_structure_version += 1;
        }
        self.dirty = false;
        trace!(
            "{}: graph update finished, structure version {}, changed: {has_changes}",
            self.project_name,
            self.project_structure_version
        );
        !has_changes
    }

    fn update_graph_worker(&mut self) -> bool {
        let old_program = self.program.clone();
        let resolution_cache = Rc::clone(&self.resolution_cache);
        let has_invalidated_resolution =
            move |path: &CanonicalPath| resolution_cache.has_invalidated_resolution(path);

        let update = {
            let host = ProgramHost {
                root_file_names: self.root_file_names(),
                options: &self.compiler_options,
                typing_files: &self.typing_files,
                has_invalidated_resolution: &has_invalidated_resolution,
                old_program: old_program.clone(),
            };
            let language_service = Rc::clone(&self.language_service);
            language_service.update_program(host)
        };
        let program = update.program;
        self.program = Some(Rc::clone(&program));

        let has_changes = match &old_program {
            None => true,
            Some(old) => {
                !Rc::ptr_eq(old, &program)
                    && update.structure_reuse < StructureReuse::Completely
            }
        };
        if has_changes {
            if let Some(old) = &old_program {
                // Detachment runs before any attachment below, so a file
                // that leaves the program and re-enters through the
                // external-file set ends up attached.
                for file in old.source_files() {
                    if !program.contains_path(&file.path) {
                        self.detach_script_info(&file.file_name);
                    }
                }
            }
        }
        self.reconcile_missing_file_watches();
        self.refresh_external_files();
        has_changes
    }

    /// Brings the missing-file watchers in line with the paths the current
    /// program references but cannot find.
    fn reconcile_missing_file_watches(&mut self) {
        let Some(program) = self.program.clone() else { return };
        let missing_now: BTreeMap<CanonicalPath, PathBuf> = program
            .missing_file_paths()
            .iter()
            .map(|file| (self.services.to_canonical(file), file.clone()))
            .collect();

        let stale: Vec<CanonicalPath> = self
            .missing_files
            .keys()
            .filter(|path| !missing_now.contains_key(*path))
            .cloned()
            .collect();
        for path in stale {
            if let Some(watch) = self.missing_files.remove(&path) {
                self.services.close_file_watcher(
                    WatchType::MissingFilePath,
                    &self.project_name,
                    &watch.file_name,
                    watch.handle,
                    WatcherCloseReason::NotNeeded,
                );
            }
        }
        for (path, file_name) in missing_now {
            if !self.missing_files.contains_key(&path) {
                self.add_missing_file_watcher(path, file_name);
            }
        }
    }

    /// Diffs the plugin-provided file set and attaches/detaches script infos
    /// accordingly.
    fn refresh_external_files(&mut self) {
        let new_external = self.plugin_external_files();
        let old_external = std::mem::take(&mut self.external_files);
        let mut attach: Vec<PathBuf> = Vec::new();
        let mut detach: Vec<PathBuf> = Vec::new();
        enumerate_inserts_and_deletes(
            &new_external,
            &old_external,
            |inserted| attach.push(inserted.clone()),
            |removed| detach.push(removed.clone()),
        );
        for file in detach {
            if let Some(info) = self.services.script_info(&file) {
                info.detach_from_project(&self.project_name);
            }
        }
        for file in attach {
            if let Some(info) = self.services.get_or_create_script_info(&file) {
                info.attach_to_project(&self.project_name);
            }
        }
        self.external_files = new_external;
    }

    /// Re-extracts the deduplicated, sorted unresolved-import list across
    /// every source file of the current program.
    fn refresh_unresolved_imports(&mut self) {
        let Some(program) = self.program.clone() else {
            self.last_cached_unresolved_imports = None;
            return;
        };
        let mut sink = Vec::new();
        for file in program.source_files() {
            extract_unresolved_imports(file, &mut self.unresolved_imports, &mut sink);
        }
        let list: Vec<String> = sink.into_iter().sorted().dedup().collect();
        self.last_cached_unresolved_imports = Some(list.into());
    }

    /// Installs a new typing-file list when it differs element-wise from the
    /// current one. Returns `true` when it did.
    fn set_typings(&mut self, typings: Vec<PathBuf>) -> bool {
        if self.typing_files == typings {
            return false;
        }
        trace!(
            "{}: typing files changed, now {} entries",
            self.project_name,
            typings.len()
        );
        self.typing_files = typings;
        self.mark_as_dirty();
        true
    }

    fn notify_builder(&mut self) {
        let Some(builder) = self.builder.clone() else { return };
        if self.language_service_enabled {
            if let Some(program) = self.program.clone() {
                let resolution_cache = Rc::clone(&self.resolution_cache);
                builder.on_program_update(&program, &move |path| {
                    resolution_cache.has_invalidated_resolution(path)
                });
            }
        } else {
            builder.clear();
        }
    }
}
