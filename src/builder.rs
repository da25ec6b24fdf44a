//! The seam to the incremental program builder.
//!
//! The builder consumes successive program snapshots and answers the two
//! queries the session layer needs from it: which files a save affects, and
//! per-file emit. It keeps whatever per-file state it needs (signatures,
//! reference graphs) behind this trait.

use crate::{program::Program, utils::CanonicalPath};
use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

pub trait ProgramBuilder {
    /// Feeds the builder the snapshot produced by a graph update, together
    /// with the predicate describing which files' resolutions were
    /// invalidated during it.
    fn on_program_update(
        &self,
        program: &Rc<Program>,
        has_invalidated_resolution: &dyn Fn(&CanonicalPath) -> bool,
    );

    /// Files whose emit output is affected when `path` is saved.
    fn affected_files(&self, path: &CanonicalPath) -> Vec<PathBuf>;

    /// Emits the outputs of a single file through `write_file`. Returns
    /// `false` when emit was skipped.
    fn emit_file(&self, path: &CanonicalPath, write_file: &mut dyn FnMut(&Path, &str)) -> bool;

    /// Drops all accumulated state. Called when the language service is
    /// disabled; the builder stays allocated so later change events can still
    /// be emitted.
    fn clear(&self);
}
