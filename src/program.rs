//! Program snapshots and the compilation-engine seam.
//!
//! A [`Program`] is an immutable snapshot produced by the engine: the source
//! files in scope, each with its per-file resolution table, plus the paths
//! the program referenced but could not find on disk. The project swaps the
//! snapshot atomically during a graph update and keeps the previous one only
//! long enough to compute diffs.

use crate::{config::CompilerOptions, utils::CanonicalPath};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    rc::Rc,
};

/// How much of the previous program the new one inherits. Only `Completely`
/// signals that the file set is unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StructureReuse {
    Not,
    SafeModules,
    Completely,
}

/// A single source file inside a [`Program`].
#[derive(Clone, Debug)]
pub struct ProgramFile {
    /// User-facing file name.
    pub file_name: PathBuf,
    /// Canonical form of `file_name`.
    pub path: CanonicalPath,
    /// Module specifier → resolved file; `None` marks a failed resolution.
    pub resolved_modules: BTreeMap<String, Option<PathBuf>>,
    /// Whether the file was pulled in from an external library
    /// (`node_modules`); such files can be excluded from reported file lists.
    pub is_from_external_library: bool,
    /// Whether this is the engine's default library. Default libraries are
    /// ambient: they appear in file lists but never count as project content.
    pub is_default_library: bool,
}

/// An immutable compilation snapshot.
#[derive(Debug, Default)]
pub struct Program {
    files: Vec<Rc<ProgramFile>>,
    by_path: BTreeMap<CanonicalPath, usize>,
    missing_file_paths: Vec<PathBuf>,
}

impl Program {
    pub fn new(files: Vec<Rc<ProgramFile>>, missing_file_paths: Vec<PathBuf>) -> Self {
        let by_path = files
            .iter()
            .enumerate()
            .map(|(idx, file)| (file.path.clone(), idx))
            .collect();
        Program { files, by_path, missing_file_paths }
    }

    pub fn source_files(&self) -> &[Rc<ProgramFile>] {
        &self.files
    }

    pub fn file_for_path(&self, path: &CanonicalPath) -> Option<&Rc<ProgramFile>> {
        self.by_path.get(path).map(|idx| &self.files[*idx])
    }

    pub fn contains_path(&self, path: &CanonicalPath) -> bool {
        self.by_path.contains_key(path)
    }

    /// Paths the program referenced but that do not exist on disk.
    pub fn missing_file_paths(&self) -> &[PathBuf] {
        &self.missing_file_paths
    }

    pub fn file_names(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.file_name.as_path())
    }
}

/// Result of asking the engine to synchronize its program.
#[derive(Clone, Debug)]
pub struct ProgramUpdate {
    pub program: Rc<Program>,
    pub structure_reuse: StructureReuse,
}

/// The slice of project state the engine reads while synchronizing.
pub struct ProgramHost<'a> {
    /// Root file names in root order, placeholders for missing roots
    /// included.
    pub root_file_names: Vec<PathBuf>,
    pub options: &'a CompilerOptions,
    /// Declaration files delivered by the typings helper, appended to the
    /// program inputs.
    pub typing_files: &'a [PathBuf],
    /// Snapshot predicate telling the engine which files' cached resolution
    /// results must be discarded during this synchronization.
    pub has_invalidated_resolution: &'a dyn Fn(&CanonicalPath) -> bool,
    /// The previous snapshot, for structure reuse.
    pub old_program: Option<Rc<Program>>,
}

/// The compilation engine as seen by a project: a black box that yields
/// program snapshots and owns the semantic caches behind them.
///
/// Plugins wrap values of this trait; the project's handle is replaced by
/// each installed wrapper in load order.
pub trait LanguageService {
    /// Synchronizes and returns the current program snapshot.
    fn update_program(&self, host: ProgramHost<'_>) -> ProgramUpdate;

    /// Drops semantic caches; called when the language service is disabled
    /// for the project.
    fn clean_semantic_cache(&self) {}

    /// Releases source files acquired from the document registry; called
    /// exactly once when the project closes.
    fn dispose(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> Rc<ProgramFile> {
        Rc::new(ProgramFile {
            file_name: PathBuf::from(name),
            path: CanonicalPath::new(Path::new(name), true),
            resolved_modules: BTreeMap::new(),
            is_from_external_library: false,
            is_default_library: false,
        })
    }

    #[test]
    fn indexes_files_by_canonical_path() {
        let program = Program::new(vec![file("/p/a.ts"), file("/p/b.ts")], vec![]);
        let path = CanonicalPath::new(Path::new("/p/b.ts"), true);
        assert!(program.contains_path(&path));
        assert_eq!(
            program.file_for_path(&path).unwrap().file_name,
            PathBuf::from("/p/b.ts")
        );
        let absent = CanonicalPath::new(Path::new("/p/c.ts"), true);
        assert!(!program.contains_path(&absent));
    }

    #[test]
    fn structure_reuse_orders_below_completely() {
        assert!(StructureReuse::Not < StructureReuse::Completely);
        assert!(StructureReuse::SafeModules < StructureReuse::Completely);
    }
}
