//! Per-file records shared between projects and the script store.

use crate::utils::{self, CanonicalPath};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    path::{Path, PathBuf},
    rc::Rc,
};

/// Classification of a source file, derived from its extension unless the
/// client supplied one explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    Unknown,
    Js,
    Jsx,
    Ts,
    Tsx,
    External,
    Json,
    Deferred,
}

impl ScriptKind {
    pub fn from_file_name(file_name: &Path) -> Self {
        match file_name.extension().and_then(|e| e.to_str()) {
            Some("js") | Some("mjs") | Some("cjs") => ScriptKind::Js,
            Some("jsx") => ScriptKind::Jsx,
            Some("ts") | Some("mts") | Some("cts") => ScriptKind::Ts,
            Some("tsx") => ScriptKind::Tsx,
            Some("json") => ScriptKind::Json,
            _ => ScriptKind::Unknown,
        }
    }
}

/// The canonical per-file record owned by the script store.
///
/// Projects hold `Rc<ScriptInfo>` views and record their attachment here;
/// the attachment set is the refcount the store consults when deciding
/// whether a file can be released.
#[derive(Debug)]
pub struct ScriptInfo {
    file_name: PathBuf,
    path: CanonicalPath,
    script_kind: ScriptKind,
    has_mixed_content: bool,
    open_by_client: Cell<bool>,
    containing_projects: RefCell<BTreeSet<String>>,
}

impl ScriptInfo {
    pub fn new(
        file_name: PathBuf,
        path: CanonicalPath,
        script_kind: ScriptKind,
        has_mixed_content: bool,
    ) -> Self {
        ScriptInfo {
            file_name,
            path,
            script_kind,
            has_mixed_content,
            open_by_client: Cell::new(false),
            containing_projects: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn path(&self) -> &CanonicalPath {
        &self.path
    }

    pub fn script_kind(&self) -> ScriptKind {
        self.script_kind
    }

    pub fn has_mixed_content(&self) -> bool {
        self.has_mixed_content
    }

    pub fn is_open_by_client(&self) -> bool {
        self.open_by_client.get()
    }

    pub fn set_open_by_client(&self, open: bool) {
        self.open_by_client.set(open);
    }

    /// Returns `true` for sources in the dynamically typed dialect.
    pub fn is_javascript(&self) -> bool {
        matches!(self.script_kind, ScriptKind::Js | ScriptKind::Jsx)
    }

    /// Returns `true` for files that never contribute checked TypeScript:
    /// JavaScript sources and declaration files.
    pub fn is_js_or_dts(&self) -> bool {
        self.is_javascript() || utils::is_declaration_file(&self.file_name)
    }

    /// Records an attachment to `project`. Returns `false` if the project was
    /// already attached.
    pub fn attach_to_project(&self, project: &str) -> bool {
        self.containing_projects.borrow_mut().insert(project.to_string())
    }

    /// Removes the attachment to `project`. Returns `false` if the project
    /// was not attached.
    pub fn detach_from_project(&self, project: &str) -> bool {
        self.containing_projects.borrow_mut().remove(project)
    }

    pub fn is_attached(&self, project: &str) -> bool {
        self.containing_projects.borrow().contains(project)
    }

    pub fn containing_project_count(&self) -> usize {
        self.containing_projects.borrow().len()
    }
}

/// The script-store surface the core consumes. Script infos are owned by the
/// store; projects only hold shared views keyed by canonical path.
pub trait ScriptStore {
    /// Looks up the record for a user-facing file name.
    fn script_info(&self, file_name: &Path) -> Option<Rc<ScriptInfo>>;

    /// Looks up the record for an already-canonicalized path.
    fn script_info_for_path(&self, path: &CanonicalPath) -> Option<Rc<ScriptInfo>>;

    /// Looks up or creates the record for a file discovered by the project
    /// (external files, typing files). Returns `None` when the file cannot be
    /// represented, e.g. it vanished while being created.
    fn get_or_create_script_info(&self, file_name: &Path) -> Option<Rc<ScriptInfo>>;
}
