//! Versioned change deltas reported to the client session.
//!
//! A session polls each project with the last version it has seen and gets
//! back one of three shapes: the full file list (baseline), a diff against
//! the previously reported list, or just the project info when nothing
//! changed. The shapes are serialized camelCase for the wire.

use crate::{config::CompilerOptions, error::ProjectDiagnostic};
use serde::Serialize;
use std::path::PathBuf;

/// Header attached to every delta response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub project_name: String,
    /// The project structure version the response describes.
    pub version: usize,
    pub is_inferred: bool,
    pub options: CompilerOptions,
    pub language_service_disabled: bool,
}

/// File-set diff against the previously reported snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProjectFileChanges {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
}

impl ProjectFileChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// One delta response. Exactly one of `files` (baseline) and `changes`
/// (diff) is set, or neither when the project is unchanged.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    pub info: ProjectInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ProjectFileChanges>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_errors: Vec<ProjectDiagnostic>,
}
