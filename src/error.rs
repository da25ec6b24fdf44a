use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectError>;

/// Various error types
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The file exists in the script store but is not attached to this project.
    #[error("file \"{}\" does not belong to project \"{1}\"", .0.display())]
    DocumentNotInProject(PathBuf, String),
    /// General purpose message.
    #[error("{0}")]
    Message(String),
}

impl ProjectError {
    /// General purpose message.
    pub fn msg(msg: impl std::fmt::Display) -> Self {
        ProjectError::Message(msg.to_string())
    }
}

/// Severity of a [`ProjectDiagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Message,
}

/// A project-level diagnostic entry, reported to the session layer alongside
/// file deltas.
///
/// Entries without a `file` describe the project as a whole; those are the
/// only ones surfaced through [`crate::Project::global_project_errors`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDiagnostic {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub category: DiagnosticCategory,
    pub message: String,
}

impl ProjectDiagnostic {
    /// The diagnostic recorded when a configured project's include patterns
    /// match no input files.
    pub fn no_input_files(config_file_name: &std::path::Path) -> Self {
        ProjectDiagnostic {
            file: None,
            category: DiagnosticCategory::Error,
            message: format!(
                "No inputs were found in config file \"{}\"",
                config_file_name.display()
            ),
        }
    }

    /// Returns `true` if this is the no-input-files diagnostic.
    pub fn is_no_input_files(&self) -> bool {
        self.file.is_none() && self.message.starts_with("No inputs were found")
    }
}
