//! Watcher vocabulary shared between projects and the surrounding service.
//!
//! The project core never touches the filesystem itself. It asks the project
//! service for file and directory watchers, keeps the returned handles, and
//! closes every handle with an explicit [`WatcherCloseReason`] so tests and
//! logs can tell *why* a watcher went away without string matching.

use std::{fmt, path::Path, rc::Rc};

/// Kind of change a watcher callback observed, enum-valued by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileWatchEvent {
    Created,
    Changed,
    Deleted,
}

/// What a watcher is watching. Used for logging and service-side policy
/// (polling intervals); carries no behavior in the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchType {
    FailedLookupLocation,
    MissingFilePath,
    ConfigFilePath,
    WildcardDirectories,
    TypeRoot,
}

impl fmt::Display for WatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchType::FailedLookupLocation => "FailedLookupLocation",
            WatchType::MissingFilePath => "MissingFilePath",
            WatchType::ConfigFilePath => "ConfigFilePath",
            WatchType::WildcardDirectories => "WildcardDirectories",
            WatchType::TypeRoot => "TypeRoot",
        };
        f.write_str(s)
    }
}

/// Why a watcher was closed. Every termination path supplies one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherCloseReason {
    /// The owning project is shutting down.
    ProjectClose,
    /// The watched path is no longer relevant to the project.
    NotNeeded,
    /// A missing file appeared on disk.
    FileCreated,
    /// The recursive flag of a wildcard directory changed.
    RecursiveChanged,
}

impl fmt::Display for WatcherCloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatcherCloseReason::ProjectClose => "ProjectClose",
            WatcherCloseReason::NotNeeded => "NotNeeded",
            WatcherCloseReason::FileCreated => "FileCreated",
            WatcherCloseReason::RecursiveChanged => "RecursiveChanged",
        };
        f.write_str(s)
    }
}

/// Opaque token identifying an open watcher. Issued by the project service;
/// the project hands it back on close.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherHandle(pub u64);

/// Callback invoked for file watcher events. Callbacks are queued onto the
/// single project-service task and never preempt an in-progress operation.
pub type FileWatchCallback = Rc<dyn Fn(&Path, FileWatchEvent)>;

/// Callback invoked with the changed path under a watched directory.
pub type DirectoryWatchCallback = Rc<dyn Fn(&Path)>;
