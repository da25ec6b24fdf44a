#![doc = include_str!("../README.md")]
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

#[macro_use]
extern crate tracing;

pub mod error;
pub use error::{DiagnosticCategory, ProjectDiagnostic, ProjectError, Result};

pub mod builder;
pub use builder::ProgramBuilder;

pub mod changes;
pub use changes::{ProjectChanges, ProjectFileChanges, ProjectInfo};

pub mod config;
pub use config::{
    default_lib_file_name, effective_type_roots, CompilerOptions, ConfigSnapshot, ModuleKind,
    ModuleResolutionKind, ScriptTarget, TypeAcquisition, WildcardWatchMode,
};

pub mod configured;
pub use configured::ConfiguredState;

pub mod plugins;
pub use plugins::{PluginCreateInfo, PluginImport, PluginModule};

pub mod program;
pub use program::{
    LanguageService, Program, ProgramFile, ProgramHost, ProgramUpdate, StructureReuse,
};

pub mod project;
pub use project::{
    ExternalState, InferredState, Project, ProjectContext, ProjectFlavor, ProjectKind,
};

pub mod resolution;
pub use resolution::ResolutionCache;

pub mod script;
pub use script::{ScriptInfo, ScriptKind, ScriptStore};

pub mod service;
pub use service::{ProjectServices, SystemHost};

pub mod unresolved;
pub use unresolved::UnresolvedImportsIndex;

mod update;

pub mod utils;
pub use utils::CanonicalPath;

pub mod watch;
pub use watch::{
    DirectoryWatchCallback, FileWatchCallback, FileWatchEvent, WatchType, WatcherCloseReason,
    WatcherHandle,
};

#[cfg(test)]
mod mocks;
