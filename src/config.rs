//! Compiler options and the slice of parsed configuration the core consumes.

use crate::plugins::PluginImport;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Module system emitted by the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleKind {
    None,
    CommonJs,
    Amd,
    Umd,
    System,
    Es2015,
    EsNext,
}

/// Strategy used by the resolver to locate module specifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleResolutionKind {
    Classic,
    Node,
    Node16,
    Bundler,
}

/// Language level the compiler targets; selects the default library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptTarget {
    Es3,
    Es5,
    Es2015,
    Es2020,
    EsNext,
}

/// Compiler options relevant to project management.
///
/// Every field is optional; `None` means "not set" and defers to the engine's
/// defaults. Serialized camelCase for the session layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_non_ts_extensions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_js: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_node_module_js_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_resolution: Option<ModuleResolutionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_emit: Option<bool>,
    /// Internal override applied to inferred and external projects so that
    /// stray JavaScript inputs never produce emit output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_emit_for_js_files: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_lib: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_resolve: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_json_module: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dirs: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ScriptTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_roots: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

impl CompilerOptions {
    /// Returns `true` if switching from `old` to `self` can change module
    /// resolution results, which forces the resolution cache and the
    /// unresolved-imports index to be dropped.
    pub fn affects_module_resolution(&self, old: &CompilerOptions) -> bool {
        self.module_resolution != old.module_resolution
            || self.base_url != old.base_url
            || self.paths != old.paths
            || self.root_dirs != old.root_dirs
            || self.type_roots != old.type_roots
            || self.types != old.types
            || self.no_resolve != old.no_resolve
            || self.resolve_json_module != old.resolve_json_module
    }
}

/// Name of the default library for the configured target.
pub fn default_lib_file_name(options: &CompilerOptions) -> &'static str {
    match options.target {
        Some(ScriptTarget::Es2015) => "lib.es2015.full.d.ts",
        Some(ScriptTarget::Es2020) => "lib.es2020.full.d.ts",
        Some(ScriptTarget::EsNext) => "lib.esnext.full.d.ts",
        Some(ScriptTarget::Es3) | Some(ScriptTarget::Es5) | None => "lib.d.ts",
    }
}

/// Directories that supply ambient declaration packages.
///
/// Explicit `typeRoots` win; otherwise every ancestor of `current_directory`
/// contributes its `node_modules/@types` directory, nearest first.
pub fn effective_type_roots(
    options: &CompilerOptions,
    current_directory: &Path,
) -> Vec<PathBuf> {
    if let Some(roots) = &options.type_roots {
        return roots.clone();
    }
    let mut result = Vec::new();
    let mut dir = Some(current_directory);
    while let Some(d) = dir {
        result.push(d.join("node_modules").join("@types"));
        dir = d.parent();
    }
    result
}

/// Automatic type-acquisition settings for a project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeAcquisition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Whether a wildcard directory watch descends into subdirectories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WildcardWatchMode {
    Flat,
    Recursive,
}

/// The slice of a parsed config file a configured project consumes: watch
/// inputs and plugin declarations. Root selection itself stays with the
/// project service.
#[derive(Clone, Debug, Default)]
pub struct ConfigSnapshot {
    /// Normalized path of the config file.
    pub config_file_name: PathBuf,
    /// `true` when the config lists explicit `files`, which suppresses the
    /// no-input-files diagnostic.
    pub has_explicit_files: bool,
    /// Directories captured by include globs, with their recursion mode.
    pub wildcard_directories: BTreeMap<PathBuf, WildcardWatchMode>,
    /// Plugins declared by the config file, in declaration order.
    pub plugins: Vec<PluginImport>,
    /// Config files pulled in through `extends`, outermost first.
    pub extended_config_files: Vec<PathBuf>,
    /// Type-acquisition settings from the config file, if present.
    pub type_acquisition: Option<TypeAcquisition>,
}
