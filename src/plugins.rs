//! Language-service plugins for configured projects.
//!
//! Plugins are trusted in-process extenders: each resolvable module yields a
//! factory whose `create` wraps the project's language service. Wrappers are
//! installed in load order, so the effective service is the composition of
//! every successfully activated plugin around the original. Activation
//! failures are logged and skipped, never propagated.

use crate::program::LanguageService;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, rc::Rc};

/// A plugin entry as declared in the config file (or the service's global
/// plugin list): a module name plus an opaque configuration payload passed
/// through to the factory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginImport {
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,
}

impl PluginImport {
    pub fn named(name: impl Into<String>) -> Self {
        PluginImport { name: name.into(), config: serde_json::Value::Null }
    }
}

/// Everything a plugin factory receives when activated for a project.
pub struct PluginCreateInfo {
    pub project_name: String,
    /// The service to wrap: the original, or the product of previously
    /// installed wrappers.
    pub language_service: Rc<dyn LanguageService>,
    pub config: serde_json::Value,
}

/// A loaded plugin module.
pub trait PluginModule {
    /// Produces the wrapped language service. An `Err` is logged and leaves
    /// the previous service in place.
    fn create(
        &self,
        info: PluginCreateInfo,
    ) -> std::result::Result<Rc<dyn LanguageService>, String>;

    /// Extra files the plugin injects into the project. `None` means the
    /// plugin does not support the capability; an inner `Err` is logged and
    /// that plugin's contribution skipped.
    fn external_files(
        &self,
        _project: &str,
    ) -> Option<std::result::Result<Vec<PathBuf>, String>> {
        None
    }
}

/// A successfully activated plugin, kept for its external-file capability
/// and for logging.
pub struct ActivePlugin {
    pub name: String,
    pub module: Rc<dyn PluginModule>,
}

impl std::fmt::Debug for ActivePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivePlugin").field("name", &self.name).finish()
    }
}
