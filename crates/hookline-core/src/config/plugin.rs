//! Plugin selection configuration.

use serde::{Deserialize, Serialize};

use crate::types::PluginOptions;

/// One plugin to register, with its ordering constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEntry {
    /// Plugin name; also the lookup key for built-in plugin setups.
    pub name: String,
    /// Whether the plugin is registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Plugins ordered before this one.
    #[serde(default)]
    pub pre: Vec<String>,
    /// Plugins ordered after this one.
    #[serde(default)]
    pub post: Vec<String>,
    /// Plugins that conflict with this one.
    #[serde(default)]
    pub rivals: Vec<String>,
    /// Plugins this one depends on.
    #[serde(default)]
    pub required: Vec<String>,
}

impl PluginEntry {
    /// Converts the entry into plugin options.
    pub fn options(&self) -> PluginOptions {
        PluginOptions::named(self.name.clone())
            .pre(self.pre.iter().cloned())
            .post(self.post.iter().cloned())
            .rivals(self.rivals.iter().cloned())
            .required(self.required.iter().cloned())
    }
}

fn default_true() -> bool {
    true
}
