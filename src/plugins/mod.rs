//! Built-in plugins of the build binary.

mod analyzer;
mod env;
mod router;

use serde::{Deserialize, Serialize};

use hookline_core::config::plugin::PluginEntry;
use hookline_plugin::prelude::*;

/// Settings resolved by the `env` plugin and read by the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSettings {
    pub mode: String,
    pub out_dir: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            mode: "development".to_string(),
            out_dir: "dist".to_string(),
        }
    }
}

/// Creates the built-in plugin named by `entry`, if there is one.
pub fn builtin(
    manager: &Manager,
    entry: &PluginEntry,
    settings: &Context<BuildSettings>,
) -> Option<SyncPlugin> {
    let options = entry.options();
    let settings = settings.clone();

    let plugin = match entry.name.as_str() {
        "env" => manager.create_plugin(move || env::setup(&settings), options),
        "router" => manager.create_plugin(move || router::setup(&settings), options),
        "analyzer" => manager.create_plugin(analyzer::setup, options),
        _ => return None,
    };

    Some(plugin)
}
