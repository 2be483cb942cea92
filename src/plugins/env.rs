//! Resolves build settings from the process environment.

use tracing::debug;

use hookline_plugin::prelude::*;

use super::BuildSettings;

pub fn setup(settings: &Context<BuildSettings>) -> anyhow::Result<HookImpls> {
    let defaults = BuildSettings::default();
    let resolved = BuildSettings {
        mode: std::env::var("HOOKLINE_MODE").unwrap_or(defaults.mode),
        out_dir: std::env::var("HOOKLINE_OUT_DIR").unwrap_or(defaults.out_dir),
    };

    debug!(mode = %resolved.mode, out_dir = %resolved.out_dir, "Resolved build settings");
    settings.set(resolved.clone())?;

    let dry_run = resolved.mode == "dry-run";
    let fragment = serde_json::to_value(&resolved)?;

    Ok(HookImpls::new()
        .worker("config", move |_| Ok(Some(fragment.clone())))
        .worker("beforeBuild", move |_| {
            Ok(dry_run.then(|| json!("dry run requested")))
        }))
}
