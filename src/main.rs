//! Hookline Build: a small bundler lifecycle driven by plugins.
//!
//! Loads configuration, selects the built-in plugins it names, and runs the
//! `config` → `validateSchema` → `beforeBuild` → `modifyEntryImports` →
//! `afterBuild` hooks through the generated runners.

mod plugins;

use serde_json::{Map, Value, json};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use hookline_core::PluginResult;
use hookline_core::config::AppConfig;
use hookline_plugin::prelude::*;

use crate::plugins::BuildSettings;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Build failed");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> PluginResult<AppConfig> {
    let config_path =
        std::env::var("HOOKLINE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Hooks making up the build lifecycle.
fn lifecycle_hooks() -> HookDeclarations {
    declare_hooks! {
        "config" => Hook::parallel_workflow(),
        "validateSchema" => Hook::parallel_workflow(),
        "modifyEntryImports" => Hook::async_waterfall(),
        "beforeBuild" => Hook::async_workflow(),
        "afterBuild" => Hook::async_workflow(),
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting hookline-build v{}", env!("CARGO_PKG_VERSION"));

    let manager = create_manager(lifecycle_hooks());
    let settings = Context::new(BuildSettings::default());

    let mut selected = Vec::new();
    for entry in config.enabled_plugins() {
        match plugins::builtin(&manager, entry, &settings) {
            Some(plugin) => selected.push(plugin),
            None => warn!(plugin = %entry.name, "Unknown plugin in configuration, skipping"),
        }
    }
    manager.use_plugin(selected);
    info!(plugins = ?manager.plugin_names(), "Plugins registered");

    let runners = manager.init()?;
    let mode = manager.run(|| settings.get().mode);
    info!(mode = %mode, "Build settings resolved");

    let fragments = runners
        .parallel_workflow("config")?
        .run(json!({ "mode": mode }))
        .await?;
    let merged = merge_fragments(fragments);

    let problems = runners
        .parallel_workflow("validateSchema")?
        .run(merged.clone())
        .await?;
    if !problems.is_empty() {
        anyhow::bail!("invalid build configuration: {}", Value::Array(problems));
    }

    if let Some(reason) = runners
        .async_workflow("beforeBuild")?
        .run(merged.clone())
        .await?
    {
        info!(reason = %reason, "Build skipped");
        return Ok(());
    }

    let entry = runners
        .async_waterfall("modifyEntryImports")?
        .run(json!(["import './app';"]))
        .await?;
    info!(entry = %entry, "Entry imports generated");

    runners
        .async_workflow("afterBuild")?
        .run(json!({ "config": merged, "entry": entry }))
        .await?;

    info!("Build finished");
    Ok(())
}

/// Shallow-merges object fragments, later fragments winning.
fn merge_fragments(fragments: Vec<Value>) -> Value {
    let mut merged = Map::new();
    for fragment in fragments {
        if let Value::Object(fields) = fragment {
            merged.extend(fields);
        }
    }
    Value::Object(merged)
}
