//! Shared fixtures for manager integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};

use hookline_plugin::prelude::*;

/// Error type used to check that handler and setup errors pass through unchanged.
#[derive(Debug, thiserror::Error)]
#[error("setup exploded: {0}")]
pub struct Explosion(pub &'static str);

/// Hooks shared by the sync manager tests.
pub fn build_hooks() -> HookDeclarations {
    declare_hooks! {
        "transform" => Hook::waterfall(),
        "resolve" => Hook::workflow(),
        "collect" => Hook::parallel_workflow(),
    }
}

/// Waterfall step appending `suffix` to a string seed.
pub fn append(suffix: &'static str) -> impl Fn(Value) -> anyhow::Result<Value> + Send + Sync {
    move |value: Value| Ok(json!(format!("{}{suffix}", value.as_str().unwrap_or_default())))
}

/// Setup contributing a single `transform` step.
pub fn appending_setup(
    suffix: &'static str,
) -> impl Fn() -> anyhow::Result<HookImpls> + Send + Sync {
    move || Ok(HookImpls::new().brook("transform", append(suffix)))
}

/// Runs the `transform` waterfall from an empty seed.
pub fn transform(runners: &RunnerMap) -> String {
    let value = runners
        .waterfall("transform")
        .unwrap()
        .run(json!(""))
        .unwrap();
    value.as_str().unwrap_or_default().to_string()
}
