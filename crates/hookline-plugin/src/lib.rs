//! # hookline-plugin
//!
//! Plugin orchestration core for Hookline. Provides:
//!
//! - Named, typed hooks of seven kinds (waterfall, workflow, parallel
//!   workflow, pipeline and their async variants)
//! - Plugins with `pre`/`post` ordering, rivals and required dependencies
//! - Scoped context containers that follow a call chain across awaits
//! - Sync and async managers that resolve plugins into executable runners

#[macro_use]
mod macros;

pub mod async_manager;
pub mod context;
pub mod hooks;
pub mod manager;
pub mod ordering;
pub mod plugin;
pub mod prelude;
pub mod registry;

pub use async_manager::{AsyncManager, create_async_manager};
pub use context::{
    Container, Context, create_container, current_container, run_with_container,
    run_with_container_async,
};
pub use hooks::{Hook, HookDeclarations, HookImpls, HookKind, RunnerMap, use_runner};
pub use manager::{InitOptions, Manager, create_manager};
pub use plugin::{AsyncPlugin, Plugin, SyncPlugin};
pub use registry::PluginRegistry;

pub use hookline_core::{ErrorKind, PluginError, PluginOptions, PluginResult};
