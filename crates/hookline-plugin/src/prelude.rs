//! Prelude for convenient imports.

pub use serde_json::{Value, json};

pub use crate::async_manager::{AsyncManager, create_async_manager};
pub use crate::context::{Container, Context, create_container};
pub use crate::hooks::pipeline::{AsyncNext, Next};
pub use crate::hooks::{Hook, HookDeclarations, HookImpls, RunnerMap, use_runner};
pub use crate::manager::{InitOptions, Manager, create_manager};
pub use crate::plugin::{AsyncPlugin, SyncPlugin};

pub use hookline_core::{PluginError, PluginOptions, PluginResult};

pub use crate::declare_hooks;
