//! Plugin descriptors.
//!
//! A [`Plugin`] is produced only by a manager's `create_plugin`; it carries
//! the tag of the manager family that created it, and managers reject
//! plugins bearing any other tag.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

use hookline_core::PluginOptions;

use crate::hooks::handlers::HookImpls;

/// Synchronous plugin setup.
pub type Setup = Arc<dyn Fn() -> anyhow::Result<HookImpls> + Send + Sync>;

/// Asynchronous plugin setup.
pub type AsyncSetup = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<HookImpls>> + Send + Sync>;

/// A named unit contributing ordering constraints and a setup routine.
///
/// Immutable once created. Two plugins are the same plugin when their names
/// are equal.
#[derive(Clone)]
pub struct Plugin<S> {
    family: Uuid,
    name: String,
    pre: Vec<String>,
    post: Vec<String>,
    rivals: Vec<String>,
    required: Vec<String>,
    setup: S,
}

/// Plugin accepted by [`Manager`](crate::manager::Manager).
pub type SyncPlugin = Plugin<Setup>;

/// Plugin accepted by [`AsyncManager`](crate::async_manager::AsyncManager).
pub type AsyncPlugin = Plugin<AsyncSetup>;

impl<S> Plugin<S> {
    pub(crate) fn new(family: Uuid, name: String, options: PluginOptions, setup: S) -> Self {
        Self {
            family,
            name,
            pre: options.pre,
            post: options.post,
            rivals: options.rivals,
            required: options.required,
            setup,
        }
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugins ordered before this one.
    pub fn pre(&self) -> &[String] {
        &self.pre
    }

    /// Returns the plugins ordered after this one.
    pub fn post(&self) -> &[String] {
        &self.post
    }

    /// Returns the plugins that conflict with this one.
    pub fn rivals(&self) -> &[String] {
        &self.rivals
    }

    /// Returns the plugins this one depends on.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub(crate) fn family(&self) -> Uuid {
        self.family
    }

    pub(crate) fn setup(&self) -> &S {
        &self.setup
    }
}

impl<S> fmt::Debug for Plugin<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .field("rivals", &self.rivals)
            .field("required", &self.required)
            .finish()
    }
}
