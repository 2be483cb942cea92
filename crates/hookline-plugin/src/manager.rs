//! Synchronous plugin manager.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use hookline_core::{PluginOptions, PluginResult};

use crate::context::{Container, current_container, run_with_container, run_with_container_async};
use crate::hooks::definitions::HookDeclarations;
use crate::hooks::handlers::HookImpls;
use crate::hooks::runner::RunnerMap;
use crate::plugin::{SyncPlugin, Setup};
use crate::registry::PluginRegistry;

/// Options for `init` and `run`.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Container to use instead of the manager's default one.
    pub container: Option<Container>,
}

impl InitOptions {
    /// Creates options using the manager's default container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options targeting `container`.
    pub fn with_container(container: Container) -> Self {
        Self {
            container: Some(container),
        }
    }

    pub(crate) fn resolve(self, fallback: &Container) -> Container {
        self.container.unwrap_or_else(|| fallback.clone())
    }
}

/// Creates a manager declaring `hooks`.
pub fn create_manager(hooks: HookDeclarations) -> Manager {
    Manager::new(hooks)
}

/// Manager whose plugin setups run synchronously.
///
/// Hooks of any kind may still be declared; only the setups are sync.
/// Cloning yields an independent manager with the same hook declarations, no
/// plugins and its own default container. Plugins created by either one are
/// accepted by both.
#[derive(Debug)]
pub struct Manager {
    registry: PluginRegistry<Setup>,
}

impl Manager {
    /// Creates a manager declaring `hooks`.
    pub fn new(hooks: HookDeclarations) -> Self {
        Self {
            registry: PluginRegistry::new(hooks),
        }
    }

    /// Creates a plugin bound to this manager family.
    pub fn create_plugin<F>(&self, setup: F, options: PluginOptions) -> SyncPlugin
    where
        F: Fn() -> anyhow::Result<HookImpls> + Send + Sync + 'static,
    {
        self.registry.create_plugin(Arc::new(setup), options)
    }

    /// Returns whether `plugin` was created by this manager family.
    pub fn is_plugin(&self, plugin: &SyncPlugin) -> bool {
        self.registry.is_plugin(plugin)
    }

    /// Registers plugins in order, skipping foreign and duplicate ones.
    pub fn use_plugin<I>(&self, plugins: I) -> &Self
    where
        I: IntoIterator<Item = SyncPlugin>,
    {
        self.registry.use_plugins(plugins);
        self
    }

    /// Adds hook declarations. Names already declared keep their hook.
    ///
    /// Safe to call from a plugin setup; hooks added there are part of the
    /// runner map built by that same `init`.
    pub fn register_hook(&self, hooks: HookDeclarations) {
        self.registry.register_hook(hooks);
    }

    /// Initializes with the default container. See [`Manager::init_with`].
    pub fn init(&self) -> PluginResult<RunnerMap> {
        self.init_with(InitOptions::default())
    }

    /// Orders and validates the plugins, runs their setups and builds runners.
    ///
    /// Setups run in resolved order with the target container current. The
    /// first failing setup aborts initialization with its error unchanged.
    pub fn init_with(&self, options: InitOptions) -> PluginResult<RunnerMap> {
        let container = options.resolve(self.registry.container());
        let plugins = self.registry.resolve()?;

        info!(
            plugins = plugins.len(),
            container = %container.id(),
            "Initializing plugins"
        );

        let mut impls = Vec::with_capacity(plugins.len());
        for plugin in &plugins {
            debug!(plugin = %plugin.name(), "Running plugin setup");
            let hooks = run_with_container(&container, || (plugin.setup())())?;
            impls.push((plugin.name().to_string(), hooks));
        }

        self.registry.finish(&impls, &container)
    }

    /// Calls `callback` with the default container current.
    pub fn run<R>(&self, callback: impl FnOnce() -> R) -> R {
        self.run_with(callback, InitOptions::default())
    }

    /// Calls `callback` with the chosen container current.
    pub fn run_with<R>(&self, callback: impl FnOnce() -> R, options: InitOptions) -> R {
        let container = options.resolve(self.registry.container());
        run_with_container(&container, callback)
    }

    /// Drives `future` with the default container current.
    pub async fn run_async<F: Future>(&self, future: F) -> F::Output {
        self.run_async_with(future, InitOptions::default()).await
    }

    /// Drives `future` with the chosen container current.
    pub async fn run_async_with<F: Future>(&self, future: F, options: InitOptions) -> F::Output {
        let container = options.resolve(self.registry.container());
        run_with_container_async(&container, future).await
    }

    /// Removes every registered plugin. Hooks and built runners are kept.
    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Returns the runner map of the current container, falling back to the
    /// one this manager built most recently.
    pub fn use_runner(&self) -> Option<RunnerMap> {
        current_container()
            .and_then(|container| RunnerMap::attached(&container))
            .or_else(|| self.registry.latest())
    }

    /// Returns the registered plugin names in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.registry.plugin_names()
    }

    /// Returns a snapshot of the declared hooks.
    pub fn hooks(&self) -> HookDeclarations {
        self.registry.hooks()
    }

    /// Returns the default container.
    pub fn container(&self) -> &Container {
        self.registry.container()
    }
}

impl Clone for Manager {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.fork(),
        }
    }
}
