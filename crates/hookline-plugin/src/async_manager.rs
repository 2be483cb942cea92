//! Asynchronous plugin manager.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::try_join_all;
use tracing::{debug, info};

use hookline_core::{PluginOptions, PluginResult};

use crate::context::{Container, current_container, run_with_container, run_with_container_async};
use crate::hooks::definitions::HookDeclarations;
use crate::hooks::handlers::HookImpls;
use crate::hooks::runner::RunnerMap;
use crate::manager::InitOptions;
use crate::plugin::{AsyncPlugin, AsyncSetup};
use crate::registry::PluginRegistry;

/// Creates an async manager declaring `hooks`.
pub fn create_async_manager(hooks: HookDeclarations) -> AsyncManager {
    AsyncManager::new(hooks)
}

/// Manager whose plugin setups may suspend.
///
/// Setups are started in resolved order and awaited concurrently; the runner
/// map lists implementations in resolved order regardless of which setup
/// finished first.
#[derive(Debug)]
pub struct AsyncManager {
    registry: PluginRegistry<AsyncSetup>,
}

impl AsyncManager {
    /// Creates a manager declaring `hooks`.
    pub fn new(hooks: HookDeclarations) -> Self {
        Self {
            registry: PluginRegistry::new(hooks),
        }
    }

    /// Creates a plugin bound to this manager family.
    pub fn create_plugin<F, Fut>(&self, setup: F, options: PluginOptions) -> AsyncPlugin
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HookImpls>> + Send + 'static,
    {
        let setup: AsyncSetup = Arc::new(move || setup().boxed());
        self.registry.create_plugin(setup, options)
    }

    /// Returns whether `plugin` was created by this manager family.
    pub fn is_plugin(&self, plugin: &AsyncPlugin) -> bool {
        self.registry.is_plugin(plugin)
    }

    /// Registers plugins in order, skipping foreign and duplicate ones.
    pub fn use_plugin<I>(&self, plugins: I) -> &Self
    where
        I: IntoIterator<Item = AsyncPlugin>,
    {
        self.registry.use_plugins(plugins);
        self
    }

    /// Adds hook declarations. Names already declared keep their hook.
    pub fn register_hook(&self, hooks: HookDeclarations) {
        self.registry.register_hook(hooks);
    }

    /// Initializes with the default container.
    pub async fn init(&self) -> PluginResult<RunnerMap> {
        self.init_with(InitOptions::default()).await
    }

    /// Orders and validates the plugins, runs their setups and builds runners.
    ///
    /// Every setup observes the target container, including after its own
    /// awaits. The first setup to fail aborts initialization with its error
    /// unchanged.
    pub async fn init_with(&self, options: InitOptions) -> PluginResult<RunnerMap> {
        let container = options.resolve(self.registry.container());
        let plugins = self.registry.resolve()?;

        info!(
            plugins = plugins.len(),
            container = %container.id(),
            "Initializing plugins"
        );

        let pending = plugins.iter().map(|plugin| {
            let setup = Arc::clone(plugin.setup());
            let name = plugin.name().to_string();
            run_with_container_async(&container, async move {
                debug!(plugin = %name, "Running plugin setup");
                let hooks = setup().await?;
                Ok::<_, anyhow::Error>((name, hooks))
            })
        });
        let impls = try_join_all(pending).await?;

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

impl Clone for AsyncManager {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.fork(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::context::Context;
    use crate::hooks::definitions::Hook;

    #[tokio::test]
    async fn test_slow_setup_keeps_resolved_position() {
        let manager = create_async_manager(
            HookDeclarations::new().with("collect", Hook::async_waterfall()),
        );

        let slow = manager.create_plugin(
            || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, anyhow::Error>(HookImpls::new().brook("collect", |value: Value| {
                    Ok(json!(format!("{}slow,", value.as_str().unwrap_or_default())))
                }))
            },
            PluginOptions::named("slow"),
        );
        let fast = manager.create_plugin(
            || async {
                Ok::<_, anyhow::Error>(HookImpls::new().brook("collect", |value: Value| {
                    Ok(json!(format!("{}fast,", value.as_str().unwrap_or_default())))
                }))
            },
            PluginOptions::named("fast"),
        );

        let runners = manager.use_plugin([slow, fast]).init().await.unwrap();
        let result = runners
            .async_waterfall("collect")
            .unwrap()
            .run(json!(""))
            .await
            .unwrap();
        assert_eq!(result, json!("slow,fast,"));
    }

    #[tokio::test]
    async fn test_setup_sees_container_after_await() {
        let stage = Context::new(0u32);
        let manager = create_async_manager(HookDeclarations::new());
        let container = Container::new();
        stage.set_in(&container, 7);

        let seen = Context::new(0u32);
        let (stage_in_setup, seen_in_setup) = (stage.clone(), seen.clone());
        let plugin = manager.create_plugin(
            move || {
                let (stage, seen) = (stage_in_setup.clone(), seen_in_setup.clone());
                async move {
                    tokio::task::yield_now().await;
                    seen.set(stage.get())?;
                    Ok::<_, anyhow::Error>(HookImpls::new())
                }
            },
            PluginOptions::named("observer"),
        );

        manager
            .use_plugin([plugin])
            .init_with(InitOptions::with_container(container.clone()))
            .await
            .unwrap();

        assert_eq!(seen.get_in(&container), 7);
    }

    #[tokio::test]
    async fn test_run_async_scopes_default_container() {
        let manager = create_async_manager(HookDeclarations::new());
        let flag = Context::new(false);

        manager
            .run_async(async {
                tokio::task::yield_now().await;
                flag.set(true)
            })
            .await
            .unwrap();

        assert!(flag.get_in(manager.container()));
    }
}
