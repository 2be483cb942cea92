//! Plugin registry shared by the sync and async managers.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};
use uuid::Uuid;

use hookline_core::{PluginOptions, PluginResult};

use crate::context::Container;
use crate::hooks::definitions::HookDeclarations;
use crate::hooks::dispatcher::generate_runner;
use crate::hooks::handlers::HookImpls;
use crate::hooks::runner::RunnerMap;
use crate::ordering::{check_plugins, sort_plugins};
use crate::plugin::Plugin;

/// Registered plugins and declared hooks of one manager.
///
/// `S` is the setup type, which differs between the sync and async managers.
pub struct PluginRegistry<S> {
    /// Tag stamped on every plugin this registry family creates.
    family: Uuid,
    /// Shared with forks so generated names stay unique.
    counter: Arc<AtomicUsize>,
    hooks: RwLock<HookDeclarations>,
    plugins: RwLock<Vec<Plugin<S>>>,
    container: Container,
    latest: RwLock<Option<RunnerMap>>,
}

impl<S: Clone> PluginRegistry<S> {
    /// Creates an empty registry declaring `hooks`.
    pub fn new(hooks: HookDeclarations) -> Self {
        Self {
            family: Uuid::new_v4(),
            counter: Arc::new(AtomicUsize::new(0)),
            hooks: RwLock::new(hooks),
            plugins: RwLock::new(Vec::new()),
            container: Container::new(),
            latest: RwLock::new(None),
        }
    }

    /// Creates a plugin tagged with this registry's family.
    ///
    /// Unnamed plugins are called `No.<n> plugin`, where `n` counts every
    /// plugin created by the family so far.
    pub fn create_plugin(&self, setup: S, options: PluginOptions) -> Plugin<S> {
        let index = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("No.{index} plugin"));

        debug!(plugin = %name, "Plugin created");
        Plugin::new(self.family, name, options, setup)
    }

    /// Returns whether `plugin` was created by this registry's family.
    pub fn is_plugin(&self, plugin: &Plugin<S>) -> bool {
        plugin.family() == self.family
    }

    /// Appends plugins in order.
    ///
    /// Foreign plugins are logged and ignored. A plugin whose name is already
    /// registered is skipped.
    pub fn use_plugins<I>(&self, plugins: I)
    where
        I: IntoIterator<Item = Plugin<S>>,
    {
        let mut registered = self.plugins.write().unwrap_or_else(|e| e.into_inner());

        for plugin in plugins {
            if !self.is_plugin(&plugin) {
                warn!(plugin = %plugin.name(), "Ignoring plugin created by another manager");
                continue;
            }

            if registered.iter().any(|p| p.name() == plugin.name()) {
                debug!(plugin = %plugin.name(), "Plugin already registered");
                continue;
            }

            debug!(plugin = %plugin.name(), position = registered.len(), "Plugin registered");
            registered.push(plugin);
        }
    }

    /// Merges additional hook declarations; existing names win.
    pub fn register_hook(&self, extra: HookDeclarations) {
        let mut hooks = self.hooks.write().unwrap_or_else(|e| e.into_inner());
        let before = hooks.len();
        hooks.register(extra);
        debug!(added = hooks.len() - before, total = hooks.len(), "Hooks registered");
    }

    /// Removes every registered plugin.
    pub fn clear(&self) {
        let mut plugins = self.plugins.write().unwrap_or_else(|e| e.into_inner());
        debug!(removed = plugins.len(), "Plugins cleared");
        plugins.clear();
    }

    /// Creates an independent registry of the same family.
    ///
    /// The fork starts from the current hook declarations, with no plugins
    /// and a fresh default container.
    pub fn fork(&self) -> Self {
        Self {
            family: self.family,
            counter: Arc::clone(&self.counter),
            hooks: RwLock::new(self.hooks()),
            plugins: RwLock::new(Vec::new()),
            container: Container::new(),
            latest: RwLock::new(None),
        }
    }

    /// Returns a snapshot of the registered plugins in registration order.
    pub fn plugins(&self) -> Vec<Plugin<S>> {
        self.plugins.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the registered plugin names in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Returns a snapshot of the declared hooks.
    pub fn hooks(&self) -> HookDeclarations {
        self.hooks.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the container used when `init` is given none.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Returns the runner map most recently built by this registry.
    pub fn latest(&self) -> Option<RunnerMap> {
        self.latest.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Orders the registered plugins and validates their constraints.
    pub(crate) fn resolve(&self) -> PluginResult<Vec<Plugin<S>>> {
        let sorted = sort_plugins(&self.plugins());
        check_plugins(&sorted)?;
        Ok(sorted)
    }

    /// Builds runners from the hooks declared now, after every setup ran.
    pub(crate) fn finish(
        &self,
        impls: &[(String, HookImpls)],
        container: &Container,
    ) -> PluginResult<RunnerMap> {
        let runners = generate_runner(&self.hooks(), impls, container)?;
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(runners.clone());
        Ok(runners)
    }
}

impl<S> fmt::Debug for PluginRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins = self.plugins.read().unwrap_or_else(|e| e.into_inner());
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("PluginRegistry")
            .field("family", &self.family)
            .field("plugins", &*plugins)
            .field("hooks", &*hooks)
            .field("container", &self.container)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::definitions::Hook;

    fn registry() -> PluginRegistry<()> {
        PluginRegistry::new(HookDeclarations::new().with("build", Hook::waterfall()))
    }

    #[test]
    fn test_generated_names_count_every_plugin() {
        let registry = registry();
        let first = registry.create_plugin((), PluginOptions::new());
        let named = registry.create_plugin((), PluginOptions::named("env"));
        let third = registry.create_plugin((), PluginOptions::new());

        assert_eq!(first.name(), "No.0 plugin");
        assert_eq!(named.name(), "env");
        assert_eq!(third.name(), "No.2 plugin");
    }

    #[test]
    fn test_foreign_plugins_are_ignored() {
        let ours = registry();
        let theirs = registry();

        let plugin = theirs.create_plugin((), PluginOptions::named("env"));
        assert!(!ours.is_plugin(&plugin));

        ours.use_plugins([plugin]);
        assert!(ours.plugin_names().is_empty());
    }

    #[test]
    fn test_duplicate_names_are_skipped() {
        let registry = registry();
        let a = registry.create_plugin((), PluginOptions::named("a"));
        let b = registry.create_plugin((), PluginOptions::named("b"));
        let a_again = registry.create_plugin((), PluginOptions::named("a").pre(["b"]));

        registry.use_plugins([a.clone(), b]);
        registry.use_plugins([a_again, a]);

        assert_eq!(registry.plugin_names(), vec!["a", "b"]);
        assert!(registry.plugins()[0].pre().is_empty());
    }

    #[test]
    fn test_fork_shares_family_and_counter() {
        let registry = registry();
        registry.create_plugin((), PluginOptions::new());
        registry.use_plugins([registry.create_plugin((), PluginOptions::named("env"))]);

        let fork = registry.fork();
        let plugin = fork.create_plugin((), PluginOptions::new());

        assert_eq!(plugin.name(), "No.2 plugin");
        assert!(registry.is_plugin(&plugin));
        assert!(fork.plugin_names().is_empty());
        assert!(fork.hooks().contains("build"));
        assert!(!fork.container().same(registry.container()));
    }

    #[test]
    fn test_clear_keeps_hooks() {
        let registry = registry();
        registry.use_plugins([registry.create_plugin((), PluginOptions::named("env"))]);
        registry.clear();

        assert!(registry.plugin_names().is_empty());
        assert!(registry.hooks().contains("build"));
    }
}
