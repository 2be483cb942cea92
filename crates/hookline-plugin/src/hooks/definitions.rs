//! Hook kinds and hook declarations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal value producer for a pipeline whose middlewares all called `next`.
pub type OnLast = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Enumeration of hook composition strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Synchronous reduction of a seed through every handler.
    Waterfall,
    /// Reduction where each handler may suspend.
    AsyncWaterfall,
    /// First handler returning a value wins.
    Workflow,
    /// First handler returning a value wins; handlers awaited one at a time.
    AsyncWorkflow,
    /// All handlers run concurrently; results collected in handler order.
    ParallelWorkflow,
    /// Middleware chain, outermost handler first.
    Pipeline,
    /// Middleware chain whose middlewares may suspend.
    AsyncPipeline,
}

impl HookKind {
    /// Returns the string name of this hook kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waterfall => "waterfall",
            Self::AsyncWaterfall => "async_waterfall",
            Self::Workflow => "workflow",
            Self::AsyncWorkflow => "async_workflow",
            Self::ParallelWorkflow => "parallel_workflow",
            Self::Pipeline => "pipeline",
            Self::AsyncPipeline => "async_pipeline",
        }
    }

    /// Returns whether runners of this kind must be awaited.
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            Self::AsyncWaterfall | Self::AsyncWorkflow | Self::ParallelWorkflow | Self::AsyncPipeline
        )
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared hook: its kind plus kind-specific configuration.
#[derive(Clone)]
pub enum Hook {
    /// See [`HookKind::Waterfall`].
    Waterfall,
    /// See [`HookKind::AsyncWaterfall`].
    AsyncWaterfall,
    /// See [`HookKind::Workflow`].
    Workflow,
    /// See [`HookKind::AsyncWorkflow`].
    AsyncWorkflow,
    /// See [`HookKind::ParallelWorkflow`].
    ParallelWorkflow,
    /// See [`HookKind::Pipeline`].
    Pipeline {
        /// Value produced when the chain runs out.
        on_last: Option<OnLast>,
    },
    /// See [`HookKind::AsyncPipeline`].
    AsyncPipeline {
        /// Value produced when the chain runs out.
        on_last: Option<OnLast>,
    },
}

impl Hook {
    /// Declares a waterfall hook.
    pub fn waterfall() -> Self {
        Self::Waterfall
    }

    /// Declares an async waterfall hook.
    pub fn async_waterfall() -> Self {
        Self::AsyncWaterfall
    }

    /// Declares a workflow hook.
    pub fn workflow() -> Self {
        Self::Workflow
    }

    /// Declares an async workflow hook.
    pub fn async_workflow() -> Self {
        Self::AsyncWorkflow
    }

    /// Declares a parallel workflow hook.
    pub fn parallel_workflow() -> Self {
        Self::ParallelWorkflow
    }

    /// Declares a pipeline that fails when every middleware calls `next`.
    pub fn pipeline() -> Self {
        Self::Pipeline { on_last: None }
    }

    /// Declares a pipeline whose exhausted chain yields `on_last(input)`.
    pub fn pipeline_with_last<F>(on_last: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::Pipeline {
            on_last: Some(Arc::new(on_last)),
        }
    }

    /// Declares an async pipeline that fails when every middleware calls `next`.
    pub fn async_pipeline() -> Self {
        Self::AsyncPipeline { on_last: None }
    }

    /// Declares an async pipeline whose exhausted chain yields `on_last(input)`.
    pub fn async_pipeline_with_last<F>(on_last: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::AsyncPipeline {
            on_last: Some(Arc::new(on_last)),
        }
    }

    /// Returns the kind tag of this declaration.
    pub fn kind(&self) -> HookKind {
        match self {
            Self::Waterfall => HookKind::Waterfall,
            Self::AsyncWaterfall => HookKind::AsyncWaterfall,
            Self::Workflow => HookKind::Workflow,
            Self::AsyncWorkflow => HookKind::AsyncWorkflow,
            Self::ParallelWorkflow => HookKind::ParallelWorkflow,
            Self::Pipeline { .. } => HookKind::Pipeline,
            Self::AsyncPipeline { .. } => HookKind::AsyncPipeline,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline { on_last } | Self::AsyncPipeline { on_last } => f
                .debug_struct(self.kind().as_str())
                .field("on_last", &on_last.is_some())
                .finish(),
            _ => f.write_str(self.kind().as_str()),
        }
    }
}

/// Mapping from hook name to its declaration.
#[derive(Clone, Default)]
pub struct HookDeclarations {
    hooks: BTreeMap<String, Hook>,
}

impl HookDeclarations {
    /// Creates an empty declaration map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration, replacing any previous one of the same name.
    pub fn with(mut self, name: impl Into<String>, hook: Hook) -> Self {
        self.hooks.insert(name.into(), hook);
        self
    }

    /// Merges `extra` into this map. Existing declarations win.
    pub fn register(&mut self, extra: HookDeclarations) {
        for (name, hook) in extra.hooks {
            self.hooks.entry(name).or_insert(hook);
        }
    }

    /// Gets a declaration by hook name.
    pub fn get(&self, name: &str) -> Option<&Hook> {
        self.hooks.get(name)
    }

    /// Returns whether a hook of this name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Iterates declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Hook)> {
        self.hooks.iter().map(|(name, hook)| (name.as_str(), hook))
    }

    /// Returns all declared hook names.
    pub fn names(&self) -> Vec<String> {
        self.hooks.keys().cloned().collect()
    }

    /// Returns the number of declared hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns whether no hooks are declared.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Hook)> for HookDeclarations {
    fn from_iter<I: IntoIterator<Item = (S, Hook)>>(iter: I) -> Self {
        Self {
            hooks: iter
                .into_iter()
                .map(|(name, hook)| (name.into(), hook))
                .collect(),
        }
    }
}

impl fmt::Debug for HookDeclarations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.hooks.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_existing_declaration() {
        let mut hooks = HookDeclarations::new().with("build", Hook::waterfall());
        hooks.register(
            HookDeclarations::new()
                .with("build", Hook::async_workflow())
                .with("deploy", Hook::async_workflow()),
        );

        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks.get("build").map(Hook::kind), Some(HookKind::Waterfall));
        assert_eq!(hooks.get("deploy").map(Hook::kind), Some(HookKind::AsyncWorkflow));
    }

    #[test]
    fn test_kind_flags() {
        assert!(!HookKind::Waterfall.is_async());
        assert!(HookKind::ParallelWorkflow.is_async());
        assert_eq!(Hook::async_pipeline().kind().to_string(), "async_pipeline");
    }

    #[test]
    fn test_from_iterator() {
        let hooks: HookDeclarations = [("a", Hook::workflow()), ("b", Hook::pipeline())]
            .into_iter()
            .collect();
        assert_eq!(hooks.names(), vec!["a", "b"]);
    }
}
