//! Runners: the single callable produced for each declared hook.
//!
//! Every runner executes inside the container it was bound to at `init`.
//! `run_in` overrides the container for one call, so callers sharing one
//! runner map can keep their ambient state apart.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use futures::future;
use serde_json::Value;
use tracing::debug;

use hookline_core::{PluginError, PluginResult};

use crate::context::{Container, current_container, run_with_container, run_with_container_async};

use super::definitions::{HookKind, OnLast};
use super::handlers::{AsyncBrook, AsyncMiddleware, AsyncWorker, Brook, Middleware, Worker};
use super::pipeline::{AsyncNext, Next};

/// Runs a seed through every brook in order.
#[derive(Clone)]
pub struct WaterfallRunner {
    hook: Arc<str>,
    brooks: Arc<[Brook]>,
    container: Container,
}

impl WaterfallRunner {
    pub(crate) fn new(hook: Arc<str>, brooks: Arc<[Brook]>, container: Container) -> Self {
        Self {
            hook,
            brooks,
            container,
        }
    }

    /// Reduces `seed` through every brook in the bound container.
    pub fn run(&self, seed: Value) -> anyhow::Result<Value> {
        self.run_in(&self.container, seed)
    }

    /// Reduces `seed` through every brook in `container`.
    pub fn run_in(&self, container: &Container, seed: Value) -> anyhow::Result<Value> {
        debug!(hook = %self.hook, handlers = self.brooks.len(), "Running waterfall");
        run_with_container(container, || {
            self.brooks.iter().try_fold(seed, |acc, brook| brook(acc))
        })
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.brooks.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.brooks.is_empty()
    }
}

/// Runs a seed through every brook in order, awaiting each step.
#[derive(Clone)]
pub struct AsyncWaterfallRunner {
    hook: Arc<str>,
    brooks: Arc<[AsyncBrook]>,
    container: Container,
}

impl AsyncWaterfallRunner {
    pub(crate) fn new(hook: Arc<str>, brooks: Arc<[AsyncBrook]>, container: Container) -> Self {
        Self {
            hook,
            brooks,
            container,
        }
    }

    /// Reduces `seed` through every brook in the bound container.
    pub async fn run(&self, seed: Value) -> anyhow::Result<Value> {
        self.run_in(&self.container, seed).await
    }

    /// Reduces `seed` through every brook in `container`.
    pub async fn run_in(&self, container: &Container, seed: Value) -> anyhow::Result<Value> {
        debug!(hook = %self.hook, handlers = self.brooks.len(), "Running async waterfall");
        let brooks = Arc::clone(&self.brooks);
        run_with_container_async(container, async move {
            let mut acc = seed;
            for brook in brooks.iter() {
                acc = brook(acc).await?;
            }
            Ok::<_, anyhow::Error>(acc)
        })
        .await
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.brooks.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.brooks.is_empty()
    }
}

/// Returns the first value produced by a worker, trying them in order.
#[derive(Clone)]
pub struct WorkflowRunner {
    hook: Arc<str>,
    workers: Arc<[Worker]>,
    container: Container,
}

impl WorkflowRunner {
    pub(crate) fn new(hook: Arc<str>, workers: Arc<[Worker]>, container: Container) -> Self {
        Self {
            hook,
            workers,
            container,
        }
    }

    /// Runs workers in the bound container until one yields a value.
    pub fn run(&self, input: Value) -> anyhow::Result<Option<Value>> {
        self.run_in(&self.container, input)
    }

    /// Runs workers in `container` until one yields a value.
    pub fn run_in(&self, container: &Container, input: Value) -> anyhow::Result<Option<Value>> {
        debug!(hook = %self.hook, handlers = self.workers.len(), "Running workflow");
        run_with_container(container, || {
            for worker in self.workers.iter() {
                if let Some(output) = worker(input.clone())? {
                    return Ok(Some(output));
                }
            }
            Ok(None)
        })
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Returns the first value produced by a worker, awaiting them one at a time.
#[derive(Clone)]
pub struct AsyncWorkflowRunner {
    hook: Arc<str>,
    workers: Arc<[AsyncWorker]>,
    container: Container,
}

impl AsyncWorkflowRunner {
    pub(crate) fn new(hook: Arc<str>, workers: Arc<[AsyncWorker]>, container: Container) -> Self {
        Self {
            hook,
            workers,
            container,
        }
    }

    /// Awaits workers in the bound container until one yields a value.
    pub async fn run(&self, input: Value) -> anyhow::Result<Option<Value>> {
        self.run_in(&self.container, input).await
    }

    /// Awaits workers in `container` until one yields a value.
    pub async fn run_in(
        &self,
        container: &Container,
        input: Value,
    ) -> anyhow::Result<Option<Value>> {
        debug!(hook = %self.hook, handlers = self.workers.len(), "Running async workflow");
        let workers = Arc::clone(&self.workers);
        run_with_container_async(container, async move {
            for worker in workers.iter() {
                if let Some(output) = worker(input.clone()).await? {
                    return Ok(Some(output));
                }
            }
            Ok::<_, anyhow::Error>(None)
        })
        .await
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Runs every worker concurrently and collects their values.
#[derive(Clone)]
pub struct ParallelWorkflowRunner {
    hook: Arc<str>,
    workers: Arc<[AsyncWorker]>,
    container: Container,
}

impl ParallelWorkflowRunner {
    pub(crate) fn new(hook: Arc<str>, workers: Arc<[AsyncWorker]>, container: Container) -> Self {
        Self {
            hook,
            workers,
            container,
        }
    }

    /// Runs all workers in the bound container.
    pub async fn run(&self, input: Value) -> anyhow::Result<Vec<Value>> {
        self.run_in(&self.container, input).await
    }

    /// Runs all workers in `container`.
    ///
    /// Workers are polled concurrently on the calling task. Values come back
    /// in handler order regardless of completion order. Workers yielding
    /// `None` are left out, so the result can be shorter than the handler
    /// list and is not one entry per worker. The first failure drops the
    /// remaining workers and is returned as-is.
    pub async fn run_in(&self, container: &Container, input: Value) -> anyhow::Result<Vec<Value>> {
        debug!(hook = %self.hook, handlers = self.workers.len(), "Running parallel workflow");
        let workers = Arc::clone(&self.workers);
        run_with_container_async(container, async move {
            let pending = workers.iter().map(|worker| worker(input.clone()));
            let results = future::try_join_all(pending).await?;
            Ok::<_, anyhow::Error>(results.into_iter().flatten().collect())
        })
        .await
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Middleware chain; the first resolved plugin is the outermost layer.
#[derive(Clone)]
pub struct PipelineRunner {
    hook: Arc<str>,
    chain: Arc<[Middleware]>,
    on_last: Option<OnLast>,
    container: Container,
}

impl PipelineRunner {
    pub(crate) fn new(
        hook: Arc<str>,
        chain: Arc<[Middleware]>,
        on_last: Option<OnLast>,
        container: Container,
    ) -> Self {
        Self {
            hook,
            chain,
            on_last,
            container,
        }
    }

    /// Runs the chain in the bound container.
    pub fn run(&self, input: Value) -> anyhow::Result<Value> {
        self.run_in(&self.container, input)
    }

    /// Runs the chain in `container`.
    pub fn run_in(&self, container: &Container, input: Value) -> anyhow::Result<Value> {
        debug!(hook = %self.hook, handlers = self.chain.len(), "Running pipeline");
        let next = Next::start(
            Arc::clone(&self.hook),
            Arc::clone(&self.chain),
            self.on_last.clone(),
        );
        run_with_container(container, || next.run(input))
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// Asynchronous middleware chain; the first resolved plugin is the outermost layer.
#[derive(Clone)]
pub struct AsyncPipelineRunner {
    hook: Arc<str>,
    chain: Arc<[AsyncMiddleware]>,
    on_last: Option<OnLast>,
    container: Container,
}

impl AsyncPipelineRunner {
    pub(crate) fn new(
        hook: Arc<str>,
        chain: Arc<[AsyncMiddleware]>,
        on_last: Option<OnLast>,
        container: Container,
    ) -> Self {
        Self {
            hook,
            chain,
            on_last,
            container,
        }
    }

    /// Runs the chain in the bound container.
    pub async fn run(&self, input: Value) -> anyhow::Result<Value> {
        self.run_in(&self.container, input).await
    }

    /// Runs the chain in `container`.
    pub async fn run_in(&self, container: &Container, input: Value) -> anyhow::Result<Value> {
        debug!(hook = %self.hook, handlers = self.chain.len(), "Running async pipeline");
        let next = AsyncNext::start(
            Arc::clone(&self.hook),
            Arc::clone(&self.chain),
            self.on_last.clone(),
        );
        run_with_container_async(container, async move { next.run(input).await }).await
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// A composed runner of any hook kind.
#[derive(Clone)]
pub enum Runner {
    /// Waterfall runner.
    Waterfall(WaterfallRunner),
    /// Async waterfall runner.
    AsyncWaterfall(AsyncWaterfallRunner),
    /// Workflow runner.
    Workflow(WorkflowRunner),
    /// Async workflow runner.
    AsyncWorkflow(AsyncWorkflowRunner),
    /// Parallel workflow runner.
    ParallelWorkflow(ParallelWorkflowRunner),
    /// Pipeline runner.
    Pipeline(PipelineRunner),
    /// Async pipeline runner.
    AsyncPipeline(AsyncPipelineRunner),
}

impl Runner {
    /// Returns the kind of hook this runner was composed for.
    pub fn kind(&self) -> HookKind {
        match self {
            Self::Waterfall(_) => HookKind::Waterfall,
            Self::AsyncWaterfall(_) => HookKind::AsyncWaterfall,
            Self::Workflow(_) => HookKind::Workflow,
            Self::AsyncWorkflow(_) => HookKind::AsyncWorkflow,
            Self::ParallelWorkflow(_) => HookKind::ParallelWorkflow,
            Self::Pipeline(_) => HookKind::Pipeline,
            Self::AsyncPipeline(_) => HookKind::AsyncPipeline,
        }
    }

    /// Returns the number of composed handlers.
    pub fn len(&self) -> usize {
        match self {
            Self::Waterfall(r) => r.len(),
            Self::AsyncWaterfall(r) => r.len(),
            Self::Workflow(r) => r.len(),
            Self::AsyncWorkflow(r) => r.len(),
            Self::ParallelWorkflow(r) => r.len(),
            Self::Pipeline(r) => r.len(),
            Self::AsyncPipeline(r) => r.len(),
        }
    }

    /// Returns whether no plugin implemented this hook.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("kind", &self.kind())
            .field("handlers", &self.len())
            .finish()
    }
}

/// Runners for every declared hook, produced by one `init` call.
///
/// Cloning shares the underlying runners. The map is dropped once the last
/// handle goes away, even though its runners keep their container alive.
#[derive(Clone, Default)]
pub struct RunnerMap {
    runners: Arc<BTreeMap<String, Runner>>,
}

/// Container slot pointing back at a runner map.
///
/// Runners own their container, so the container only keeps a weak link.
#[derive(Clone)]
pub(crate) struct RunnerSlot(Weak<BTreeMap<String, Runner>>);

macro_rules! runner_accessor {
    ($(#[$doc:meta])* $method:ident, $variant:ident, $runner:ty) => {
        $(#[$doc])*
        pub fn $method(&self, hook: &str) -> PluginResult<&$runner> {
            match self.lookup(hook)? {
                Runner::$variant(runner) => Ok(runner),
                other => Err(PluginError::RunnerKindMismatch {
                    hook: hook.to_string(),
                    expected: HookKind::$variant.to_string(),
                    actual: other.kind().to_string(),
                }),
            }
        }
    };
}

impl RunnerMap {
    pub(crate) fn new(runners: BTreeMap<String, Runner>) -> Self {
        Self {
            runners: Arc::new(runners),
        }
    }

    /// Gets the runner for a hook.
    pub fn get(&self, hook: &str) -> Option<&Runner> {
        self.runners.get(hook)
    }

    /// Returns whether a runner exists for a hook.
    pub fn contains(&self, hook: &str) -> bool {
        self.runners.contains_key(hook)
    }

    /// Returns all hook names with runners.
    pub fn names(&self) -> Vec<String> {
        self.runners.keys().cloned().collect()
    }

    /// Returns the number of runners.
    pub fn len(&self) -> usize {
        self.runners.len()
    }

    /// Returns whether there are no runners.
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Returns whether both handles share the same runners.
    pub fn same(&self, other: &RunnerMap) -> bool {
        Arc::ptr_eq(&self.runners, &other.runners)
    }

    /// Links `container` to this map for [`use_runner`].
    pub(crate) fn attach(&self, container: &Container) {
        container.insert(RunnerSlot(Arc::downgrade(&self.runners)));
    }

    /// Returns the map attached to `container`, if it is still alive.
    pub(crate) fn attached(container: &Container) -> Option<RunnerMap> {
        container
            .get::<RunnerSlot>()
            .and_then(|slot| slot.0.upgrade())
            .map(|runners| Self { runners })
    }

    fn lookup(&self, hook: &str) -> PluginResult<&Runner> {
        self.runners
            .get(hook)
            .ok_or_else(|| PluginError::UnknownHook(hook.to_string()))
    }

    runner_accessor!(
        /// Gets a waterfall runner.
        waterfall, Waterfall, WaterfallRunner
    );
    runner_accessor!(
        /// Gets an async waterfall runner.
        async_waterfall, AsyncWaterfall, AsyncWaterfallRunner
    );
    runner_accessor!(
        /// Gets a workflow runner.
        workflow, Workflow, WorkflowRunner
    );
    runner_accessor!(
        /// Gets an async workflow runner.
        async_workflow, AsyncWorkflow, AsyncWorkflowRunner
    );
    runner_accessor!(
        /// Gets a parallel workflow runner.
        parallel_workflow, ParallelWorkflow, ParallelWorkflowRunner
    );
    runner_accessor!(
        /// Gets a pipeline runner.
        pipeline, Pipeline, PipelineRunner
    );
    runner_accessor!(
        /// Gets an async pipeline runner.
        async_pipeline, AsyncPipeline, AsyncPipelineRunner
    );
}

impl fmt::Debug for RunnerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.runners.iter()).finish()
    }
}

/// Returns the runner map attached to the current container, if any.
///
/// Handlers use this to invoke other hooks of the manager that is running
/// them without the runner map being passed in.
pub fn use_runner() -> Option<RunnerMap> {
    current_container().and_then(|container| RunnerMap::attached(&container))
}
