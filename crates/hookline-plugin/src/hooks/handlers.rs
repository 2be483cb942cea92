//! Per-plugin hook implementations.
//!
//! A plugin's setup returns a [`HookImpls`] map: hook name to one
//! [`Handler`]. The handler's shape must fit the declared hook kind:
//!
//! | Shape | Hook kinds |
//! |---|---|
//! | brook | waterfall, async waterfall |
//! | async brook | async waterfall |
//! | worker | workflow, async workflow, parallel workflow |
//! | async worker | async workflow, parallel workflow |
//! | middleware | pipeline |
//! | async middleware | async pipeline |

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde_json::Value;

use super::pipeline::{AsyncNext, Next};

/// Waterfall step: value in, value out.
pub type Brook = Arc<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync>;

/// Waterfall step that may suspend.
pub type AsyncBrook = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Workflow step; `None` passes control to the next worker.
pub type Worker = Arc<dyn Fn(Value) -> anyhow::Result<Option<Value>> + Send + Sync>;

/// Workflow step that may suspend.
pub type AsyncWorker =
    Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Option<Value>>> + Send + Sync>;

/// Pipeline middleware.
pub type Middleware = Arc<dyn Fn(Value, Next) -> anyhow::Result<Value> + Send + Sync>;

/// Pipeline middleware that may suspend before or after calling `next`.
pub type AsyncMiddleware =
    Arc<dyn Fn(Value, AsyncNext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// One plugin's implementation of one hook.
#[derive(Clone)]
pub enum Handler {
    /// Synchronous waterfall step.
    Brook(Brook),
    /// Asynchronous waterfall step.
    AsyncBrook(AsyncBrook),
    /// Synchronous workflow step.
    Worker(Worker),
    /// Asynchronous workflow step.
    AsyncWorker(AsyncWorker),
    /// Synchronous middleware.
    Middleware(Middleware),
    /// Asynchronous middleware.
    AsyncMiddleware(AsyncMiddleware),
}

impl Handler {
    /// Returns a human-readable name of this handler's shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Brook(_) => "brook",
            Self::AsyncBrook(_) => "async brook",
            Self::Worker(_) => "worker",
            Self::AsyncWorker(_) => "async worker",
            Self::Middleware(_) => "middleware",
            Self::AsyncMiddleware(_) => "async middleware",
        }
    }

    pub(crate) fn into_brook(self) -> Result<Brook, Handler> {
        match self {
            Self::Brook(brook) => Ok(brook),
            other => Err(other),
        }
    }

    pub(crate) fn into_async_brook(self) -> Result<AsyncBrook, Handler> {
        match self {
            Self::AsyncBrook(brook) => Ok(brook),
            Self::Brook(brook) => Ok(Arc::new(move |input: Value| {
                future::ready(brook(input)).boxed()
            })),
            other => Err(other),
        }
    }

    pub(crate) fn into_worker(self) -> Result<Worker, Handler> {
        match self {
            Self::Worker(worker) => Ok(worker),
            other => Err(other),
        }
    }

    pub(crate) fn into_async_worker(self) -> Result<AsyncWorker, Handler> {
        match self {
            Self::AsyncWorker(worker) => Ok(worker),
            Self::Worker(worker) => Ok(Arc::new(move |input: Value| {
                future::ready(worker(input)).boxed()
            })),
            other => Err(other),
        }
    }

    pub(crate) fn into_middleware(self) -> Result<Middleware, Handler> {
        match self {
            Self::Middleware(middleware) => Ok(middleware),
            other => Err(other),
        }
    }

    pub(crate) fn into_async_middleware(self) -> Result<AsyncMiddleware, Handler> {
        match self {
            Self::AsyncMiddleware(middleware) => Ok(middleware),
            other => Err(other),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({})", self.shape())
    }
}

/// Hook implementations contributed by one plugin, keyed by hook name.
#[derive(Clone, Default)]
pub struct HookImpls {
    handlers: HashMap<String, Handler>,
}

impl HookImpls {
    /// Creates an empty implementation map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a waterfall step.
    pub fn brook<F>(self, hook: impl Into<String>, brook: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.with(hook, Handler::Brook(Arc::new(brook)))
    }

    /// Adds an asynchronous waterfall step.
    pub fn async_brook<F, Fut>(self, hook: impl Into<String>, brook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.with(
            hook,
            Handler::AsyncBrook(Arc::new(move |input: Value| brook(input).boxed())),
        )
    }

    /// Adds a workflow step.
    pub fn worker<F>(self, hook: impl Into<String>, worker: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        self.with(hook, Handler::Worker(Arc::new(worker)))
    }

    /// Adds an asynchronous workflow step.
    pub fn async_worker<F, Fut>(self, hook: impl Into<String>, worker: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        self.with(
            hook,
            Handler::AsyncWorker(Arc::new(move |input: Value| worker(input).boxed())),
        )
    }

    /// Adds a pipeline middleware.
    pub fn middleware<F>(self, hook: impl Into<String>, middleware: F) -> Self
    where
        F: Fn(Value, Next) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.with(hook, Handler::Middleware(Arc::new(middleware)))
    }

    /// Adds an asynchronous pipeline middleware.
    pub fn async_middleware<F, Fut>(self, hook: impl Into<String>, middleware: F) -> Self
    where
        F: Fn(Value, AsyncNext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.with(
            hook,
            Handler::AsyncMiddleware(Arc::new(move |input: Value, next: AsyncNext| {
                middleware(input, next).boxed()
            })),
        )
    }

    /// Adds a prebuilt handler, replacing any previous one for `hook`.
    pub fn with(mut self, hook: impl Into<String>, handler: Handler) -> Self {
        self.insert(hook, handler);
        self
    }

    /// Inserts a handler, replacing any previous one for `hook`.
    pub fn insert(&mut self, hook: impl Into<String>, handler: Handler) {
        self.handlers.insert(hook.into(), handler);
    }

    /// Gets the handler for a hook.
    pub fn get(&self, hook: &str) -> Option<&Handler> {
        self.handlers.get(hook)
    }

    /// Iterates the implemented hook names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Returns the number of implemented hooks.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether no hooks are implemented.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HookImpls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("HookImpls").field("hooks", &names).finish()
    }
}
