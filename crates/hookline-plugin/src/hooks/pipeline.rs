//! Continuation handles passed to pipeline middlewares.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use serde_json::Value;

use hookline_core::PluginError;

use super::definitions::OnLast;
use super::handlers::{AsyncMiddleware, Middleware};

/// The remainder of a synchronous middleware chain.
///
/// Calling [`Next::run`] invokes the next middleware, or the pipeline's
/// terminal value once the chain is exhausted. A middleware that returns
/// without calling `run` terminates the chain.
#[derive(Clone)]
pub struct Next {
    hook: Arc<str>,
    chain: Arc<[Middleware]>,
    index: usize,
    on_last: Option<OnLast>,
}

impl Next {
    pub(crate) fn start(hook: Arc<str>, chain: Arc<[Middleware]>, on_last: Option<OnLast>) -> Self {
        Self {
            hook,
            chain,
            index: 0,
            on_last,
        }
    }

    /// Runs the rest of the chain with `input`.
    pub fn run(self, input: Value) -> anyhow::Result<Value> {
        match self.chain.get(self.index).cloned() {
            Some(middleware) => {
                let rest = Self {
                    index: self.index + 1,
                    ..self
                };
                middleware(input, rest)
            }
            None => terminate(&self.hook, self.on_last.as_ref(), input),
        }
    }

    /// Returns how many middlewares remain after this point.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("hook", &self.hook)
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

/// The remainder of an asynchronous middleware chain.
#[derive(Clone)]
pub struct AsyncNext {
    hook: Arc<str>,
    chain: Arc<[AsyncMiddleware]>,
    index: usize,
    on_last: Option<OnLast>,
}

impl AsyncNext {
    pub(crate) fn start(
        hook: Arc<str>,
        chain: Arc<[AsyncMiddleware]>,
        on_last: Option<OnLast>,
    ) -> Self {
        Self {
            hook,
            chain,
            index: 0,
            on_last,
        }
    }

    /// Runs the rest of the chain with `input`.
    pub fn run(self, input: Value) -> BoxFuture<'static, anyhow::Result<Value>> {
        match self.chain.get(self.index).cloned() {
            Some(middleware) => {
                let rest = Self {
                    index: self.index + 1,
                    ..self
                };
                middleware(input, rest)
            }
            None => Box::pin(future::ready(terminate(
                &self.hook,
                self.on_last.as_ref(),
                input,
            ))),
        }
    }

    /// Returns how many middlewares remain after this point.
    pub fn remaining(&self) -> usize {
        self.chain.len().saturating_sub(self.index)
    }
}

impl fmt::Debug for AsyncNext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncNext")
            .field("hook", &self.hook)
            .field("index", &self.index)
            .field("len", &self.chain.len())
            .finish()
    }
}

fn terminate(hook: &str, on_last: Option<&OnLast>, input: Value) -> anyhow::Result<Value> {
    match on_last {
        Some(on_last) => Ok(on_last(input)),
        None => Err(PluginError::PipelineExhausted(hook.to_string()).into()),
    }
}
