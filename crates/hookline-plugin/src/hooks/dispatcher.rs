//! Hook composition: turns per-plugin implementations into runners.
//!
//! For each declared hook, the handlers contributed by the plugins are
//! taken in resolved plugin order and composed according to the hook's
//! kind. Plugins that did not implement a hook are skipped. Implementations
//! of hooks nobody declared are ignored.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use hookline_core::{PluginError, PluginResult};

use crate::context::Container;

use super::definitions::{Hook, HookDeclarations, HookKind};
use super::handlers::{Handler, HookImpls};
use super::runner::{
    AsyncPipelineRunner, AsyncWaterfallRunner, AsyncWorkflowRunner, ParallelWorkflowRunner,
    PipelineRunner, Runner, RunnerMap, WaterfallRunner, WorkflowRunner,
};

/// A hook handler tagged with the plugin that supplied it.
pub type PluginHandler = (String, Handler);

/// Composes one hook's handlers into a runner of the declared kind.
pub fn compose(
    name: &str,
    hook: &Hook,
    handlers: Vec<PluginHandler>,
    container: &Container,
) -> PluginResult<Runner> {
    let hook_name: Arc<str> = Arc::from(name);
    let kind = hook.kind();
    let container = container.clone();

    let runner = match hook {
        Hook::Waterfall => Runner::Waterfall(WaterfallRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_brook)?,
            container,
        )),
        Hook::AsyncWaterfall => Runner::AsyncWaterfall(AsyncWaterfallRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_async_brook)?,
            container,
        )),
        Hook::Workflow => Runner::Workflow(WorkflowRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_worker)?,
            container,
        )),
        Hook::AsyncWorkflow => Runner::AsyncWorkflow(AsyncWorkflowRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_async_worker)?,
            container,
        )),
        Hook::ParallelWorkflow => Runner::ParallelWorkflow(ParallelWorkflowRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_async_worker)?,
            container,
        )),
        Hook::Pipeline { on_last } => Runner::Pipeline(PipelineRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_middleware)?,
            on_last.clone(),
            container,
        )),
        Hook::AsyncPipeline { on_last } => Runner::AsyncPipeline(AsyncPipelineRunner::new(
            hook_name,
            collect(name, kind, handlers, Handler::into_async_middleware)?,
            on_last.clone(),
            container,
        )),
    };

    Ok(runner)
}

fn collect<T>(
    hook: &str,
    kind: HookKind,
    handlers: Vec<PluginHandler>,
    convert: fn(Handler) -> Result<T, Handler>,
) -> PluginResult<Arc<[T]>> {
    handlers
        .into_iter()
        .map(|(plugin, handler)| {
            convert(handler).map_err(|rejected| PluginError::HookKindMismatch {
                hook: hook.to_string(),
                declared: kind.to_string(),
                plugin,
                provided: rejected.shape().to_string(),
            })
        })
        .collect::<PluginResult<Vec<T>>>()
        .map(Arc::from)
}

/// Builds the runner map for every declared hook and attaches it to `container`.
///
/// `impls` holds each plugin's name and implementations in resolved order.
pub fn generate_runner(
    hooks: &HookDeclarations,
    impls: &[(String, HookImpls)],
    container: &Container,
) -> PluginResult<RunnerMap> {
    let mut runners = BTreeMap::new();

    for (name, hook) in hooks.iter() {
        let handlers: Vec<PluginHandler> = impls
            .iter()
            .filter_map(|(plugin, map)| map.get(name).map(|h| (plugin.clone(), h.clone())))
            .collect();

        debug!(hook = %name, kind = %hook.kind(), handlers = handlers.len(), "Composing hook");
        runners.insert(name.to_string(), compose(name, hook, handlers, container)?);
    }

    for (plugin, map) in impls {
        for name in map.names().filter(|name| !hooks.contains(name)) {
            debug!(plugin = %plugin, hook = %name, "Ignoring implementation of undeclared hook");
        }
    }

    let runners = RunnerMap::new(runners);
    runners.attach(container);

    info!(
        hooks = runners.len(),
        plugins = impls.len(),
        container = %container.id(),
        "Runners generated"
    );

    Ok(runners)
}
