//! Hook declarations, handler shapes, composition and runners.

pub mod definitions;
pub mod dispatcher;
pub mod handlers;
pub mod pipeline;
pub mod runner;

pub use definitions::{Hook, HookDeclarations, HookKind, OnLast};
pub use dispatcher::{compose, generate_runner};
pub use handlers::{Handler, HookImpls};
pub use pipeline::{AsyncNext, Next};
pub use runner::{Runner, RunnerMap, use_runner};
