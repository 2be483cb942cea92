//! Error types for the plugin orchestration core.
//!
//! Failures raised by the core itself (ordering validation, hook shape
//! checks, runner lookups) are variants of [`PluginError`]. Failures raised
//! by plugin code travel as [`anyhow::Error`] and are never rewrapped: a
//! runner hands back the exact error its handler returned, and `init`
//! carries a failing setup's error in the transparent
//! [`PluginError::Handler`] variant.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kind categorization used for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Two registered plugins declared each other as rivals.
    Conflict,
    /// A plugin required another plugin that is not registered.
    MissingDependency,
    /// A hook implementation or runner lookup did not match the declared hook kind.
    HookShape,
    /// The ambient container was needed but none was active.
    Context,
    /// A plugin setup or hook handler failed.
    Handler,
    /// Configuration could not be loaded.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "CONFLICT"),
            Self::MissingDependency => write!(f, "MISSING_DEPENDENCY"),
            Self::HookShape => write!(f, "HOOK_SHAPE"),
            Self::Context => write!(f, "CONTEXT"),
            Self::Handler => write!(f, "HANDLER"),
            Self::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}

/// Errors produced by plugin registration, initialization, and hook execution.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A resolved plugin names another resolved plugin as its rival.
    #[error("{origin} has rival {rival}")]
    RivalConflict {
        /// Plugin declaring the rivalry.
        origin: String,
        /// Registered plugin it conflicts with.
        rival: String,
    },

    /// A resolved plugin requires a plugin that is absent.
    #[error("plugin '{required}' is required when plugin '{dependent}' is registered")]
    MissingRequired {
        /// Name of the absent plugin.
        required: String,
        /// Plugin that declared the requirement.
        dependent: String,
    },

    /// A plugin implemented a hook with a handler shape the hook kind cannot run.
    #[error("hook '{hook}' is declared as {declared} but plugin '{plugin}' provides a {provided} handler")]
    HookKindMismatch {
        /// Hook name.
        hook: String,
        /// Declared hook kind.
        declared: String,
        /// Offending plugin.
        plugin: String,
        /// Shape of the handler it supplied.
        provided: String,
    },

    /// No runner exists for the requested hook name.
    #[error("no runner registered for hook '{0}'")]
    UnknownHook(String),

    /// A runner was requested as a different kind than it was declared.
    #[error("runner '{hook}' is a {actual} runner, not {expected}")]
    RunnerKindMismatch {
        /// Hook name.
        hook: String,
        /// Kind the caller asked for.
        expected: String,
        /// Kind the hook was declared with.
        actual: String,
    },

    /// Every middleware called `next` and the pipeline has no terminal value.
    #[error("pipeline '{0}' reached the end of its chain without producing a value")]
    PipelineExhausted(String),

    /// A context write was attempted outside any container scope.
    #[error("no container is active in the current scope")]
    NoActiveContainer,

    /// A plugin setup or hook handler failed; the original error is kept as-is.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// Configuration could not be built or deserialized.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PluginError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RivalConflict { .. } => ErrorKind::Conflict,
            Self::MissingRequired { .. } => ErrorKind::MissingDependency,
            Self::HookKindMismatch { .. }
            | Self::UnknownHook(_)
            | Self::RunnerKindMismatch { .. }
            | Self::PipelineExhausted(_) => ErrorKind::HookShape,
            Self::NoActiveContainer => ErrorKind::Context,
            Self::Handler(_) => ErrorKind::Handler,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Returns the error produced by plugin code, if this is a handler failure.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for PluginError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_rival_message_names_both_plugins() {
        let err = PluginError::RivalConflict {
            origin: "less".to_string(),
            rival: "sass".to_string(),
        };
        assert_eq!(err.to_string(), "less has rival sass");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_missing_required_message() {
        let err = PluginError::MissingRequired {
            required: "env".to_string(),
            dependent: "router".to_string(),
        };
        assert!(err.to_string().contains("'env'"));
        assert!(err.to_string().contains("'router'"));
        assert_eq!(err.kind(), ErrorKind::MissingDependency);
    }

    #[test]
    fn test_handler_error_is_transparent() {
        let err = PluginError::from(anyhow::Error::new(DiskFull));
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(err.kind(), ErrorKind::Handler);
        let inner = err.handler_error().expect("handler error");
        assert_eq!(inner.downcast_ref::<DiskFull>(), Some(&DiskFull));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::MissingDependency.to_string(), "MISSING_DEPENDENCY");
        assert_eq!(ErrorKind::HookShape.to_string(), "HOOK_SHAPE");
    }
}
