//! Convenience result type alias for Hookline.

use crate::error::PluginError;

/// A specialized `Result` type for plugin orchestration operations.
pub type PluginResult<T> = Result<T, PluginError>;
