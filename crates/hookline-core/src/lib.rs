//! # hookline-core
//!
//! Core crate for Hookline. Contains the error taxonomy shared by every
//! crate, the configuration schema, and the plugin option type that both
//! configuration files and the plugin managers speak.
//!
//! This crate has **no** internal dependencies on other Hookline crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{ErrorKind, PluginError};
pub use result::PluginResult;
pub use types::PluginOptions;
