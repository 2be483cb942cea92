//! Plugin option type shared by configuration files and plugin managers.

use serde::{Deserialize, Serialize};

/// Options accepted when creating a plugin.
///
/// Every field is optional; omitted constraint lists are empty and an
/// omitted name is replaced by the manager with `No.<n> plugin`.
///
/// - `pre`: plugins that run before this one.
/// - `post`: plugins that run after this one.
/// - `rivals`: plugins that may not be registered alongside this one.
/// - `required`: plugins that must be registered whenever this one is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    /// Unique plugin name within a manager.
    pub name: Option<String>,
    /// Names of plugins ordered before this one.
    pub pre: Vec<String>,
    /// Names of plugins ordered after this one.
    pub post: Vec<String>,
    /// Names of plugins that conflict with this one.
    pub rivals: Vec<String>,
    /// Names of plugins this one depends on.
    pub required: Vec<String>,
}

impl PluginOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the plugins that run before this one.
    pub fn pre<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the plugins that run after this one.
    pub fn post<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the conflicting plugins.
    pub fn rivals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rivals = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the required plugins.
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = names.into_iter().map(Into::into).collect();
        self
    }
}
