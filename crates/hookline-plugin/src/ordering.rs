//! Plugin ordering and constraint validation.
//!
//! Ordering is a single forward sweep over the registration order, not a
//! topological sort. At each position `i` the sweep looks at the plugin that
//! occupied `i` when the step began:
//!
//! - for each name in its `pre`, the first match after position `i` is moved
//!   to position `i`;
//! - for each name in its `post`, the first match before position `i` is
//!   moved to position `i` (just after the plugin now at `i`).
//!
//! Constraints of a plugin that gets moved behind the sweep are never
//! revisited, so transitive chains may stay unsatisfied and cycles resolve to
//! whatever interleaving the sweep leaves behind. Callers rely on this exact
//! behaviour; it is not an approximation of a topological sort.
//!
//! The working list is an arena of prev/next links so each relocation is O(1).

use std::iter;

use hookline_core::{PluginError, PluginResult};

use crate::plugin::Plugin;

struct Links {
    head: Option<usize>,
    prev: Vec<Option<usize>>,
    next: Vec<Option<usize>>,
}

impl Links {
    fn new(len: usize) -> Self {
        Self {
            head: (len > 0).then_some(0),
            prev: (0..len).map(|i| i.checked_sub(1)).collect(),
            next: (0..len).map(|i| (i + 1 < len).then_some(i + 1)).collect(),
        }
    }

    fn unlink(&mut self, node: usize) {
        let (prev, next) = (self.prev[node], self.next[node]);
        match prev {
            Some(p) => self.next[p] = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.prev[n] = prev;
        }
        self.prev[node] = None;
        self.next[node] = None;
    }

    fn insert_before(&mut self, node: usize, anchor: usize) {
        let prev = self.prev[anchor];
        self.prev[node] = prev;
        self.next[node] = Some(anchor);
        self.prev[anchor] = Some(node);
        match prev {
            Some(p) => self.next[p] = Some(node),
            None => self.head = Some(node),
        }
    }

    fn insert_after(&mut self, node: usize, anchor: usize) {
        let next = self.next[anchor];
        self.prev[node] = Some(anchor);
        self.next[node] = next;
        self.next[anchor] = Some(node);
        if let Some(n) = next {
            self.prev[n] = Some(node);
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        iter::successors(self.head, |&n| self.next[n])
    }

    fn after(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        iter::successors(self.next[node], |&n| self.next[n])
    }
}

/// Resolves the execution order of `plugins`, given in registration order.
pub fn sort_plugins<S: Clone>(plugins: &[Plugin<S>]) -> Vec<Plugin<S>> {
    let mut links = Links::new(plugins.len());
    let mut at = links.head;

    while let Some(mut cursor) = at {
        let owner = &plugins[cursor];

        for name in owner.pre() {
            let found = links.after(cursor).find(|&j| plugins[j].name() == name);
            if let Some(j) = found {
                links.unlink(j);
                links.insert_before(j, cursor);
                cursor = j;
            }
        }

        for name in owner.post() {
            let found = links
                .iter()
                .take_while(|&j| j != cursor)
                .find(|&j| plugins[j].name() == name);
            if let Some(j) = found {
                links.unlink(j);
                links.insert_after(j, cursor);
                cursor = j;
            }
        }

        at = links.next[cursor];
    }

    links.iter().map(|i| plugins[i].clone()).collect()
}

/// Validates rival and required constraints over the resolved plugin list.
///
/// Fails on the first violation found.
pub fn check_plugins<S>(plugins: &[Plugin<S>]) -> PluginResult<()> {
    for origin in plugins {
        for rival in origin.rivals() {
            if let Some(plugin) = plugins.iter().find(|p| p.name() == rival) {
                return Err(PluginError::RivalConflict {
                    origin: origin.name().to_string(),
                    rival: plugin.name().to_string(),
                });
            }
        }

        for required in origin.required() {
            if !plugins.iter().any(|p| p.name() == required) {
                return Err(PluginError::MissingRequired {
                    required: required.to_string(),
                    dependent: origin.name().to_string(),
                });
            }
        }
    }

    Ok(())
}
