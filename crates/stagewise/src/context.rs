//! Scoped key/value context shared by the stages of one workflow run.
//!
//! A [`Context`] is a node in a tree. Lookups check the node's own values,
//! then walk up through its parents; the root falls back to the
//! [`HostContext`] supplied to [`crate::Workflow::work`]. Writes only ever
//! touch the node they are made on, so a stage can hand data to a sub-scope
//! through [`Context::child`] without its siblings seeing it.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Values supplied by whatever environment runs the workflow.
///
/// The root [`Context`] consults this source for keys no scope has set.
/// Cancellation, deadlines and the like stay with the host; stages that care
/// about them read a key and abort by returning an error.
pub trait HostContext {
    fn value(&self, key: &str) -> Option<Value>;
}

/// The empty host: every lookup is absent.
impl HostContext for () {
    fn value(&self, _key: &str) -> Option<Value> {
        None
    }
}

impl HostContext for HashMap<String, Value> {
    fn value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl HostContext for Map<String, Value> {
    fn value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl<T: HostContext + ?Sized> HostContext for &T {
    fn value(&self, key: &str) -> Option<Value> {
        (**self).value(key)
    }
}

/// Where a scope delegates lookups it cannot answer itself.
enum Parent<'p> {
    Host(&'p dyn HostContext),
    Scope(&'p Context<'p>),
}

/// One scope in the context tree.
pub struct Context<'p> {
    values: HashMap<String, Value>,
    parent: Parent<'p>,
}

impl<'p> Context<'p> {
    /// Create a root scope that falls back to `host`.
    pub fn new(host: &'p dyn HostContext) -> Self {
        Self {
            values: HashMap::new(),
            parent: Parent::Host(host),
        }
    }

    /// Nearest value for `key`: this scope, then its ancestors, then the host.
    ///
    /// Values found in a scope are borrowed; host values are owned.
    pub fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
        let mut scope = self;
        loop {
            if let Some(v) = scope.values.get(key) {
                return Some(Cow::Borrowed(v));
            }
            match scope.parent {
                Parent::Scope(parent) => scope = parent,
                Parent::Host(host) => return host.value(key).map(Cow::Owned),
            }
        }
    }

    /// Like [`Context::get`], deserialized into `T`.
    ///
    /// # Errors
    /// Returns the serde error when the stored value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get(key)
            .map(|v| serde_json::from_value(v.into_owned()))
            .transpose()
    }

    /// True when `key` resolves anywhere in the chain, the host included.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Write `key` into this scope only; returns the value it replaced here.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove `key` from this scope only. Ancestors keep their own copy.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Keys written directly on this scope.
    pub fn local_keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// A new, empty scope whose lookups fall back to this one.
    pub fn child(&self) -> Context<'_> {
        Context {
            values: HashMap::new(),
            parent: Parent::Scope(self),
        }
    }

    /// Number of scopes above this one; the root is at depth 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self;
        while let Parent::Scope(parent) = scope.parent {
            depth += 1;
            scope = parent;
        }
        depth
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}
