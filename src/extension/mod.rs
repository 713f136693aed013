//! Pluggable server extensions.
//!
//! Three kinds, each with its own lifecycle:
//!
//! - [`ConnectionExtension`]: a long-lived shared object every request can
//!   look up by key through [`Connection::capability`]. Anything mutable
//!   inside it must be synchronized, requests run concurrently.
//! - [`RoutingExtension`]: run once against the route table at start,
//!   before the listener accepts anything.
//! - [`FunctionExtension`]: a closure called on server start and stop.
//!
//! [`Connection::capability`]: crate::connection::Connection::capability

pub mod files;
pub mod logger;

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::routing::RouteTable;

pub use files::Files;
pub use logger::Logger;

/// Upcast to `Any` so a type-erased extension can be handed back typed.
pub trait AsAnyArc {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub trait ConnectionExtension: AsAnyArc + Send + Sync + 'static {}

pub trait RoutingExtension: Send + Sync {
    /// Populates or edits `routes`. Errors abort server start.
    fn route(&self, routes: &RouteTable) -> Result<()>;
}

/// Moments a [`FunctionExtension`] is called at. Carries the bound address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Start(SocketAddr),
    Stop(SocketAddr),
}

#[derive(Clone)]
pub struct FunctionExtension(Arc<dyn Fn(Lifecycle) + Send + Sync>);

impl FunctionExtension {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Lifecycle) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, event: Lifecycle) {
        (self.0)(event)
    }
}

impl fmt::Debug for FunctionExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FunctionExtension(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Connection,
    Routing,
    Function,
}

/// An extension as registered with a server.
pub enum Extension {
    Connection(Arc<dyn ConnectionExtension>),
    Routing(Box<dyn RoutingExtension>),
    Function(FunctionExtension),
}

impl Extension {
    pub fn connection<E: ConnectionExtension>(ext: E) -> Self {
        Extension::Connection(Arc::new(ext))
    }

    pub fn routing<E: RoutingExtension + 'static>(ext: E) -> Self {
        Extension::Routing(Box::new(ext))
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Lifecycle) + Send + Sync + 'static,
    {
        Extension::Function(FunctionExtension::new(f))
    }

    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::Connection(_) => ExtensionKind::Connection,
            Extension::Routing(_) => ExtensionKind::Routing,
            Extension::Function(_) => ExtensionKind::Function,
        }
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension::{:?}", self.kind())
    }
}

/// Connection extensions by key, as seen from inside a request.
///
/// Built once at start and never changed afterwards; clones share it.
#[derive(Clone, Default)]
pub struct ExtensionMap {
    entries: Arc<HashMap<String, Arc<dyn ConnectionExtension>>>,
}

impl ExtensionMap {
    pub fn new(entries: HashMap<String, Arc<dyn ConnectionExtension>>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// A map holding exactly one extension.
    pub fn single<E: ConnectionExtension>(key: impl Into<String>, ext: E) -> Self {
        let mut entries: HashMap<String, Arc<dyn ConnectionExtension>> = HashMap::new();
        entries.insert(key.into(), Arc::new(ext));
        Self::new(entries)
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn ConnectionExtension>> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ExtensionNotFound(key.to_string()))
    }

    pub fn get_as<T: ConnectionExtension>(&self, key: &str) -> Result<Arc<T>> {
        self.get(key)?
            .into_any()
            .downcast::<T>()
            .map_err(|_| Error::ExtensionTypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ExtensionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
