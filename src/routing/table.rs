use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::route::{Handler, Route, normalize_path};
use crate::error::{Error, Result};

/// The live path → handler map shared by the server and every connection.
///
/// Cloning hands out another reference to the same table, so a change made
/// while handling one request is seen by every later lookup from any
/// request. The lock is only held for the map operation itself and never
/// across an await; handlers are cloned out before they run.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Arc<RwLock<HashMap<String, Handler>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes<I>(routes: I) -> Self
    where
        I: IntoIterator<Item = Route>,
    {
        let table = Self::new();
        for route in routes {
            table.insert(route);
        }
        table
    }

    /// Binds `path` to `handler`, replacing any previous binding.
    /// Returns the handler that was replaced.
    pub fn add_route(&self, path: &str, handler: Handler) -> Option<Handler> {
        self.routes.write().insert(normalize_path(path), handler)
    }

    pub fn insert(&self, route: Route) -> Option<Handler> {
        self.routes.write().insert(route.path, route.handler)
    }

    /// Unbinds `path`. Removing an absent path is a no-op.
    pub fn remove_route(&self, path: &str) -> Option<Handler> {
        self.routes.write().remove(&normalize_path(path))
    }

    pub fn resolve(&self, path: &str) -> Result<Handler> {
        let key = normalize_path(path);
        self.routes
            .read()
            .get(&key)
            .cloned()
            .ok_or(Error::RouteNotFound(key))
    }

    /// Looks up a key that is already normalized, such as
    /// [`Connection::path`](crate::connection::Connection::path). Running
    /// the rule twice would strip a second trailing slash.
    pub fn get(&self, key: &str) -> Result<Handler> {
        self.routes
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::RouteNotFound(key.to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.read().contains_key(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    /// Bound paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}
