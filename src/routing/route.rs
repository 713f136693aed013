use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::Result;
use crate::servable::Servable;

/// Boxed future returned by callable handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type CallableFn = dyn for<'c> Fn(&'c mut Connection) -> BoxFuture<'c, Result<()>> + Send + Sync;

/// What a route points at.
///
/// Both variants are consumed through [`Handler::invoke`]; for a servable
/// that means [`Servable::serve`].
#[derive(Clone)]
pub enum Handler {
    Callable(Arc<CallableFn>),
    Servable(Arc<dyn Servable>),
}

impl Handler {
    /// Wraps an async handler.
    ///
    /// ```ignore
    /// let h = Handler::callable(|c| Box::pin(async move {
    ///     c.write("hello");
    ///     Ok(())
    /// }));
    /// ```
    pub fn callable<F>(f: F) -> Self
    where
        F: for<'c> Fn(&'c mut Connection) -> BoxFuture<'c, Result<()>> + Send + Sync + 'static,
    {
        Handler::Callable(Arc::new(f))
    }

    /// Wraps a handler that never awaits.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut Connection) -> Result<()> + Send + Sync + 'static,
    {
        Self::callable(move |c| {
            let result = f(c);
            Box::pin(std::future::ready(result))
        })
    }

    pub fn servable<S: Servable + 'static>(servable: S) -> Self {
        Handler::Servable(Arc::new(servable))
    }

    pub async fn invoke(&self, conn: &mut Connection) -> Result<()> {
        match self {
            Handler::Callable(f) => f(conn).await,
            Handler::Servable(s) => s.serve(conn),
        }
    }

    /// Whether two handlers are the same allocation.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        match (self, other) {
            (Handler::Callable(a), Handler::Callable(b)) => Arc::ptr_eq(a, b),
            (Handler::Servable(a), Handler::Servable(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Callable(_) => f.write_str("Handler::Callable(..)"),
            Handler::Servable(s) => f.debug_tuple("Handler::Servable").field(s).finish(),
        }
    }
}

/// A path bound to a handler. The path is stored normalized.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub handler: Handler,
}

impl Route {
    pub fn new(path: &str, handler: Handler) -> Self {
        Self {
            path: normalize_path(path),
            handler,
        }
    }

    pub fn servable<S: Servable + 'static>(path: &str, servable: S) -> Self {
        Self::new(path, Handler::servable(servable))
    }
}

/// Shorthand for a route to an async closure.
pub fn route<F>(path: &str, f: F) -> Route
where
    F: for<'c> Fn(&'c mut Connection) -> BoxFuture<'c, Result<()>> + Send + Sync + 'static,
{
    Route::new(path, Handler::callable(f))
}

/// The one normalization rule used on insert and on lookup.
///
/// - the query component is dropped
/// - a missing leading `/` is added, so `""` becomes `/`
/// - exactly one trailing `/` is stripped, except from `/` itself
///
/// Nothing else: no case folding, no `//` collapsing, no percent-decoding.
pub fn normalize_path(path: &str) -> String {
    let path = match path.split_once('?') {
        Some((p, _)) => p,
        None => path,
    };

    let mut normalized = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(path);

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
