use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::listener;
use super::session::SessionContext;
use crate::config::{Config, DEFAULT_MAX_REQUEST_BYTES};
use crate::error::ConfigError;
use crate::extension::{ConnectionExtension, Extension, ExtensionMap, FunctionExtension, Lifecycle};
use crate::routing::{Handler, Route, RouteTable, Router, normalize_path};

/// Addresses held by running servers in this process.
static ACTIVE_BINDINGS: Mutex<Vec<SocketAddr>> = Mutex::new(Vec::new());

/// Holds an address in [`ACTIVE_BINDINGS`] until dropped.
#[derive(Debug)]
struct Binding(SocketAddr);

impl Binding {
    fn claim(addr: SocketAddr) -> Result<Self, ConfigError> {
        let mut active = ACTIVE_BINDINGS.lock();
        if active.contains(&addr) {
            return Err(ConfigError::DuplicateBinding(addr));
        }
        active.push(addr);
        Ok(Self(addr))
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        ACTIVE_BINDINGS.lock().retain(|a| *a != self.0);
    }
}

/// Server configuration before it runs: address, routes, extensions and
/// the fallback for unmatched paths.
///
/// ```ignore
/// let server = ServerTemplate::new("127.0.0.1", 8000)
///     .route(Route::servable("/", h1("title").text("Whoa!")))
///     .extension("logger", Extension::connection(Logger::new("logs/log.txt")?))
///     .fallback(Handler::servable(p("missing").text("nothing here")))
///     .start()
///     .await?;
/// ```
#[derive(Debug)]
pub struct ServerTemplate {
    ip: String,
    port: u16,
    routes: HashMap<String, Route>,
    extensions: Vec<(String, Extension)>,
    fallback: Option<Handler>,
    max_request_bytes: usize,
}

impl ServerTemplate {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            routes: HashMap::new(),
            extensions: Vec::new(),
            fallback: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let (ip, port) = cfg.socket_addr()?;
        Ok(Self::new(ip.to_string(), port).max_request_bytes(cfg.max_request_bytes))
    }

    pub fn route(mut self, route: Route) -> Self {
        self.add(route);
        self
    }

    /// Adds a route, replacing any route already at that path.
    pub fn add(&mut self, route: Route) {
        self.routes.insert(route.path.clone(), route);
    }

    pub fn remove(&mut self, path: &str) -> Option<Route> {
        self.routes.remove(&normalize_path(path))
    }

    /// Registers an extension. Keys must be unique across all kinds; a
    /// repeat is reported by [`ServerTemplate::start`].
    pub fn extension(mut self, key: impl Into<String>, extension: Extension) -> Self {
        self.extensions.push((key.into(), extension));
        self
    }

    /// Handler for paths with no route. Runs with the status preset to 404.
    pub fn fallback(mut self, handler: Handler) -> Self {
        self.fallback = Some(handler);
        self
    }

    pub fn max_request_bytes(mut self, limit: usize) -> Self {
        self.max_request_bytes = limit;
        self
    }

    /// Validates the configuration, runs routing extensions, binds and
    /// starts accepting. Function extensions get [`Lifecycle::Start`] once
    /// the socket is bound and before any connection is accepted.
    pub async fn start(self) -> Result<ServerHandle, ConfigError> {
        let fallback = self.fallback.ok_or(ConfigError::MissingFallback)?;

        let mut seen = HashSet::new();
        for (key, _) in &self.extensions {
            if !seen.insert(key.as_str()) {
                return Err(ConfigError::DuplicateExtension(key.clone()));
            }
        }

        let ip: IpAddr = self
            .ip
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.ip.clone()))?;
        let requested = SocketAddr::new(ip, self.port);
        let reserved = if self.port == 0 {
            None
        } else {
            Some(Binding::claim(requested)?)
        };

        let routes = RouteTable::from_routes(self.routes.into_values());
        let mut connection_exts: HashMap<String, Arc<dyn ConnectionExtension>> = HashMap::new();
        let mut functions = Vec::new();

        for (key, extension) in self.extensions {
            match extension {
                Extension::Connection(ext) => {
                    connection_exts.insert(key, ext);
                }
                Extension::Routing(ext) => {
                    ext.route(&routes)
                        .map_err(|source| ConfigError::Routing { key, source })?;
                }
                Extension::Function(f) => functions.push(f),
            }
        }

        let listener = TcpListener::bind(requested)
            .await
            .map_err(|source| ConfigError::Bind {
                addr: requested,
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| ConfigError::Bind {
            addr: requested,
            source,
        })?;
        let binding = match reserved {
            Some(binding) => binding,
            None => Binding::claim(addr)?,
        };

        let context = SessionContext {
            router: Arc::new(Router::new(routes.clone(), fallback)),
            extensions: ExtensionMap::new(connection_exts),
            max_request_bytes: self.max_request_bytes,
        };

        // Start hooks finish before the first accept; early clients wait in
        // the backlog.
        for f in &functions {
            f.call(Lifecycle::Start(addr));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listener::run(listener, context, shutdown_rx));
        info!("Listening on {}", addr);

        Ok(ServerHandle {
            addr,
            routes,
            functions,
            shutdown: shutdown_tx,
            task,
            _binding: binding,
        })
    }
}

/// A running server. Dropping it without [`ServerHandle::stop`] also shuts
/// the listener down, but skips the stop hooks.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    routes: RouteTable,
    functions: Vec<FunctionExtension>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    _binding: Binding,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The live route table. Changes apply to the next request.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Stops accepting, waits for open sessions to drain, runs the
    /// [`Lifecycle::Stop`] hooks and frees the address.
    pub async fn stop(self) {
        let ServerHandle {
            addr,
            functions,
            shutdown,
            task,
            _binding,
            ..
        } = self;

        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            error!(error = %e, "listener task failed");
        }

        for f in &functions {
            f.call(Lifecycle::Stop(addr));
        }
        info!("Stopped server on {}", addr);
        drop(_binding);
    }
}
