//! Error types.
//!
//! [`Error`] covers everything that can go wrong while a request is being
//! serviced; none of it is allowed to take the process down. [`ConfigError`]
//! covers startup misconfiguration, which halts [`ServerTemplate::start`].
//!
//! [`ServerTemplate::start`]: crate::server::ServerTemplate::start

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Request-time errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No route is bound to the path.
    #[error("no route bound to `{0}`")]
    RouteNotFound(String),

    /// Capability lookup by a key nothing was registered under.
    #[error("no extension registered under `{0}`")]
    ExtensionNotFound(String),

    /// The extension exists but is not of the requested type.
    #[error("extension `{key}` is not a `{expected}`")]
    ExtensionTypeMismatch {
        key: String,
        expected: &'static str,
    },

    /// A request argument was missing or could not be parsed.
    #[error("argument `{key}` could not be read as {target}: {reason}")]
    ArgumentConversion {
        key: String,
        target: &'static str,
        reason: String,
    },

    /// A servable property was read by a key that is not set.
    #[error("property `{0}` is not set")]
    PropertyNotFound(String),

    /// Keyframe outside 0..=100 or not one of `from`/`to`/`N%`.
    #[error("invalid keyframe `{0}`")]
    InvalidKeyframe(String),

    /// The request body could not be decoded.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by the client sending a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ArgumentConversion { .. } | Error::MalformedBody(_)
        )
    }
}

/// Startup-time misconfiguration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is already bound by a running server")]
    DuplicateBinding(SocketAddr),

    #[error("no fallback handler configured")]
    MissingFallback,

    #[error("extension key `{0}` registered more than once")]
    DuplicateExtension(String),

    #[error("invalid listen address `{0}`")]
    InvalidAddress(String),

    #[error("log sink {path} could not be opened: {source}")]
    SinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("routing extension `{key}` failed: {source}")]
    Routing {
        key: String,
        #[source]
        source: Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for request-time operations.
pub type Result<T> = std::result::Result<T, Error>;
