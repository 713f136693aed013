//! Weft - a small web framework core
//!
//! Requests are dispatched through a route table handlers can rewrite at
//! run time, pluggable extensions are threaded into every request, and
//! responses are built from trees of property-bearing components.

pub mod config;
pub mod connection;
pub mod error;
pub mod extension;
pub mod http;
pub mod routing;
pub mod servable;
pub mod server;

pub use connection::Connection;
pub use error::{ConfigError, Error, Result};
pub use extension::{Extension, Lifecycle};
pub use routing::{Handler, Route, RouteTable, route};
pub use server::{ServerHandle, ServerTemplate};
