//! Route table and dispatch.
//!
//! ```text
//! request path
//!     → normalize_path (same rule as on insert)
//!     → RouteTable::resolve (exact match)
//!     → Handler::invoke, or the fallback on a miss
//! ```
//!
//! Handlers may rewrite the table while running through
//! [`Connection::reroute`](crate::connection::Connection::reroute); that
//! goes through the same [`RouteTable`] the router reads from.

pub mod route;
pub mod router;
pub mod table;

pub use route::{BoxFuture, Handler, Route, normalize_path, route};
pub use router::Router;
pub use table::RouteTable;
