//! Path lookup and handler invocation.
//!
//! A miss goes to the fallback handler with the status preset to 404. A
//! handler error becomes a 400 when the client caused it and a 500
//! otherwise; either way only this request is affected.

use tracing::{debug, error, warn};

use super::route::Handler;
use super::table::RouteTable;
use crate::connection::Connection;
use crate::error::Error;
use crate::http::response::StatusCode;

#[derive(Debug, Clone)]
pub struct Router {
    routes: RouteTable,
    fallback: Handler,
}

impl Router {
    pub fn new(routes: RouteTable, fallback: Handler) -> Self {
        Self { routes, fallback }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn dispatch(&self, conn: &mut Connection) {
        let handler = match self.routes.get(conn.path()) {
            Ok(handler) => handler,
            Err(Error::RouteNotFound(path)) => {
                debug!(path = %path, "no route, using fallback");
                conn.status(StatusCode::NotFound);
                self.fallback.clone()
            }
            Err(e) => {
                error!(error = %e, "route lookup failed");
                self.fallback.clone()
            }
        };

        if let Err(e) = handler.invoke(conn).await {
            let method = conn.method();
            let path = conn.path().to_string();
            if e.is_client_error() {
                warn!(%method, path = %path, error = %e, "rejected request");
                conn.reject(StatusCode::BadRequest, &e.to_string());
            } else {
                error!(%method, path = %path, error = %e, "handler failed");
                conn.reject(StatusCode::InternalServerError, "500 Internal Server Error");
            }
        }
    }
}
