//! Per-request context handed to every handler.
//!
//! A `Connection` carries references to the server's shared [`RouteTable`]
//! and [`ExtensionMap`], the parsed request, and the response being built.
//! It lives for exactly one request; the session that created it turns it
//! into a [`Response`] and drops it, on every exit path.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use bytes::BytesMut;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::extension::{ConnectionExtension, ExtensionMap};
use crate::http::args::{parse_body, parse_query};
use crate::http::mime::content_type_for;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::routing::{Handler, RouteTable, normalize_path};
use crate::servable::Writable;

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

pub struct Connection {
    routes: RouteTable,
    extensions: ExtensionMap,
    request: Request,
    path: String,
    peer: SocketAddr,
    status: StatusCode,
    headers: HashMap<String, String>,
    body: BytesMut,
    query: OnceLock<HashMap<String, String>>,
    form: OnceLock<HashMap<String, Value>>,
}

impl Connection {
    pub fn new(
        routes: RouteTable,
        extensions: ExtensionMap,
        request: Request,
        peer: SocketAddr,
    ) -> Self {
        let path = normalize_path(request.route_path());
        Self {
            routes,
            extensions,
            request,
            path,
            peer,
            status: StatusCode::Ok,
            headers: HashMap::new(),
            body: BytesMut::new(),
            query: OnceLock::new(),
            form: OnceLock::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    /// Normalized request path, the key routes are looked up by.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn ip(&self) -> IpAddr {
        self.peer.ip()
    }

    /// The shared route table, the same one the router resolves against.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Binds `path` in the shared table. Visible to every later lookup from
    /// any request, including the rest of this one.
    pub fn reroute(&self, path: &str, handler: Handler) -> Option<Handler> {
        self.routes.add_route(path, handler)
    }

    pub fn unroute(&self, path: &str) -> Option<Handler> {
        self.routes.remove_route(path)
    }

    /// Looks up a connection extension by key.
    pub fn capability(&self, key: &str) -> Result<Arc<dyn ConnectionExtension>> {
        self.extensions.get(key)
    }

    /// Typed form of [`Connection::capability`].
    pub fn extension<T: ConnectionExtension>(&self, key: &str) -> Result<Arc<T>> {
        self.extensions.get_as::<T>(key)
    }

    /// Query-string arguments, decoded on first use and cached.
    pub fn query_args(&self) -> &HashMap<String, String> {
        self.query.get_or_init(|| {
            self.request
                .query()
                .map(parse_query)
                .unwrap_or_default()
        })
    }

    /// One query argument parsed as `T`. Absent and unparsable are both
    /// [`Error::ArgumentConversion`].
    pub fn typed_arg<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self
            .query_args()
            .get(key)
            .ok_or_else(|| conversion_error::<T>(key, "missing"))?;

        raw.parse::<T>()
            .map_err(|e| conversion_error::<T>(key, &e.to_string()))
    }

    /// Body arguments, decoded on first successful use and cached.
    pub fn body_args(&self) -> Result<&HashMap<String, Value>> {
        if let Some(args) = self.form.get() {
            return Ok(args);
        }
        let parsed = parse_body(&self.request)?;
        Ok(self.form.get_or_init(|| parsed))
    }

    pub fn body_arg(&self, key: &str) -> Result<&Value> {
        self.body_args()?
            .get(key)
            .ok_or_else(|| conversion_error::<Value>(key, "missing"))
    }

    /// Renders `payload` and appends it to the response body.
    ///
    /// ```ignore
    /// c.write("<p>plain</p>");
    /// c.write(&h1("title").text("Whoa!"));
    /// c.write(&vec![header, body, footer]);
    /// ```
    pub fn write<P: Writable + ?Sized>(&mut self, payload: &P) {
        let mut out = String::new();
        payload.write_into(&mut out);
        self.body.extend_from_slice(out.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn response_status(&self) -> StatusCode {
        self.status
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn content_type(&mut self, value: impl Into<String>) -> &mut Self {
        self.set_header("Content-Type", value)
    }

    /// Sends the client to `url` with a 302.
    pub fn redirect(&mut self, url: &str) {
        self.status(StatusCode::Found).set_header("Location", url);
    }

    /// Responds with the file at `path`, typed by its extension.
    pub async fn send_file(&mut self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        self.content_type(content_type_for(path));
        self.write_bytes(&bytes);
        Ok(())
    }

    /// Responds with the file at `path` as an attachment.
    pub async fn download(&mut self, path: &Path) -> Result<()> {
        self.send_file(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().replace('"', ""))
            .unwrap_or_else(|| "download".to_string());
        self.set_header(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        );
        Ok(())
    }

    /// Bytes written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Throws away whatever the handler produced and answers with `message`.
    pub(crate) fn reject(&mut self, status: StatusCode, message: &str) {
        self.body.clear();
        self.headers.clear();
        self.status = status;
        self.content_type("text/plain; charset=utf-8");
        self.write(message);
    }

    pub fn into_response(self) -> Response {
        let mut headers = self.headers;
        headers
            .entry("Content-Type".to_string())
            .or_insert_with(|| DEFAULT_CONTENT_TYPE.to_string());

        ResponseBuilder::new(self.status)
            .headers(headers)
            .body(self.body.to_vec())
            .build()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("method", &self.request.method)
            .field("path", &self.path)
            .field("peer", &self.peer)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn conversion_error<T>(key: &str, reason: &str) -> Error {
    Error::ArgumentConversion {
        key: key.to_string(),
        target: std::any::type_name::<T>(),
        reason: reason.to_string(),
    }
}
