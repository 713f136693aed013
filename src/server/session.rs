//! One client socket, possibly carrying several keep-alive requests.
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← wait for a full request (or shutdown)
//!        └──────┬──────┘
//!               │ request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← fresh Connection, router dispatch
//!        └──────┬───────────┘
//!               │ response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← send response to client
//!        └──────┬───────────┘
//!               ├─ keep-alive → Reading
//!               └─ close → Closed
//! ```
//!
//! A malformed or oversized request gets a 400 and the socket is closed.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::extension::ExtensionMap;
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::routing::Router;

const READ_CHUNK: usize = 4096;

/// Everything a session needs from the server, shared by all of them.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub router: Arc<Router>,
    pub extensions: ExtensionMap,
    pub max_request_bytes: usize,
}

pub struct Session<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    state: SessionState,
    context: SessionContext,
    shutdown: watch::Receiver<bool>,
}

#[derive(Debug)]
pub enum SessionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

enum Inbound {
    Request(Request),
    Rejected(&'static str),
    Closed,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: SocketAddr,
        context: SessionContext,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: SessionState::Reading,
            context,
            shutdown,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.state = match std::mem::replace(&mut self.state, SessionState::Closed) {
                SessionState::Reading => match self.read_request().await? {
                    Inbound::Request(req) => SessionState::Processing(req),
                    Inbound::Rejected(reason) => {
                        warn!(peer = %self.peer, reason, "rejecting request");
                        let response = ResponseBuilder::new(StatusCode::BadRequest)
                            .header("Connection", "close")
                            .body(reason.as_bytes().to_vec())
                            .build();
                        SessionState::Writing(ResponseWriter::new(&response), false)
                    }
                    Inbound::Closed => SessionState::Closed,
                },

                SessionState::Processing(req) => {
                    let (response, head_only, keep_alive) = self.handle_request(req).await;

                    let writer = if head_only {
                        ResponseWriter::head_only(&response)
                    } else {
                        ResponseWriter::new(&response)
                    };
                    SessionState::Writing(writer, keep_alive)
                }

                SessionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive && !*self.shutdown.borrow() {
                        SessionState::Reading
                    } else {
                        SessionState::Closed
                    }
                }

                SessionState::Closed => break,
            };
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<Inbound> {
        loop {
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    let _ = self.buffer.split_to(consumed);
                    return Ok(Inbound::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    if self.buffer.len() > self.context.max_request_bytes {
                        return Ok(Inbound::Rejected("request too large"));
                    }
                }

                Err(e) => {
                    debug!(peer = %self.peer, error = ?e, "HTTP parse error");
                    return Ok(Inbound::Rejected("malformed request"));
                }
            }

            let n = tokio::select! {
                read = self.stream.read_buf(&mut self.buffer) => read?,
                _ = self.shutdown.changed() => 0,
            };

            if n == 0 {
                // Client closed connection, or the server is stopping.
                return Ok(Inbound::Closed);
            }
        }
    }

    /// Returns the response, whether to omit its body, and keep-alive.
    async fn handle_request(&self, req: Request) -> (Response, bool, bool) {
        let keep_alive = req.keep_alive();
        let head_only = req.method == Method::HEAD;
        let method = req.method;
        let path = req.path.clone();

        let mut conn = Connection::new(
            self.context.router.routes().clone(),
            self.context.extensions.clone(),
            req,
            self.peer,
        );
        self.context.router.dispatch(&mut conn).await;

        let mut response = conn.into_response();
        if !keep_alive {
            response
                .headers
                .insert("Connection".to_string(), "close".to_string());
        }

        info!(
            peer = %self.peer,
            %method,
            path = %path,
            status = response.status.as_u16(),
            "request served"
        );
        (response, head_only, keep_alive)
    }
}
