//! HTTP/1.1 plumbing underneath the routing core.
//!
//! - **`request`**: request representation
//! - **`parser`**: parses incoming requests from byte buffers
//! - **`response`**: response representation with builder pattern
//! - **`writer`**: serializes and writes responses to the client
//! - **`args`**: query-string and body argument decoding
//! - **`mime`**: MIME type detection based on file extensions
//!
//! The per-socket read/dispatch/write loop lives in
//! [`server::session`](crate::server::session).

pub mod args;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
