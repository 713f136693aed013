//! Request argument decoding.
//!
//! Query strings and form bodies go through `url::form_urlencoded`; JSON
//! bodies through `serde_json`. A repeated key keeps its last value.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::request::Request;

/// Decodes a raw query string (no leading `?`).
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Decodes the body of `request` according to its Content-Type.
///
/// An empty body yields an empty map whatever the declared type.
pub fn parse_body(request: &Request) -> Result<HashMap<String, Value>> {
    if request.body.is_empty() {
        return Ok(HashMap::new());
    }

    match request.content_type().as_deref() {
        Some("application/json") => parse_json_body(&request.body),
        Some("application/x-www-form-urlencoded") | None => Ok(url::form_urlencoded::parse(&request.body)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect()),
        Some(other) => Err(Error::MalformedBody(format!(
            "unsupported content type `{other}`"
        ))),
    }
}

fn parse_json_body(body: &[u8]) -> Result<HashMap<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
        Ok(_) => Err(Error::MalformedBody("JSON body is not an object".into())),
        Err(e) => Err(Error::MalformedBody(e.to_string())),
    }
}
