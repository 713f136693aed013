use std::collections::HashMap;

use weft::http::request::{Method, Request, RequestBuilder};

fn request_with(headers: &[(&str, &str)], version: &str) -> Request {
    Request {
        method: Method::GET,
        path: "/".to_string(),
        version: version.to_string(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        body: vec![],
    }
}

#[test]
fn test_request_header_lookup_ignores_case() {
    let req = request_with(&[("content-type", "text/plain")], "HTTP/1.1");

    assert_eq!(req.header("Content-Type"), Some("text/plain"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length() {
    assert_eq!(request_with(&[("Content-Length", "42")], "HTTP/1.1").content_length(), 42);
    assert_eq!(request_with(&[("Content-Length", "nope")], "HTTP/1.1").content_length(), 0);
    assert_eq!(request_with(&[], "HTTP/1.1").content_length(), 0);
}

#[test]
fn test_request_keep_alive() {
    assert!(request_with(&[], "HTTP/1.1").keep_alive());
    assert!(!request_with(&[], "HTTP/1.0").keep_alive());
    assert!(request_with(&[("Connection", "Keep-Alive")], "HTTP/1.0").keep_alive());
    assert!(!request_with(&[("Connection", "close")], "HTTP/1.1").keep_alive());
}

#[test]
fn test_request_content_type_drops_parameters() {
    let req = request_with(&[("Content-Type", "Application/JSON; charset=utf-8")], "HTTP/1.1");
    assert_eq!(req.content_type().as_deref(), Some("application/json"));
}

#[test]
fn test_request_route_path_and_query() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/items?id=7")
        .build()
        .unwrap();

    assert_eq!(req.route_path(), "/items");
    assert_eq!(req.query(), Some("id=7"));
    assert_eq!(req.version, "HTTP/1.1");
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_method_round_trip_names() {
    assert_eq!(Method::from_str("PATCH"), Some(Method::PATCH));
    assert_eq!(Method::from_str("get"), None);
    assert_eq!(Method::DELETE.to_string(), "DELETE");
}
