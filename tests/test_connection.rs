use std::net::SocketAddr;

use serde_json::Value;
use tempfile::TempDir;
use weft::extension::{ExtensionMap, Logger};
use weft::http::request::{Method, RequestBuilder};
use weft::http::response::StatusCode;
use weft::routing::{Handler, RouteTable, Router};
use weft::servable::tags::{h1, p};
use weft::servable::{Servable, Style};
use weft::{Connection, Error};

fn peer() -> SocketAddr {
    "192.168.1.20:51000".parse().unwrap()
}

fn get(path: &str) -> Connection {
    let request = RequestBuilder::new()
        .method(Method::GET)
        .path(path)
        .build()
        .unwrap();
    Connection::new(RouteTable::new(), ExtensionMap::default(), request, peer())
}

fn post(content_type: &str, body: &str) -> Connection {
    let request = RequestBuilder::new()
        .method(Method::POST)
        .path("/submit")
        .header("Content-Type", content_type)
        .body(body.as_bytes().to_vec())
        .build()
        .unwrap();
    Connection::new(RouteTable::new(), ExtensionMap::default(), request, peer())
}

#[test]
fn test_typed_arg_parses_integer() {
    let c = get("/calc?n=42");
    assert_eq!(c.typed_arg::<i64>("n").unwrap(), 42);
}

#[test]
fn test_typed_arg_unparsable_fails() {
    let c = get("/calc?n=abc");
    assert!(matches!(
        c.typed_arg::<i64>("n"),
        Err(Error::ArgumentConversion { key, .. }) if key == "n"
    ));
}

#[test]
fn test_typed_arg_missing_fails_the_same_way() {
    let c = get("/calc");
    let err = c.typed_arg::<i64>("n").unwrap_err();
    assert!(matches!(err, Error::ArgumentConversion { ref reason, .. } if reason == "missing"));
    assert!(err.is_client_error());
}

#[test]
fn test_query_args_are_cached() {
    let c = get("/?a=1&b=two");
    let first = c.query_args() as *const _;
    let second = c.query_args() as *const _;

    assert_eq!(first, second);
    assert_eq!(c.query_args().len(), 2);
    assert_eq!(c.query_args()["b"], "two");
}

#[test]
fn test_body_args_form_and_json() {
    let form = post("application/x-www-form-urlencoded", "name=Ada&age=36");
    assert_eq!(form.body_arg("name").unwrap(), &Value::from("Ada"));

    let json = post("application/json", r#"{"age": 36, "admin": true}"#);
    assert_eq!(json.body_args().unwrap()["age"], Value::from(36));
    assert_eq!(json.body_arg("admin").unwrap(), &Value::Bool(true));
    assert!(matches!(json.body_arg("name"), Err(Error::ArgumentConversion { .. })));
}

#[test]
fn test_body_args_unsupported_type() {
    let c = post("text/csv", "a,b");
    assert!(matches!(c.body_args(), Err(Error::MalformedBody(_))));
}

#[test]
fn test_write_string_servable_and_sequence() {
    let mut c = get("/");
    c.write("<!DOCTYPE html>");
    c.write(&h1("t").text("Title"));
    c.write(&vec![p("").text("one"), p("").text("two")]);
    c.write(&Style::new("p").with("margin", 0));

    let resp = c.into_response();
    assert_eq!(resp.status, StatusCode::Ok);
    assert_eq!(resp.headers["Content-Type"], "text/html; charset=utf-8");
    assert_eq!(
        String::from_utf8(resp.body).unwrap(),
        r#"<!DOCTYPE html><h1 id="t">Title</h1><p>one</p><p>two</p><style>p {margin:0;}</style>"#
    );
}

#[test]
fn test_capability_lookup() {
    let dir = TempDir::new().unwrap();
    let logger = Logger::new(dir.path().join("log.txt")).unwrap();
    let request = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    let c = Connection::new(
        RouteTable::new(),
        ExtensionMap::single("logger", logger),
        request,
        peer(),
    );

    assert!(c.capability("logger").is_ok());
    let typed = c.extension::<Logger>("logger").unwrap();
    typed.log("hello");
    assert_eq!(typed.count(1), 1);

    assert!(matches!(c.capability("db"), Err(Error::ExtensionNotFound(k)) if k == "db"));
}

#[test]
fn test_reroute_writes_into_shared_table() {
    let table = RouteTable::new();
    let request = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    let c = Connection::new(table.clone(), ExtensionMap::default(), request, peer());

    c.reroute("/flag", Handler::servable(p("").text("on")));
    assert!(table.resolve("/flag").is_ok());

    c.unroute("/flag");
    assert!(table.resolve("/flag").is_err());
}

#[test]
fn test_peer_and_path_accessors() {
    let c = get("/a/b/?x=1");
    assert_eq!(c.path(), "/a/b");
    assert_eq!(c.ip().to_string(), "192.168.1.20");
    assert_eq!(c.method(), Method::GET);
}

#[tokio::test]
async fn test_concurrent_reroutes_from_requests() {
    let table = RouteTable::new();
    let router = std::sync::Arc::new(Router::new(
        table.clone(),
        Handler::servable(p("").text("fallback")),
    ));
    table.add_route(
        "/install",
        Handler::sync(|c| {
            let id: u32 = c.typed_arg("id")?;
            c.reroute(&format!("/installed/{id}"), Handler::servable(p("").text(id)));
            Ok(())
        }),
    );

    let n = 50;
    let mut tasks = Vec::new();
    for id in 0..n {
        let router = router.clone();
        let table = table.clone();
        tasks.push(tokio::spawn(async move {
            let request = RequestBuilder::new()
                .method(Method::GET)
                .path(format!("/install?id={id}"))
                .build()
                .unwrap();
            let mut c = Connection::new(table, ExtensionMap::default(), request, peer());
            router.dispatch(&mut c).await;
            c.into_response().status
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::Ok);
    }

    let resolved = (0..n)
        .filter(|id| table.resolve(&format!("/installed/{id}")).is_ok())
        .count();
    assert_eq!(resolved, n as usize);
}

#[tokio::test]
async fn test_router_maps_errors_to_status() {
    let table = RouteTable::new();
    table.add_route("/num", Handler::sync(|c| {
        let n: i32 = c.typed_arg("n")?;
        c.write(&n.to_string());
        Ok(())
    }));
    table.add_route("/boom", Handler::sync(|c| {
        c.write("partial");
        Err(Error::PropertyNotFound("x".into()))
    }));
    let router = Router::new(table.clone(), Handler::servable(p("").text("nope")));

    let run = |path: &str| {
        let request = RequestBuilder::new().method(Method::GET).path(path).build().unwrap();
        Connection::new(table.clone(), ExtensionMap::default(), request, peer())
    };

    let mut ok = run("/num?n=7");
    router.dispatch(&mut ok).await;
    assert_eq!(ok.body(), b"7");

    let mut bad = run("/num?n=seven");
    router.dispatch(&mut bad).await;
    assert_eq!(bad.response_status(), StatusCode::BadRequest);

    let mut failed = run("/boom");
    router.dispatch(&mut failed).await;
    let resp = failed.into_response();
    assert_eq!(resp.status, StatusCode::InternalServerError);
    assert!(!String::from_utf8(resp.body).unwrap().contains("partial"));

    let mut missing = run("/missing");
    router.dispatch(&mut missing).await;
    assert_eq!(missing.response_status(), StatusCode::NotFound);
    assert_eq!(missing.body(), p("").text("nope").render().as_bytes());
}

#[tokio::test]
async fn test_dispatch_strips_only_one_trailing_slash() {
    let table = RouteTable::new();
    table.add_route("/about//", Handler::servable(p("").text("about slash")));
    table.add_route("/", Handler::servable(p("").text("root")));
    let router = Router::new(table.clone(), Handler::servable(p("").text("fallback")));

    let run = |path: &str| {
        let request = RequestBuilder::new().method(Method::GET).path(path).build().unwrap();
        Connection::new(table.clone(), ExtensionMap::default(), request, peer())
    };

    let mut about = run("/about//");
    assert_eq!(about.path(), "/about/");
    router.dispatch(&mut about).await;
    assert_eq!(about.response_status(), StatusCode::Ok);
    assert_eq!(about.body(), b"<p>about slash</p>");

    // "///" normalizes to "//", which is not the root
    let mut slashes = run("///");
    router.dispatch(&mut slashes).await;
    assert_eq!(slashes.response_status(), StatusCode::NotFound);
    assert_eq!(slashes.body(), b"<p>fallback</p>");
}
