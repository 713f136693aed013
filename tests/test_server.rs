use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use weft::extension::{Files, Logger};
use weft::routing::Handler;
use weft::servable::tags::{h1, p};
use weft::{ConfigError, Extension, Lifecycle, Route, ServerTemplate, route};

fn fallback() -> Handler {
    Handler::servable(p("missing").text("nothing here"))
}

/// Sends one request with `Connection: close` and returns the raw response.
async fn send(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

async fn get(addr: std::net::SocketAddr, path: &str) -> String {
    send(addr, &format!("GET {path} HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")).await
}

#[tokio::test]
async fn test_end_to_end_route_and_fallback() {
    let server = ServerTemplate::new("127.0.0.1", 0)
        .route(Route::servable("/", h1("").text("Whoa!")))
        .fallback(fallback())
        .start()
        .await
        .unwrap();
    let addr = server.local_addr();

    let home = get(addr, "/").await;
    assert!(home.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(home.ends_with("<h1>Whoa!</h1>"));

    let missing = get(addr, "/missing").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(missing.ends_with(r#"<p id="missing">nothing here</p>"#));

    server.stop().await;
}

#[tokio::test]
async fn test_reroute_is_visible_to_later_requests() {
    let server = ServerTemplate::new("127.0.0.1", 0)
        .route(route("/enable", |c| {
            Box::pin(async move {
                c.reroute("/feature", Handler::servable(p("").text("enabled")));
                c.redirect("/feature");
                Ok(())
            })
        }))
        .fallback(fallback())
        .start()
        .await
        .unwrap();
    let addr = server.local_addr();

    assert!(get(addr, "/feature").await.starts_with("HTTP/1.1 404"));

    let redirect = get(addr, "/enable").await;
    assert!(redirect.starts_with("HTTP/1.1 302 Found\r\n"));
    assert!(redirect.contains("Location: /feature\r\n"));

    assert!(get(addr, "/feature").await.ends_with("<p>enabled</p>"));
    assert!(server.routes().contains("/feature"));

    server.stop().await;
}

#[tokio::test]
async fn test_keep_alive_serves_several_requests() {
    let server = ServerTemplate::new("127.0.0.1", 0)
        .route(route("/n", |c| {
            Box::pin(async move {
                let n: u32 = c.typed_arg("n")?;
                c.write(&(n * 2).to_string());
                Ok(())
            })
        }))
        .fallback(fallback())
        .start()
        .await
        .unwrap();

    let raw = "GET /n?n=2 HTTP/1.1\r\n\r\nGET /n?n=x HTTP/1.1\r\n\r\nHEAD /n?n=5 HTTP/1.1\r\nConnection: close\r\n\r\n";
    let out = send(server.local_addr(), raw).await;

    let statuses: Vec<&str> = out.matches("HTTP/1.1 ").collect();
    assert_eq!(statuses.len(), 3);
    assert!(out.contains("\r\n\r\n4HTTP/1.1 400 Bad Request"));
    // HEAD keeps the headers of the GET it mirrors but drops the body
    let head = out.rsplit("HTTP/1.1 ").next().unwrap();
    assert!(head.starts_with("200 OK\r\n"));
    assert!(head.contains("Content-Length: 2\r\n"));
    assert!(head.ends_with("\r\n\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let server = ServerTemplate::new("127.0.0.1", 0)
        .fallback(fallback())
        .start()
        .await
        .unwrap();

    let out = send(server.local_addr(), "NONSENSE\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_request_gets_400() {
    let server = ServerTemplate::new("127.0.0.1", 0)
        .max_request_bytes(64)
        .fallback(fallback())
        .start()
        .await
        .unwrap();

    let raw = format!("GET / HTTP/1.1\r\nX-Pad: {}\r\n", "a".repeat(200));
    let out = send(server.local_addr(), &raw).await;
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.ends_with("request too large"));

    server.stop().await;
}

#[tokio::test]
async fn test_missing_fallback_is_startup_error() {
    let result = ServerTemplate::new("127.0.0.1", 0)
        .route(Route::servable("/", h1("").text("hi")))
        .start()
        .await;
    assert!(matches!(result, Err(ConfigError::MissingFallback)));
}

#[tokio::test]
async fn test_duplicate_binding_is_startup_error() {
    let first = ServerTemplate::new("127.0.0.1", 0)
        .fallback(fallback())
        .start()
        .await
        .unwrap();
    let port = first.local_addr().port();

    let second = ServerTemplate::new("127.0.0.1", port)
        .fallback(fallback())
        .start()
        .await;
    assert!(matches!(second, Err(ConfigError::DuplicateBinding(_))));

    first.stop().await;

    // the address is free again once stopped
    let third = ServerTemplate::new("127.0.0.1", port)
        .fallback(fallback())
        .start()
        .await
        .unwrap();
    third.stop().await;
}

#[tokio::test]
async fn test_duplicate_extension_key_is_startup_error() {
    let dir = TempDir::new().unwrap();
    let result = ServerTemplate::new("127.0.0.1", 0)
        .extension("x", Extension::connection(Logger::new(dir.path().join("a.txt")).unwrap()))
        .extension("x", Extension::function(|_| {}))
        .fallback(fallback())
        .start()
        .await;
    assert!(matches!(result, Err(ConfigError::DuplicateExtension(k)) if k == "x"));
}

#[tokio::test]
async fn test_extensions_wired_through_start() {
    let dir = TempDir::new().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("style.css"), "h1{color:red}").unwrap();
    let log_path = dir.path().join("log.txt");

    let events = Arc::new(AtomicUsize::new(0));
    let seen = events.clone();

    let server = ServerTemplate::new("127.0.0.1", 0)
        .extension("logger", Extension::connection(Logger::new(&log_path).unwrap()))
        .extension("files", Extension::routing(Files::new(&public)))
        .extension(
            "hooks",
            Extension::function(move |event| match event {
                Lifecycle::Start(_) => {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                Lifecycle::Stop(_) => {
                    seen.fetch_add(10, Ordering::SeqCst);
                }
            }),
        )
        .route(route("/log", |c| {
            Box::pin(async move {
                let logger = c.extension::<Logger>("logger")?;
                logger.log("visited /log");
                c.write("logged");
                Ok(())
            })
        }))
        .fallback(fallback())
        .start()
        .await
        .unwrap();
    let addr = server.local_addr();
    assert_eq!(events.load(Ordering::SeqCst), 1);

    let css = get(addr, "/style.css").await;
    assert!(css.contains("Content-Type: text/css; charset=utf-8\r\n"));
    assert!(css.ends_with("h1{color:red}"));

    assert!(get(addr, "/log").await.ends_with("logged"));

    server.stop().await;
    assert_eq!(events.load(Ordering::SeqCst), 11);
    assert!(std::fs::read_to_string(&log_path).unwrap().contains("[INFO] visited /log"));
}

#[tokio::test]
async fn test_failing_routing_extension_aborts_start() {
    let result = ServerTemplate::new("127.0.0.1", 0)
        .extension("files", Extension::routing(Files::new("/no/such/dir/anywhere")))
        .fallback(fallback())
        .start()
        .await;
    assert!(matches!(result, Err(ConfigError::Routing { key, .. }) if key == "files"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_hooks_finish_before_first_request() {
    let ready = Arc::new(AtomicBool::new(false));
    let early_client = Arc::new(Mutex::new(None));

    let flag = ready.clone();
    let client_slot = early_client.clone();
    let hook = move |event| {
        if let Lifecycle::Start(addr) = event {
            // a client that connects the moment the socket is bound
            let client = std::thread::spawn(move || {
                let mut stream = std::net::TcpStream::connect(addr).unwrap();
                stream
                    .write_all(b"GET /ready HTTP/1.1\r\nConnection: close\r\n\r\n")
                    .unwrap();
                let mut out = String::new();
                stream.read_to_string(&mut out).unwrap();
                out
            });
            *client_slot.lock().unwrap() = Some(client);
            std::thread::sleep(Duration::from_millis(200));
            flag.store(true, Ordering::SeqCst);
        }
    };

    let state = ready.clone();
    let server = ServerTemplate::new("127.0.0.1", 0)
        .extension("warmup", Extension::function(hook))
        .route(Route::new(
            "/ready",
            Handler::sync(move |c| {
                c.write(&state.load(Ordering::SeqCst).to_string());
                Ok(())
            }),
        ))
        .fallback(fallback())
        .start()
        .await
        .unwrap();

    let client = early_client.lock().unwrap().take().unwrap();
    let out = tokio::task::spawn_blocking(move || client.join().unwrap())
        .await
        .unwrap();
    assert!(out.ends_with("true"), "served before start hooks ran: {out}");

    server.stop().await;
}
