use tracing_subscriber::EnvFilter;
use weft::config::Config;
use weft::extension::{Files, Logger};
use weft::servable::tags::{div, h1, p};
use weft::{Extension, Handler, Route, ServerTemplate, route};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_filter)),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let mut server = ServerTemplate::from_config(&cfg)?
        .route(Route::servable("/", h1("heading").text("Whoa!")))
        .route(route("/greet", |c| {
            Box::pin(async move {
                let name = c
                    .query_args()
                    .get("name")
                    .cloned()
                    .unwrap_or_else(|| "stranger".to_string());
                let times: u32 = if c.query_args().contains_key("times") {
                    c.typed_arg("times")?
                } else {
                    1
                };
                let mut page = div("greetings");
                for _ in 0..times.min(10) {
                    page.push(p("").text(format!("Hello, {name}!")));
                }
                c.write(&page);
                Ok(())
            })
        }))
        .fallback(Handler::servable(
            div("missing").child(h1("").text("404")).child(p("").text("Nothing here.")),
        ));

    if let Some(log_file) = &cfg.log_file {
        server = server.extension("logger", Extension::connection(Logger::new(log_file)?));
    }
    if let Some(dir) = &cfg.public_dir {
        server = server.extension("files", Extension::routing(Files::new(dir)));
    }

    let handle = server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    handle.stop().await;

    Ok(())
}
