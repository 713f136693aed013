use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::session::{Session, SessionContext};

/// How long in-flight sessions get to finish once the server stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts connections until `shutdown` flips (or its sender is dropped),
/// one task per socket. Accept errors are logged and skipped.
pub async fn run(listener: TcpListener, context: SessionContext, mut shutdown: watch::Receiver<bool>) {
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                info!("Accepted connection from {}", peer);

                let context = context.clone();
                let shutdown = shutdown.clone();
                sessions.spawn(async move {
                    let mut session = Session::new(socket, peer, context, shutdown);
                    if let Err(e) = session.run().await {
                        error!("Connection error from {}: {}", peer, e);
                    }
                });
            }

            _ = shutdown.changed() => break,

            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "session task failed");
                }
            }
        }
    }

    drop(listener);
    info!(open = sessions.len(), "listener closed, draining sessions");

    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(open = sessions.len(), "aborting sessions still open after drain timeout");
        sessions.shutdown().await;
    }
}
