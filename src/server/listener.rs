use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::Config;
use crate::http::composer::Composer;
use crate::http::connection::handle_connection;
use crate::resource::FileResolver;

/// Pause after an accept failure that is not tied to a single peer.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds the configured address and serves until `shutdown` completes.
pub async fn run(cfg: &Config, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    let composer = Composer::new(Arc::new(FileResolver::new(cfg.content_root.clone())));
    serve(listener, composer, cfg, shutdown).await
}

/// Accepts connections, one task each, until `shutdown` completes.
///
/// Then the listener is dropped and open connections get the configured
/// grace period to reach `Closed` before they are aborted.
pub async fn serve(
    listener: TcpListener,
    composer: Composer,
    cfg: &Config,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let idle_timeout = cfg.idle_timeout();
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        let pause = accept_backoff(&e);
                        if !pause.is_zero() {
                            tokio::time::sleep(pause).await;
                        }
                        continue;
                    }
                };
                info!("Accepted connection from {}", peer);

                let composer = composer.clone();
                connections.spawn(async move {
                    if let Err(e) = handle_connection(socket, peer, idle_timeout, composer).await {
                        tracing::error!("Connection error from {}: {}", peer, e);
                    }
                });
            }

            // Reap finished connections so the set does not grow unbounded.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}

            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    drop(listener);

    let in_flight = connections.len();
    if in_flight > 0 {
        info!(in_flight, "Waiting for open connections to finish");
        let drained = tokio::time::timeout(cfg.shutdown_grace(), async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(remaining = connections.len(), "Grace period elapsed, aborting connections");
            connections.shutdown().await;
        }
    }

    Ok(())
}

/// How long to wait before accepting again after `err`.
///
/// Failures caused by one peer going away are retried at once. Anything
/// else, such as running out of file descriptors, gets [`ACCEPT_BACKOFF`].
pub fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}
