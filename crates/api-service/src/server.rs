//! HTTP server lifecycle.
//!
//! Once shutdown is requested the listener stops accepting connections and
//! in-flight requests get a bounded window to finish.

use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serve `app` on `listener` until `shutdown` is cancelled.
///
/// After cancellation, requests still running get up to `drain` to
/// complete. Anything left when the window closes is dropped.
///
/// # Errors
///
/// Returns the server's I/O error, or an error if the server task panicked.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
    drain: Duration,
) -> io::Result<()> {
    let graceful = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { graceful.cancelled().await })
        .await
    });

    tokio::select! {
        joined = &mut server => return flatten(joined),
        () = shutdown.cancelled() => {}
    }

    info!(target: "api.server", drain_secs = drain.as_secs(), "Draining in-flight requests");

    match tokio::time::timeout(drain, &mut server).await {
        Ok(joined) => {
            info!(target: "api.server", "Drain complete");
            flatten(joined)
        }
        Err(_) => {
            warn!(
                target: "api.server",
                drain_secs = drain.as_secs(),
                "Drain window elapsed, dropping remaining requests"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten(joined: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    joined.map_err(io::Error::other)?
}
