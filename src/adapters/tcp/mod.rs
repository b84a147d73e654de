//! Streaming publisher: newline-delimited JSON over a single-subscriber
//! TCP connection.

pub mod feed;
pub mod server;
pub mod session;

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::stream::FeedFormat;
pub use feed::{FeedPublisher, Message};
pub use server::FeedServer;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Upper bound on one flush to the subscriber before the frame is given up.
    pub send_timeout: Duration,
    /// Pause after a failed accept.
    pub accept_backoff: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(50),
            accept_backoff: Duration::from_millis(100),
        }
    }
}

/// Resolves once shutdown is requested or its sender is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|&stop| stop).await;
}

/// Binds the feed listener and starts serving it on the current runtime.
///
/// Returns the pipeline-side publisher, the bound address and the server
/// task, which finishes after `shutdown` flips to `true`.
pub async fn spawn_feed(
    addr: &str,
    format: FeedFormat,
    config: PublisherConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<(FeedPublisher, SocketAddr, JoinHandle<()>)> {
    let (publisher, rx) = FeedPublisher::channel(format);
    let server = FeedServer::bind(addr, rx, config).await?;
    let local = server.local_addr()?;
    let task = tokio::spawn(server.serve(shutdown));
    Ok((publisher, local, task))
}
