use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::feed::Message;
use super::session::Session;
use super::{wait_for_shutdown, PublisherConfig};

/// Single-subscriber TCP feed server.
///
/// At most one session is live. Connections arriving while it is are
/// closed straight away instead of waiting in line.
pub struct FeedServer {
    listener: TcpListener,
    feed: watch::Receiver<Option<Message>>,
    config: PublisherConfig,
}

impl FeedServer {
    pub async fn bind(
        addr: &str,
        feed: watch::Receiver<Option<Message>>,
        config: PublisherConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind feed listener on {}", addr))?;
        Ok(Self {
            listener,
            feed,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        let local = self.listener.local_addr().ok();
        info!(addr = ?local, "Feed server waiting for a subscriber");

        let mut session: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if session.as_ref().is_some_and(|h| !h.is_finished()) {
                            warn!(peer = %peer, "Rejecting subscriber, feed already has one");
                            drop(stream);
                            continue;
                        }
                        if let Some(done) = session.take() {
                            reap(done).await;
                        }
                        info!(peer = %peer, "Subscriber connected");
                        let task = Session::new(stream, peer, self.feed.clone(), self.config.send_timeout)
                            .run(shutdown.clone());
                        session = Some(tokio::spawn(task));
                    }
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        tokio::time::sleep(self.config.accept_backoff).await;
                    }
                },
            }
        }

        drop(self.listener);
        if let Some(active) = session {
            reap(active).await;
        }
        info!("Feed server stopped");
    }
}

async fn reap(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        error!("Subscriber session task failed: {}", e);
    }
}
