use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::feed::Message;
use super::wait_for_shutdown;

#[derive(Debug)]
pub enum SessionEnd {
    PeerClosed,
    Shutdown,
    FeedClosed,
    Failed(io::Error),
}

/// Messages waiting for the socket.
///
/// A message is only dropped while none of its bytes have been written;
/// once started it is always finished before the next one, so the stream
/// never carries a torn line.
#[derive(Debug, Default)]
struct Outbound {
    current: Option<(Message, usize)>,
    next: Option<Message>,
    dropped: u64,
}

impl Outbound {
    fn offer(&mut self, msg: Message) {
        let Some((pending, written)) = self.current.as_mut() else {
            self.current = Some((msg, 0));
            return;
        };
        if *written == 0 {
            *pending = msg;
            self.dropped += 1;
        } else if self.next.replace(msg).is_some() {
            self.dropped += 1;
        }
    }

    fn advance(&mut self) {
        self.current = self.next.take().map(|m| (m, 0));
    }

    fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    fn pending(&self) -> u64 {
        self.current.is_some() as u64 + self.next.is_some() as u64
    }
}

/// Exclusive owner of the one subscriber connection.
pub struct Session {
    peer: SocketAddr,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    feed: watch::Receiver<Option<Message>>,
    send_timeout: Duration,
    outbound: Outbound,
    sent: u64,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        feed: watch::Receiver<Option<Message>>,
        send_timeout: Duration,
    ) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, "Could not set TCP_NODELAY: {}", e);
        }
        let (reader, writer) = stream.into_split();
        Self {
            peer,
            reader,
            writer,
            feed,
            send_timeout,
            outbound: Outbound::default(),
            sent: 0,
        }
    }

    /// Streams feed messages until the peer leaves, a write fails, the feed
    /// closes or shutdown is signalled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        // Frames published before the subscriber arrived are stale.
        self.feed.borrow_and_update();
        let mut scratch = [0u8; 256];

        let end = loop {
            let flushed = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break SessionEnd::Shutdown,
                read = self.reader.read(&mut scratch) => match read {
                    // Half-closed peers count as gone, even if they could still read.
                    Ok(0) => break SessionEnd::PeerClosed,
                    // Subscribers have nothing to say; inbound bytes are discarded.
                    Ok(_) => continue,
                    Err(e) => break SessionEnd::Failed(e),
                },
                changed = self.feed.changed() => {
                    if changed.is_err() {
                        break SessionEnd::FeedClosed;
                    }
                    let latest = self.feed.borrow_and_update().clone();
                    if let Some(msg) = latest {
                        self.outbound.offer(msg);
                    }
                    self.flush().await
                }
                // A line cut short by the deadline is finished as soon as the
                // socket drains, without waiting for the next frame.
                ready = self.writer.writable(), if !self.outbound.is_empty() => match ready {
                    Ok(()) => self.flush().await,
                    Err(e) => Err(e),
                },
            };
            match flushed {
                Ok(true) => {}
                Ok(false) => debug!(
                    peer = %self.peer,
                    "Send deadline of {:?} exceeded, subscriber is behind", self.send_timeout
                ),
                Err(e) => break SessionEnd::Failed(e),
            }
        };

        match &end {
            SessionEnd::Shutdown | SessionEnd::FeedClosed => {
                // One last bounded attempt; an unfinished line lacks its
                // newline, so the peer can tell it apart.
                if !self.outbound.is_empty() {
                    let _ = self.flush().await;
                }
                let _ = timeout_at(Instant::now() + self.send_timeout, self.writer.shutdown()).await;
            }
            SessionEnd::PeerClosed | SessionEnd::Failed(_) => {}
        }

        let sent = self.sent;
        let dropped = self.outbound.dropped + self.outbound.pending();
        match end {
            SessionEnd::Failed(e) => warn!(
                peer = %self.peer, sent, dropped,
                "Subscriber connection failed: {}", e
            ),
            other => info!(
                peer = %self.peer, sent, dropped,
                "Subscriber session ended ({:?})", other
            ),
        }
    }

    /// Writes pending messages until done or the send deadline passes.
    /// `Ok(false)` means the deadline won; what is left stays queued.
    async fn flush(&mut self) -> io::Result<bool> {
        let deadline = Instant::now() + self.send_timeout;
        while let Some((msg, written)) = self.outbound.current.as_mut() {
            match timeout_at(deadline, self.writer.write(&msg[*written..])).await {
                Err(_) => return Ok(false),
                Ok(Ok(0)) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(Ok(n)) => {
                    *written += n;
                    if *written == msg.len() {
                        self.sent += 1;
                        self.outbound.advance();
                    }
                }
                Ok(Err(e)) => return Err(e),
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn msg(s: &str) -> Message {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn unstarted_message_is_replaced() {
        let mut out = Outbound::default();
        out.offer(msg("a\n"));
        out.offer(msg("b\n"));

        assert_eq!(out.dropped, 1);
        assert_eq!(&out.current.as_ref().unwrap().0[..], b"b\n");
        assert!(out.next.is_none());
    }

    #[test]
    fn started_message_is_kept_and_newest_queued() {
        let mut out = Outbound::default();
        out.offer(msg("first\n"));
        out.current.as_mut().unwrap().1 = 3;

        out.offer(msg("second\n"));
        out.offer(msg("third\n"));

        assert_eq!(out.dropped, 1);
        assert_eq!(&out.current.as_ref().unwrap().0[..], b"first\n");
        assert_eq!(out.pending(), 2);

        out.advance();
        assert_eq!(&out.current.as_ref().unwrap().0[..], b"third\n");
        assert_eq!(out.current.as_ref().unwrap().1, 0);
        out.advance();
        assert!(out.is_empty());
    }
}
