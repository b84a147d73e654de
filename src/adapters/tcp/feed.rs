use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::application::ports::AdvisoryFeed;
use crate::domain::stream::{encode_message, FeedFormat, FrameReport};

/// One encoded, newline-terminated feed message.
pub type Message = Arc<[u8]>;

/// Pipeline-side handle of the feed.
///
/// Publishing replaces whatever message is waiting in a single slot, so a
/// slow subscriber only ever sees the newest frame and the pipeline never
/// waits on the socket.
pub struct FeedPublisher {
    tx: watch::Sender<Option<Message>>,
    format: FeedFormat,
}

impl FeedPublisher {
    pub fn channel(format: FeedFormat) -> (Self, watch::Receiver<Option<Message>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx, format }, rx)
    }
}

impl AdvisoryFeed for FeedPublisher {
    fn publish(&self, report: &FrameReport) {
        match encode_message(report, self.format) {
            Ok(bytes) => {
                self.tx.send_replace(Some(Arc::from(bytes)));
            }
            Err(e) => warn!(frame = report.frame, "Failed to encode feed message: {}", e),
        }
    }
}
