use crate::domain::{artifact::Artifact, detection::Detection, errors::DomainResult, stream::FrameReport};

/// Where frames come from (camera, recording, ...).
pub trait FrameSource: Send {
    type Frame;

    /// `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> DomainResult<Option<Self::Frame>>;
}

/// The external object detector.
pub trait Detector<F>: Send {
    fn detect(&mut self, frame: &F) -> DomainResult<Vec<Detection>>;
}

/// Local sign output; renders whatever artifact it is handed.
pub trait SignDisplay: Send {
    fn show(&mut self, artifact: &Artifact, report: &FrameReport);
}

/// Remote feed. Implementations must return without waiting on the network.
pub trait AdvisoryFeed: Send + Sync {
    fn publish(&self, report: &FrameReport);
}
