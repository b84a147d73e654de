use crate::domain::{
    advisory::AdvisoryPolicy,
    artifact::ArtifactTable,
    counts::aggregate,
    detection::Detection,
    errors::{DomainError, DomainResult},
    smoothing::{AdvisorySmoother, SmoothingConfig},
    stream::FrameReport,
};

/// Turns one frame's detections into a [`FrameReport`]:
/// aggregate, decide, smooth, resolve.
pub struct AdvisoryService {
    policy: AdvisoryPolicy,
    artifacts: ArtifactTable,
    smoother: AdvisorySmoother,
    min_confidence: f32,
    next_frame: u64,
}

impl AdvisoryService {
    pub fn new(
        policy: AdvisoryPolicy,
        artifacts: ArtifactTable,
        smoothing: SmoothingConfig,
        min_confidence: f32,
    ) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(DomainError::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                min_confidence
            )));
        }
        Ok(Self {
            policy,
            artifacts,
            smoother: AdvisorySmoother::new(smoothing)?,
            min_confidence,
            next_frame: 0,
        })
    }

    pub fn evaluate(&mut self, detections: &[Detection]) -> FrameReport {
        let counts = aggregate(detections, self.min_confidence);
        let raw_state = self.policy.decide(&counts);
        let state = self.smoother.smooth(raw_state);
        let artifact = self.artifacts.resolve(state).clone();

        let frame = self.next_frame;
        self.next_frame += 1;

        FrameReport {
            frame,
            counts,
            raw_state,
            state,
            artifact,
        }
    }
}
