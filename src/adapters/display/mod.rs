use tracing::{debug, info};

use crate::application::ports::SignDisplay;
use crate::domain::{artifact::Artifact, stream::FrameReport};

/// Stand-in for the on-screen sign: logs each time the shown artifact
/// changes. Rendering itself is done by whatever watches these events.
#[derive(Debug, Default)]
pub struct LogSignDisplay {
    shown: Option<Artifact>,
    swaps: u64,
}

impl LogSignDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Option<&Artifact> {
        self.shown.as_ref()
    }

    pub fn swaps(&self) -> u64 {
        self.swaps
    }
}

impl SignDisplay for LogSignDisplay {
    fn show(&mut self, artifact: &Artifact, report: &FrameReport) {
        if self.shown.as_ref() == Some(artifact) {
            debug!(frame = report.frame, sign = %artifact, "Sign unchanged");
            return;
        }
        info!(frame = report.frame, state = %report.state, sign = %artifact, "Showing sign");
        self.shown = Some(artifact.clone());
        self.swaps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::advisory::AdvisoryState;
    use crate::domain::counts::FrameCounts;

    fn report(frame: u64, state: AdvisoryState, sign: &str) -> FrameReport {
        FrameReport {
            frame,
            counts: FrameCounts::new(),
            raw_state: state,
            state,
            artifact: Artifact::new(sign),
        }
    }

    #[test]
    fn swaps_only_when_the_image_changes() {
        let mut display = LogSignDisplay::new();
        let steps = [
            report(0, AdvisoryState::Normal, "50.jpg"),
            report(1, AdvisoryState::Busy, "30.jpg"),
            // Same image, different state.
            report(2, AdvisoryState::PedestrianCaution, "30.jpg"),
            report(3, AdvisoryState::Normal, "50.jpg"),
        ];
        for r in &steps {
            display.show(&r.artifact, r);
        }

        assert_eq!(display.swaps(), 3);
        assert_eq!(display.shown().map(|a| a.as_str()), Some("50.jpg"));
    }
}
