use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::application::ports::{AdvisoryFeed, Detector, FrameSource, SignDisplay};
use crate::application::services::AdvisoryService;
use crate::domain::{detection::Detection, errors::DomainResult, stream::FrameReport};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub frames: u64,
    pub state_changes: u64,
    pub detector_errors: u64,
    pub interval_overruns: u64,
    pub worst_frame: Duration,
}

/// Synchronous frame loop: detect, evaluate, show, publish.
pub struct Pipeline {
    advisory: AdvisoryService,
    display: Box<dyn SignDisplay>,
    feed: Arc<dyn AdvisoryFeed>,
    frame_interval: Duration,
    last_report: Option<FrameReport>,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        advisory: AdvisoryService,
        display: Box<dyn SignDisplay>,
        feed: Arc<dyn AdvisoryFeed>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            advisory,
            display,
            feed,
            frame_interval,
            last_report: None,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }

    /// Runs one frame's detections through the advisory chain and hands the
    /// result to the display and the feed.
    pub fn process(&mut self, detections: &[Detection]) -> &FrameReport {
        let report = self.advisory.evaluate(detections);

        let changed = self
            .last_report
            .as_ref()
            .map_or(true, |prev| prev.state != report.state);
        if changed {
            self.stats.state_changes += 1;
            info!(
                frame = report.frame,
                state = %report.state,
                artifact = %report.artifact,
                "Advisory changed ({})",
                report.counts.summary()
            );
        } else {
            debug!(
                frame = report.frame,
                state = %report.state,
                objects = report.counts.total(),
                "Detected objects: {}",
                report.counts.summary()
            );
        }

        self.display.show(&report.artifact, &report);
        self.feed.publish(&report);

        self.stats.frames += 1;
        self.last_report.insert(report)
    }

    /// Loops until the source runs dry or `stop` is raised.
    ///
    /// A detector failure only costs that frame: it is logged and evaluated
    /// as a frame without detections. Source failures end the loop.
    pub fn run<S, D>(&mut self, source: &mut S, detector: &mut D, stop: &AtomicBool) -> DomainResult<PipelineStats>
    where
        S: FrameSource,
        D: Detector<S::Frame>,
    {
        info!("Pipeline: frame loop started");

        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();

            let Some(frame) = source.next_frame()? else {
                info!("Pipeline: frame source exhausted");
                break;
            };

            let detections = match detector.detect(&frame) {
                Ok(d) => d,
                Err(e) => {
                    self.stats.detector_errors += 1;
                    warn!(frame = self.stats.frames, "Detector failed, treating frame as empty: {}", e);
                    Vec::new()
                }
            };

            self.process(&detections);

            let elapsed = cycle_start.elapsed();
            if elapsed > self.stats.worst_frame {
                self.stats.worst_frame = elapsed;
            }
            if !self.frame_interval.is_zero() {
                if elapsed < self.frame_interval {
                    std::thread::sleep(self.frame_interval - elapsed);
                } else {
                    self.stats.interval_overruns += 1;
                }
            }
        }

        info!(
            frames = self.stats.frames,
            state_changes = self.stats.state_changes,
            detector_errors = self.stats.detector_errors,
            interval_overruns = self.stats.interval_overruns,
            worst_frame_ms = self.stats.worst_frame.as_secs_f32() * 1000.0,
            "Pipeline: frame loop finished"
        );
        Ok(self.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        advisory::{AdvisoryPolicy, AdvisoryState},
        artifact::{Artifact, ArtifactTable},
        errors::DomainError,
        smoothing::SmoothingConfig,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct VecSource(VecDeque<Result<Vec<&'static str>, ()>>);

    impl FrameSource for VecSource {
        type Frame = Result<Vec<&'static str>, ()>;

        fn next_frame(&mut self) -> DomainResult<Option<Self::Frame>> {
            Ok(self.0.pop_front())
        }
    }

    struct LabelDetector;

    impl Detector<Result<Vec<&'static str>, ()>> for LabelDetector {
        fn detect(&mut self, frame: &Result<Vec<&'static str>, ()>) -> DomainResult<Vec<Detection>> {
            match frame {
                Ok(labels) => Ok(labels.iter().map(|l| Detection::new(*l, 0.9)).collect()),
                Err(()) => Err(DomainError::InvalidInput("corrupt frame".into())),
            }
        }
    }

    struct FailingSource;

    impl FrameSource for FailingSource {
        type Frame = ();

        fn next_frame(&mut self) -> DomainResult<Option<()>> {
            Err(DomainError::OperationFailed("camera unplugged".into()))
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Artifact, AdvisoryState)>>>);

    impl SignDisplay for Recorder {
        fn show(&mut self, artifact: &Artifact, report: &FrameReport) {
            self.0.lock().unwrap().push((artifact.clone(), report.state));
        }
    }

    impl AdvisoryFeed for Recorder {
        fn publish(&self, report: &FrameReport) {
            self.0.lock().unwrap().push((report.artifact.clone(), report.state));
        }
    }

    fn pipeline(display: Recorder, feed: Recorder) -> Pipeline {
        let advisory = AdvisoryService::new(
            AdvisoryPolicy::default(),
            ArtifactTable::default(),
            SmoothingConfig::default(),
            0.0,
        )
        .unwrap();
        Pipeline::new(advisory, Box::new(display), Arc::new(feed), Duration::ZERO)
    }

    #[test]
    fn every_frame_reaches_display_and_feed() {
        let display = Recorder::default();
        let feed = Recorder::default();
        let mut pipeline = pipeline(display.clone(), feed.clone());

        let mut source = VecSource(VecDeque::from([
            Ok(vec![]),
            Ok(vec!["person", "person", "person"]),
            Ok(vec!["traffic light", "car"]),
        ]));
        let stats = pipeline
            .run(&mut source, &mut LabelDetector, &AtomicBool::new(false))
            .unwrap();

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.state_changes, 3);

        let shown: Vec<_> = display.0.lock().unwrap().iter().map(|(_, s)| *s).collect();
        assert_eq!(
            shown,
            vec![
                AdvisoryState::Normal,
                AdvisoryState::PedestrianCaution,
                AdvisoryState::TrafficLightAhead
            ]
        );
        assert_eq!(*display.0.lock().unwrap(), *feed.0.lock().unwrap());
    }

    #[test]
    fn detector_error_is_contained() {
        let display = Recorder::default();
        let mut pipeline = pipeline(display.clone(), Recorder::default());

        let mut source = VecSource(VecDeque::from([Err(()), Ok(vec!["car"; 6])]));
        let stats = pipeline
            .run(&mut source, &mut LabelDetector, &AtomicBool::new(false))
            .unwrap();

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.detector_errors, 1);
        let shown = display.0.lock().unwrap();
        assert_eq!(shown[0].1, AdvisoryState::Normal);
        assert_eq!(shown[1].1, AdvisoryState::Busy);
    }

    #[test]
    fn stop_flag_prevents_further_frames() {
        let mut pipeline = pipeline(Recorder::default(), Recorder::default());
        let mut source = VecSource(VecDeque::from([Ok(vec!["car"])]));

        let stats = pipeline
            .run(&mut source, &mut LabelDetector, &AtomicBool::new(true))
            .unwrap();
        assert_eq!(stats.frames, 0);
    }

    #[test]
    fn source_error_is_returned() {
        struct NoopDetector;
        impl Detector<()> for NoopDetector {
            fn detect(&mut self, _: &()) -> DomainResult<Vec<Detection>> {
                Ok(Vec::new())
            }
        }

        let mut pipeline = pipeline(Recorder::default(), Recorder::default());
        let res = pipeline.run(&mut FailingSource, &mut NoopDetector, &AtomicBool::new(false));
        assert!(matches!(res, Err(DomainError::OperationFailed(_))));
    }

    #[test]
    fn slow_frames_count_as_overruns() {
        struct SlowDetector;
        impl Detector<Result<Vec<&'static str>, ()>> for SlowDetector {
            fn detect(&mut self, _: &Result<Vec<&'static str>, ()>) -> DomainResult<Vec<Detection>> {
                std::thread::sleep(Duration::from_millis(10));
                Ok(Vec::new())
            }
        }

        let mut pipeline = pipeline(Recorder::default(), Recorder::default());
        pipeline.frame_interval = Duration::from_millis(1);
        let mut source = VecSource(VecDeque::from([Ok(vec![]), Ok(vec![])]));

        let stats = pipeline
            .run(&mut source, &mut SlowDetector, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(stats.interval_overruns, 2);
        assert!(stats.worst_frame >= Duration::from_millis(10));
    }

    #[test]
    fn repeated_state_is_not_a_change() {
        let mut pipeline = pipeline(Recorder::default(), Recorder::default());
        pipeline.process(&[]);
        pipeline.process(&[Detection::new("dog", 0.7)]);

        assert_eq!(pipeline.stats().frames, 2);
        assert_eq!(pipeline.stats().state_changes, 1);
        assert_eq!(pipeline.last_report().map(|r| r.frame), Some(1));
    }
}
