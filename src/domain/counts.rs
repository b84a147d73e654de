use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::detection::Detection;

/// Per-frame occurrence count of each detected class label.
///
/// Serializes as a flat JSON object, e.g. `{"car": 3, "person": 1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameCounts(BTreeMap<String, u32>);

impl FrameCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `label`, zero when the label was not seen this frame.
    pub fn get(&self, label: &str) -> u32 {
        self.0.get(label).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, label: &str) {
        *self.0.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|&c| c as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human readable form for log lines: `"2 car, 1 person"`.
    pub fn summary(&self) -> String {
        if self.0.is_empty() {
            return "nothing".to_string();
        }
        self.0
            .iter()
            .map(|(label, count)| format!("{} {}", count, label))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for FrameCounts {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(l, c)| (l.into(), c)).collect())
    }
}

/// Reduces a frame's detections to label counts.
///
/// Detections scoring below `min_confidence` are left out; with the default
/// of `0.0` every detection is counted.
pub fn aggregate(detections: &[Detection], min_confidence: f32) -> FrameCounts {
    let mut counts = FrameCounts::new();
    for det in detections {
        if det.confidence < min_confidence {
            continue;
        }
        counts.increment(&det.label);
    }
    counts
}
