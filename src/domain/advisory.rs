use serde::{Deserialize, Serialize};
use std::fmt;

use super::counts::FrameCounts;
use super::errors::{DomainError, DomainResult};

pub const TRAFFIC_LIGHT_LABEL: &str = "traffic light";
pub const CAR_LABEL: &str = "car";
pub const PERSON_LABEL: &str = "person";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryState {
    Normal,
    Busy,
    PedestrianCaution,
    TrafficLightAhead,
}

impl AdvisoryState {
    pub const ALL: [AdvisoryState; 4] = [
        AdvisoryState::Normal,
        AdvisoryState::Busy,
        AdvisoryState::PedestrianCaution,
        AdvisoryState::TrafficLightAhead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryState::Normal => "normal",
            AdvisoryState::Busy => "busy",
            AdvisoryState::PedestrianCaution => "pedestrian_caution",
            AdvisoryState::TrafficLightAhead => "traffic_light_ahead",
        }
    }
}

impl fmt::Display for AdvisoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-priority rules turning one frame's counts into an advisory.
///
/// Evaluation order, first match wins:
/// 1. any traffic light -> `TrafficLightAhead`
/// 2. cars >= `car_busy_threshold` -> `Busy`
/// 3. persons >= `pedestrian_caution_threshold` -> `PedestrianCaution`
/// 4. otherwise `Normal`
///
/// The policy holds no memory of earlier frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryPolicy {
    pub car_busy_threshold: u32,
    pub pedestrian_caution_threshold: u32,
}

impl Default for AdvisoryPolicy {
    fn default() -> Self {
        Self {
            car_busy_threshold: 5,
            pedestrian_caution_threshold: 3,
        }
    }
}

impl AdvisoryPolicy {
    pub fn new(car_busy_threshold: u32, pedestrian_caution_threshold: u32) -> DomainResult<Self> {
        // A zero threshold would fire on every frame, including empty ones.
        if car_busy_threshold == 0 {
            return Err(DomainError::InvalidConfig(
                "car_busy_threshold must be at least 1".into(),
            ));
        }
        if pedestrian_caution_threshold == 0 {
            return Err(DomainError::InvalidConfig(
                "pedestrian_caution_threshold must be at least 1".into(),
            ));
        }
        Ok(Self {
            car_busy_threshold,
            pedestrian_caution_threshold,
        })
    }

    pub fn decide(&self, counts: &FrameCounts) -> AdvisoryState {
        if counts.get(TRAFFIC_LIGHT_LABEL) > 0 {
            AdvisoryState::TrafficLightAhead
        } else if counts.get(CAR_LABEL) >= self.car_busy_threshold {
            AdvisoryState::Busy
        } else if counts.get(PERSON_LABEL) >= self.pedestrian_caution_threshold {
            AdvisoryState::PedestrianCaution
        } else {
            AdvisoryState::Normal
        }
    }
}
