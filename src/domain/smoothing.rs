use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::advisory::AdvisoryState;
use super::errors::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of recent frames considered (M).
    pub window: usize,
    /// Frames within the window a new state needs before it is shown (N).
    /// It must also outvote the state currently shown.
    pub min_votes: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        // 1-of-1: every frame decides on its own.
        Self {
            window: 1,
            min_votes: 1,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.window == 0 {
            return Err(DomainError::InvalidConfig(
                "smoothing.window must be at least 1".into(),
            ));
        }
        if self.min_votes == 0 || self.min_votes > self.window {
            return Err(DomainError::InvalidConfig(format!(
                "smoothing.min_votes must be within 1..={}, got {}",
                self.window, self.min_votes
            )));
        }
        Ok(())
    }
}

/// N-of-M hysteresis over the per-frame advisory.
///
/// The shown state only changes once another state holds a strict majority
/// over it in the window and at least `min_votes` frames.
pub struct AdvisorySmoother {
    history: VecDeque<AdvisoryState>,
    config: SmoothingConfig,
    current: Option<AdvisoryState>,
}

impl AdvisorySmoother {
    pub fn new(config: SmoothingConfig) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            history: VecDeque::with_capacity(config.window),
            config,
            current: None,
        })
    }

    pub fn smooth(&mut self, raw: AdvisoryState) -> AdvisoryState {
        self.history.push_back(raw);
        if self.history.len() > self.config.window {
            self.history.pop_front();
        }

        let current = match self.current {
            Some(current) => current,
            None => {
                self.current = Some(raw);
                return raw;
            }
        };

        let held = self.votes(current);
        let (best, best_votes) = AdvisoryState::ALL
            .into_iter()
            .map(|s| (s, self.votes(s)))
            .max_by_key(|&(_, v)| v)
            .unwrap_or((current, held));

        if best != current && best_votes > held && best_votes >= self.config.min_votes {
            self.current = Some(best);
            best
        } else {
            current
        }
    }

    fn votes(&self, state: AdvisoryState) -> usize {
        self.history.iter().filter(|&&s| s == state).count()
    }
}
