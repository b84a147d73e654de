use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::tcp::PublisherConfig;
use crate::domain::{
    advisory::{AdvisoryPolicy, AdvisoryState},
    artifact::{default_artifacts, ArtifactTable},
    errors::{DomainError, DomainResult},
    smoothing::SmoothingConfig,
    stream::FeedFormat,
};

pub const CONFIG_ENV: &str = "SMART_SIGN_CONFIG";

/// Runtime settings. Every field has a default; a JSON file may override
/// any subset, and a few `SMART_SIGN_*` variables override the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Feed listener host
    pub host: String,
    /// Feed listener port
    pub port: u16,
    pub car_busy_threshold: u32,
    pub pedestrian_caution_threshold: u32,
    /// Detections scoring below this are not counted
    pub min_confidence: f32,
    /// Sign shown for each advisory state
    pub artifacts: BTreeMap<AdvisoryState, String>,
    /// Fail startup when an artifact file is missing
    pub verify_artifacts: bool,
    pub send_timeout_ms: u64,
    pub feed_format: FeedFormat,
    /// Minimum time per frame; 0 runs as fast as detections arrive
    pub frame_interval_ms: u64,
    pub smoothing: SmoothingConfig,
    /// Recorded detections (JSON lines); stdin when unset
    pub detections_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let policy = AdvisoryPolicy::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 9999,
            car_busy_threshold: policy.car_busy_threshold,
            pedestrian_caution_threshold: policy.pedestrian_caution_threshold,
            min_confidence: 0.0,
            artifacts: default_artifacts(),
            verify_artifacts: false,
            send_timeout_ms: 50,
            feed_format: FeedFormat::Counts,
            frame_interval_ms: 0,
            smoothing: SmoothingConfig::default(),
            detections_path: None,
        }
    }
}

impl AppConfig {
    /// Loads `path` (if any) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let contents = fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?;
                Self::from_json(&contents)
                    .with_context(|| format!("failed to parse config {}", p.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> DomainResult<()> {
        if let Some(host) = var("SMART_SIGN_HOST") {
            self.host = host;
        }
        if let Some(port) = var("SMART_SIGN_PORT") {
            self.port = port
                .parse()
                .map_err(|_| DomainError::InvalidConfig(format!("SMART_SIGN_PORT is not a port: {}", port)))?;
        }
        if let Some(path) = var("SMART_SIGN_DETECTIONS") {
            self.detections_path = Some(PathBuf::from(path));
        }
        if let Some(format) = var("SMART_SIGN_FEED_FORMAT") {
            self.feed_format = format.parse().map_err(DomainError::InvalidConfig)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.host.trim().is_empty() {
            return Err(DomainError::InvalidConfig("host is empty".into()));
        }
        if self.send_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "send_timeout_ms must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(DomainError::InvalidConfig(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        self.policy()?;
        self.smoothing.validate()?;
        self.artifact_table()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn policy(&self) -> DomainResult<AdvisoryPolicy> {
        AdvisoryPolicy::new(self.car_busy_threshold, self.pedestrian_caution_threshold)
    }

    /// Builds the artifact table, checking files on disk when asked to.
    pub fn artifact_table(&self) -> DomainResult<ArtifactTable> {
        let table = ArtifactTable::from_entries(&self.artifacts)?;
        if self.verify_artifacts {
            table.verify_files()?;
        }
        Ok(table)
    }

    pub fn publisher(&self) -> PublisherConfig {
        PublisherConfig {
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            ..PublisherConfig::default()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
