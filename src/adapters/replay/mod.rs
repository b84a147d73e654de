//! Recorded detector output, one JSON line per frame.
//!
//! Each line is either an array of detections or an object with a
//! `detections` array:
//!
//! ```text
//! [{"label":"car","confidence":0.91},{"label":"person","confidence":0.55}]
//! {"detections":[{"class_label":"traffic light","confidence":0.7}]}
//! ```
//!
//! An empty line is a frame in which nothing was detected.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::application::ports::{Detector, FrameSource};
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub line_no: u64,
    pub line: String,
}

pub struct JsonLinesSource<R> {
    reader: R,
    line_no: u64,
}

impl<R: BufRead + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0 }
    }
}

impl JsonLinesSource<Box<dyn BufRead + Send>> {
    /// Reads from `path`, or from stdin when no path is given.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let reader: Box<dyn BufRead + Send> = match path {
            Some(p) => {
                let file = File::open(p)
                    .with_context(|| format!("failed to open detections file {}", p.display()))?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(BufReader::new(io::stdin())),
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead + Send> FrameSource for JsonLinesSource<R> {
    type Frame = RecordedFrame;

    fn next_frame(&mut self) -> DomainResult<Option<RecordedFrame>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| DomainError::OperationFailed(format!("reading detections: {e}")))?;
        if read == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(RecordedFrame {
            line_no: self.line_no,
            line: line.trim_end_matches(['\r', '\n']).to_string(),
        }))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordedDetections {
    List(Vec<Detection>),
    Wrapped { detections: Vec<Detection> },
}

/// Detector that replays what was recorded for each frame.
#[derive(Debug, Default)]
pub struct RecordedDetector;

impl Detector<RecordedFrame> for RecordedDetector {
    fn detect(&mut self, frame: &RecordedFrame) -> DomainResult<Vec<Detection>> {
        let text = frame.line.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<RecordedDetections>(text) {
            Ok(RecordedDetections::List(d)) | Ok(RecordedDetections::Wrapped { detections: d }) => Ok(d),
            Err(e) => Err(DomainError::InvalidInput(format!(
                "line {}: malformed detection list: {}",
                frame.line_no, e
            ))),
        }
    }
}
