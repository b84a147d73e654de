use serde::{Deserialize, Serialize};

use super::advisory::AdvisoryState;
use super::artifact::Artifact;
use super::counts::FrameCounts;

/// Everything decided about one frame, handed on to display and feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: u64,
    pub counts: FrameCounts,
    /// Output of the policy before smoothing.
    pub raw_state: AdvisoryState,
    pub state: AdvisoryState,
    pub artifact: Artifact,
}

/// Payload shape pushed to the subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    /// Bare label -> count object, e.g. `{"car":3}`.
    #[default]
    Counts,
    /// Frame number, state, artifact and counts.
    Advisory,
}

impl std::str::FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counts" => Ok(FeedFormat::Counts),
            "advisory" => Ok(FeedFormat::Advisory),
            other => Err(format!("unknown feed format: {}", other)),
        }
    }
}

#[derive(Debug, Serialize)]
struct AdvisoryMessage<'a> {
    frame: u64,
    state: AdvisoryState,
    artifact: &'a Artifact,
    counts: &'a FrameCounts,
}

/// Encodes one newline-terminated JSON message.
pub fn encode_message(report: &FrameReport, format: FeedFormat) -> serde_json::Result<Vec<u8>> {
    let mut buf = match format {
        FeedFormat::Counts => serde_json::to_vec(&report.counts)?,
        FeedFormat::Advisory => serde_json::to_vec(&AdvisoryMessage {
            frame: report.frame,
            state: report.state,
            artifact: &report.artifact,
            counts: &report.counts,
        })?,
    };
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn report() -> FrameReport {
        FrameReport {
            frame: 7,
            counts: [("car", 3)].into_iter().collect(),
            raw_state: AdvisoryState::Normal,
            state: AdvisoryState::Normal,
            artifact: Artifact::new("SignsMedia/50.jpg"),
        }
    }

    #[test]
    fn counts_message_parses_back_to_same_map() {
        let msg = encode_message(&report(), FeedFormat::Counts).unwrap();
        assert_eq!(msg.last(), Some(&b'\n'));
        assert_eq!(msg.iter().filter(|&&b| b == b'\n').count(), 1);

        let parsed: HashMap<String, u32> = serde_json::from_slice(&msg).unwrap();
        assert_eq!(parsed, HashMap::from([("car".to_string(), 3)]));
    }

    #[test]
    fn advisory_message_carries_state_and_artifact() {
        let msg = encode_message(&report(), FeedFormat::Advisory).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&msg).unwrap();

        assert_eq!(value["frame"], 7);
        assert_eq!(value["state"], "normal");
        assert_eq!(value["artifact"], "SignsMedia/50.jpg");
        assert_eq!(value["counts"]["car"], 3);
    }

    #[test]
    fn feed_format_from_str() {
        assert_eq!("Advisory".parse::<FeedFormat>().unwrap(), FeedFormat::Advisory);
        assert_eq!(" counts ".parse::<FeedFormat>().unwrap(), FeedFormat::Counts);
        assert!("xml".parse::<FeedFormat>().is_err());
    }
}
