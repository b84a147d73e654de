use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::advisory::AdvisoryState;
use super::errors::{DomainError, DomainResult};

/// Identifier of a displayable sign, normally an image path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default sign images. `Busy` and `PedestrianCaution` both show the
/// reduced-speed sign.
pub fn default_artifacts() -> BTreeMap<AdvisoryState, String> {
    BTreeMap::from([
        (AdvisoryState::Normal, "SignsMedia/50.jpg".to_string()),
        (AdvisoryState::Busy, "SignsMedia/30.jpg".to_string()),
        (AdvisoryState::PedestrianCaution, "SignsMedia/30.jpg".to_string()),
        (AdvisoryState::TrafficLightAhead, "SignsMedia/light.jpg".to_string()),
    ])
}

/// Complete, immutable state -> artifact lookup.
///
/// Construction fails unless every [`AdvisoryState`] has a non-blank entry,
/// so [`ArtifactTable::resolve`] can never miss at runtime.
#[derive(Debug, Clone)]
pub struct ArtifactTable {
    entries: BTreeMap<AdvisoryState, Artifact>,
}

impl ArtifactTable {
    pub fn from_entries(entries: &BTreeMap<AdvisoryState, String>) -> DomainResult<Self> {
        let mut table = BTreeMap::new();
        for state in AdvisoryState::ALL {
            let id = entries
                .get(&state)
                .ok_or(DomainError::MissingArtifact(state))?;
            if id.trim().is_empty() {
                return Err(DomainError::InvalidConfig(format!(
                    "artifact for state {} is empty",
                    state
                )));
            }
            table.insert(state, Artifact::new(id.trim()));
        }
        Ok(Self { entries: table })
    }

    /// Checks that every artifact exists on disk.
    pub fn verify_files(&self) -> DomainResult<()> {
        for (state, artifact) in &self.entries {
            if !Path::new(artifact.as_str()).exists() {
                return Err(DomainError::NotFound(format!(
                    "artifact for {} not found: {}",
                    state, artifact
                )));
            }
        }
        Ok(())
    }

    pub fn resolve(&self, state: AdvisoryState) -> &Artifact {
        // Every state is inserted in from_entries.
        &self.entries[&state]
    }
}

impl Default for ArtifactTable {
    fn default() -> Self {
        let entries = default_artifacts()
            .into_iter()
            .map(|(state, id)| (state, Artifact::new(id)))
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_total() {
        let table = ArtifactTable::from_entries(&default_artifacts()).unwrap();
        for state in AdvisoryState::ALL {
            assert!(!table.resolve(state).as_str().is_empty());
        }
        assert_eq!(table.resolve(AdvisoryState::Normal).as_str(), "SignsMedia/50.jpg");
        assert_eq!(
            table.resolve(AdvisoryState::TrafficLightAhead).as_str(),
            "SignsMedia/light.jpg"
        );
    }

    #[test]
    fn busy_and_pedestrian_share_the_reduced_speed_sign() {
        let table = ArtifactTable::default();
        assert_eq!(
            table.resolve(AdvisoryState::Busy),
            table.resolve(AdvisoryState::PedestrianCaution)
        );
    }

    #[test]
    fn incomplete_table_fails_at_construction() {
        let mut entries = default_artifacts();
        entries.remove(&AdvisoryState::PedestrianCaution);

        let err = ArtifactTable::from_entries(&entries).unwrap_err();
        assert!(matches!(
            err,
            DomainError::MissingArtifact(AdvisoryState::PedestrianCaution)
        ));
    }

    #[test]
    fn blank_artifact_is_rejected() {
        let mut entries = default_artifacts();
        entries.insert(AdvisoryState::Busy, "   ".into());
        assert!(matches!(
            ArtifactTable::from_entries(&entries),
            Err(DomainError::InvalidConfig(_))
        ));
    }

    #[test]
    fn verify_files_reports_missing_images() {
        let mut entries = default_artifacts();
        entries.insert(AdvisoryState::Normal, "does/not/exist-50.jpg".into());
        let table = ArtifactTable::from_entries(&entries).unwrap();
        assert!(matches!(table.verify_files(), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn verify_files_accepts_existing_paths() {
        let manifest = env!("CARGO_MANIFEST_DIR");
        let existing = format!("{}/Cargo.toml", manifest);
        let entries = AdvisoryState::ALL
            .into_iter()
            .map(|s| (s, existing.clone()))
            .collect();
        let table = ArtifactTable::from_entries(&entries).unwrap();
        assert!(table.verify_files().is_ok());
    }
}
