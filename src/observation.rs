//! Provenance-tagged property observations.
//!
//! An [`Observation`] is one algorithm's reported value for one property key
//! on one entity. Competing observations from independent algorithms coexist;
//! the identity under which last-write-wins applies is
//! `(entity coordinates, property key, algorithm id)`, deliberately *not*
//! including the algorithm version, so a re-submission under the same
//! algorithm id replaces the prior row.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{EntityCoords, Level};
use crate::error::ObservationError;

/// Unique identifier of an accepted observation row.
///
/// A fresh id is minted on every accepted write, including overwrites, so a
/// resolved value's traceability pointer names the exact row it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationId(Uuid);

impl ObservationId {
    /// Creates a new random observation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provenance of an observation: which algorithm produced it, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Algorithm identifier, e.g. `qAlgorithms`. Part of the observation
    /// identity.
    pub algo_id: String,
    /// Algorithm version. Not part of the identity: a new version under the
    /// same id overwrites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algo_version: Option<String>,
    /// Free-form parameter record the algorithm ran with.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Provenance {
    /// Creates provenance for an algorithm id.
    #[must_use]
    pub fn new(algo_id: impl Into<String>) -> Self {
        Self {
            algo_id: algo_id.into(),
            algo_version: None,
            params: serde_json::Value::Null,
        }
    }

    /// Sets the algorithm version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.algo_version = Some(version.into());
        self
    }

    /// Sets the parameter record.
    #[must_use]
    pub fn params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// One algorithm's reported value for one property on one entity.
///
/// `created_utc` is stamped by the observation store at acceptance time, never
/// supplied by the caller; resolution ordering is driven by store-assigned
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Traceability id of this accepted row.
    pub id: ObservationId,
    /// Entity coordinates (carry the level tag).
    pub coords: EntityCoords,
    /// Canonical property key.
    pub prop_key: String,
    /// Numeric value, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Text value, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,
    /// Unit code actually reported (opaque, carried through unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Ontology reference actually used (opaque, carried through unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_ref: Option<String>,
    /// Algorithm provenance.
    pub provenance: Provenance,
    /// Store-assigned acceptance timestamp.
    pub created_utc: DateTime<Utc>,
}

impl Observation {
    /// The level this observation was recorded at.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.coords.level()
    }

    /// The algorithm id this observation belongs to.
    #[must_use]
    pub fn algo_id(&self) -> &str {
        &self.provenance.algo_id
    }
}

/// A validated, not-yet-accepted observation.
///
/// Built via [`ObservationDraft::builder`]; the build step checks that the
/// supplied coordinates match the declared level tag, so a draft always
/// carries structurally consistent coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationDraft {
    /// Entity coordinates.
    pub coords: EntityCoords,
    /// Canonical property key.
    pub prop_key: String,
    /// Numeric value.
    pub value: Option<f64>,
    /// Text value.
    pub value_text: Option<String>,
    /// Reported unit code.
    pub unit: Option<String>,
    /// Reported ontology reference.
    pub ontology_ref: Option<String>,
    /// Algorithm provenance.
    pub provenance: Provenance,
}

impl ObservationDraft {
    /// Starts a draft for the given level and property key.
    #[must_use]
    pub fn builder(level: Level, prop_key: impl Into<String>) -> ObservationDraftBuilder {
        ObservationDraftBuilder {
            level,
            prop_key: prop_key.into(),
            sample_id: None,
            run_id: None,
            feature_id: None,
            value: None,
            value_text: None,
            unit: None,
            ontology_ref: None,
            provenance: None,
        }
    }
}

/// Fluent builder for [`ObservationDraft`].
#[derive(Debug, Clone)]
pub struct ObservationDraftBuilder {
    level: Level,
    prop_key: String,
    sample_id: Option<String>,
    run_id: Option<String>,
    feature_id: Option<String>,
    value: Option<f64>,
    value_text: Option<String>,
    unit: Option<String>,
    ontology_ref: Option<String>,
    provenance: Option<Provenance>,
}

impl ObservationDraftBuilder {
    /// Sample identifier (required at every level).
    #[must_use]
    pub fn sample(mut self, sample_id: impl Into<String>) -> Self {
        self.sample_id = Some(sample_id.into());
        self
    }

    /// Run identifier (required at run level and finer).
    #[must_use]
    pub fn run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Feature identifier (required at feature level).
    #[must_use]
    pub fn feature(mut self, feature_id: impl Into<String>) -> Self {
        self.feature_id = Some(feature_id.into());
        self
    }

    /// Numeric value.
    #[must_use]
    pub const fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Text value.
    #[must_use]
    pub fn value_text(mut self, value_text: impl Into<String>) -> Self {
        self.value_text = Some(value_text.into());
        self
    }

    /// Reported unit code.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Reported ontology reference.
    #[must_use]
    pub fn ontology_ref(mut self, ontology_ref: impl Into<String>) -> Self {
        self.ontology_ref = Some(ontology_ref.into());
        self
    }

    /// Algorithm provenance (required).
    #[must_use]
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Shorthand for provenance with just an algorithm id.
    #[must_use]
    pub fn algo(self, algo_id: impl Into<String>) -> Self {
        self.provenance(Provenance::new(algo_id))
    }

    /// Builds the draft, checking coordinates against the level tag.
    ///
    /// # Errors
    /// `LevelMismatch` when a coordinate required by the level is missing or a
    /// coordinate beyond the level is supplied.
    pub fn build(self) -> Result<ObservationDraft, ObservationError> {
        let mismatch = |reason: &str| ObservationError::LevelMismatch {
            level: self.level,
            reason: reason.to_string(),
        };

        let Some(sample_id) = self.sample_id.clone() else {
            return Err(mismatch("sample id is required"));
        };

        let coords = match self.level {
            Level::Sample => {
                if self.run_id.is_some() || self.feature_id.is_some() {
                    return Err(mismatch("sample-level call must not carry run/feature ids"));
                }
                EntityCoords::sample(sample_id)
            }
            Level::Run => {
                if self.feature_id.is_some() {
                    return Err(mismatch("run-level call must not carry a feature id"));
                }
                let Some(run_id) = self.run_id.clone() else {
                    return Err(mismatch("run id is required"));
                };
                EntityCoords::run(sample_id, run_id)
            }
            Level::Feature => {
                let Some(run_id) = self.run_id.clone() else {
                    return Err(mismatch("run id is required"));
                };
                let Some(feature_id) = self.feature_id.clone() else {
                    return Err(mismatch("feature id is required"));
                };
                EntityCoords::feature(sample_id, run_id, feature_id)
            }
        };

        let Some(provenance) = self.provenance else {
            return Err(ObservationError::MissingField {
                field: "provenance.algo_id".to_string(),
            });
        };

        Ok(ObservationDraft {
            coords,
            prop_key: self.prop_key,
            value: self.value,
            value_text: self.value_text,
            unit: self.unit,
            ontology_ref: self.ontology_ref,
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feature_draft_builds_full_coordinates() {
        let draft = ObservationDraft::builder(Level::Feature, "qc.dqs")
            .sample("S001")
            .run("R001")
            .feature("F0001")
            .value(0.87)
            .unit("UO:0000000")
            .provenance(
                Provenance::new("qAlgorithms")
                    .version("1.2.0")
                    .params(json!({ "smoothing": 3 })),
            )
            .build()
            .unwrap();

        assert_eq!(draft.coords, EntityCoords::feature("S001", "R001", "F0001"));
        assert_eq!(draft.coords.level(), Level::Feature);
        assert_eq!(draft.value, Some(0.87));
        assert_eq!(draft.provenance.algo_version.as_deref(), Some("1.2.0"));
    }

    #[test]
    fn feature_draft_without_feature_id_is_level_mismatch() {
        let err = ObservationDraft::builder(Level::Feature, "qc.dqs")
            .sample("S001")
            .run("R001")
            .algo("qAlgorithms")
            .build()
            .unwrap_err();
        assert!(matches!(err, ObservationError::LevelMismatch { level, .. } if level == Level::Feature));
    }

    #[test]
    fn sample_draft_with_run_id_is_level_mismatch() {
        let err = ObservationDraft::builder(Level::Sample, "qc.dqs")
            .sample("S001")
            .run("R001")
            .algo("qAlgorithms")
            .build()
            .unwrap_err();
        assert!(matches!(err, ObservationError::LevelMismatch { level, .. } if level == Level::Sample));
    }

    #[test]
    fn run_draft_requires_run_id_and_no_feature_id() {
        assert!(ObservationDraft::builder(Level::Run, "qc.dqs")
            .sample("S001")
            .algo("a")
            .build()
            .is_err());

        assert!(ObservationDraft::builder(Level::Run, "qc.dqs")
            .sample("S001")
            .run("R001")
            .feature("F0001")
            .algo("a")
            .build()
            .is_err());

        let draft = ObservationDraft::builder(Level::Run, "qc.dqs")
            .sample("S001")
            .run("R001")
            .algo("a")
            .build()
            .unwrap();
        assert_eq!(draft.coords, EntityCoords::run("S001", "R001"));
    }

    #[test]
    fn draft_requires_provenance() {
        let err = ObservationDraft::builder(Level::Sample, "qc.dqs")
            .sample("S001")
            .build()
            .unwrap_err();
        assert!(matches!(err, ObservationError::MissingField { .. }));
    }

    #[test]
    fn observation_serde_skips_absent_fields() {
        let obs = Observation {
            id: ObservationId::new(),
            coords: EntityCoords::sample("S001"),
            prop_key: "qc.dqs".to_string(),
            value: Some(0.9),
            value_text: None,
            unit: None,
            ontology_ref: None,
            provenance: Provenance::new("qAlgorithms"),
            created_utc: Utc::now(),
        };
        let json = serde_json::to_value(&obs).unwrap();
        assert!(json.get("value_text").is_none());
        assert_eq!(json["prop_key"], "qc.dqs");
        let back: Observation = serde_json::from_value(json).unwrap();
        assert_eq!(back, obs);
    }
}
