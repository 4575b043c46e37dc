//! Measurement entity hierarchy: samples, runs, and features.
//!
//! The hierarchy is strict: a `Run` belongs to exactly one `Sample`, a
//! `Feature` to exactly one `Run`. Identifiers are scoped to their parent, so
//! a run id is only unique within its sample and a feature id within its
//! `(sample, run)` pair. [`EntityCoords`] carries the full composite identity
//! of an entity at any level.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Granularity at which a property observation is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Sample,
    Run,
    Feature,
}

impl Level {
    /// Stable lowercase name, matching the wire/`Display` form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::Run => "run",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical classification of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleType {
    /// A regular measurement sample.
    Sample,
    /// A blank (matrix or solvent only).
    Blank,
    /// A calibration or reference standard.
    Standard,
    /// A quality-control sample.
    Qc,
}

/// Root entity of the hierarchy. Never has a parent.
///
/// Immutable once created, except for the free-text description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Globally unique sample identifier.
    pub sample_id: String,
    /// Categorical sample type.
    pub sample_type: SampleType,
    /// Free-text description (the only mutable field).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Sample {
    /// Creates a new sample record.
    #[must_use]
    pub fn new(sample_id: impl Into<String>, sample_type: SampleType) -> Self {
        Self {
            sample_id: sample_id.into(),
            sample_type,
            description: None,
        }
    }

    /// Sets the free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A measurement event on exactly one sample.
///
/// Run identifiers are only unique within their sample's scope; the composite
/// identity is `(sample_id, run_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier, scoped to the owning sample.
    pub run_id: String,
    /// Owning sample identifier.
    pub sample_id: String,
    /// Acquisition timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acq_time_utc: Option<DateTime<Utc>>,
    /// Instrument identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    /// Acquisition method identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    /// Measurement batch identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

impl Run {
    /// Creates a new run record for the given sample.
    #[must_use]
    pub fn new(run_id: impl Into<String>, sample_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            sample_id: sample_id.into(),
            acq_time_utc: None,
            instrument: None,
            method_id: None,
            batch_id: None,
        }
    }

    /// Sets the acquisition timestamp.
    #[must_use]
    pub const fn acquired_at(mut self, time: DateTime<Utc>) -> Self {
        self.acq_time_utc = Some(time);
        self
    }

    /// Sets the instrument identifier.
    #[must_use]
    pub fn instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Sets the acquisition method identifier.
    #[must_use]
    pub fn method(mut self, method_id: impl Into<String>) -> Self {
        self.method_id = Some(method_id.into());
        self
    }

    /// Sets the batch identifier.
    #[must_use]
    pub fn batch(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

/// A detected signal within exactly one run.
///
/// Identity is the triple `(sample_id, run_id, feature_id)`. A feature cannot
/// exist without its parent run existing first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature identifier, scoped to `(sample, run)`.
    pub feature_id: String,
    /// Owning run identifier.
    pub run_id: String,
    /// Owning sample identifier.
    pub sample_id: String,
    /// Centroid mass-to-charge ratio (required).
    pub mz: f64,
    /// Retention time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rt: Option<f64>,
    /// Integrated peak area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
}

impl Feature {
    /// Creates a new feature record with the required centroid position.
    #[must_use]
    pub fn new(
        feature_id: impl Into<String>,
        run_id: impl Into<String>,
        sample_id: impl Into<String>,
        mz: f64,
    ) -> Self {
        Self {
            feature_id: feature_id.into(),
            run_id: run_id.into(),
            sample_id: sample_id.into(),
            mz,
            rt: None,
            area: None,
        }
    }

    /// Sets the retention time.
    #[must_use]
    pub const fn rt(mut self, rt: f64) -> Self {
        self.rt = Some(rt);
        self
    }

    /// Sets the integrated area.
    #[must_use]
    pub const fn area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }
}

/// Full composite identity of an entity at a given level.
///
/// Coarser levels simply have no run/feature component; the accessors return
/// `None` for "not applicable", which is never conflated with "unknown".
///
/// The derived ordering sorts samples before runs before features, then by
/// identifier, which gives resolution and diagnostics a deterministic group
/// order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum EntityCoords {
    Sample {
        sample_id: String,
    },
    Run {
        sample_id: String,
        run_id: String,
    },
    Feature {
        sample_id: String,
        run_id: String,
        feature_id: String,
    },
}

impl EntityCoords {
    /// Sample-level coordinates.
    #[must_use]
    pub fn sample(sample_id: impl Into<String>) -> Self {
        Self::Sample {
            sample_id: sample_id.into(),
        }
    }

    /// Run-level coordinates.
    #[must_use]
    pub fn run(sample_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::Run {
            sample_id: sample_id.into(),
            run_id: run_id.into(),
        }
    }

    /// Feature-level coordinates.
    #[must_use]
    pub fn feature(
        sample_id: impl Into<String>,
        run_id: impl Into<String>,
        feature_id: impl Into<String>,
    ) -> Self {
        Self::Feature {
            sample_id: sample_id.into(),
            run_id: run_id.into(),
            feature_id: feature_id.into(),
        }
    }

    /// The level these coordinates address.
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            Self::Sample { .. } => Level::Sample,
            Self::Run { .. } => Level::Run,
            Self::Feature { .. } => Level::Feature,
        }
    }

    /// Sample identifier (present at every level).
    #[must_use]
    pub fn sample_id(&self) -> &str {
        match self {
            Self::Sample { sample_id }
            | Self::Run { sample_id, .. }
            | Self::Feature { sample_id, .. } => sample_id,
        }
    }

    /// Run identifier, if these coordinates are at run level or finer.
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        match self {
            Self::Sample { .. } => None,
            Self::Run { run_id, .. } | Self::Feature { run_id, .. } => Some(run_id),
        }
    }

    /// Feature identifier, if these coordinates are at feature level.
    #[must_use]
    pub fn feature_id(&self) -> Option<&str> {
        match self {
            Self::Feature { feature_id, .. } => Some(feature_id),
            _ => None,
        }
    }
}

impl fmt::Display for EntityCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample { sample_id } => write!(f, "{sample_id}"),
            Self::Run { sample_id, run_id } => write!(f, "{sample_id}/{run_id}"),
            Self::Feature {
                sample_id,
                run_id,
                feature_id,
            } => write!(f, "{sample_id}/{run_id}/{feature_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_report_level_and_components() {
        let s = EntityCoords::sample("S001");
        assert_eq!(s.level(), Level::Sample);
        assert_eq!(s.sample_id(), "S001");
        assert_eq!(s.run_id(), None);
        assert_eq!(s.feature_id(), None);

        let r = EntityCoords::run("S001", "R001");
        assert_eq!(r.level(), Level::Run);
        assert_eq!(r.run_id(), Some("R001"));
        assert_eq!(r.feature_id(), None);

        let ft = EntityCoords::feature("S001", "R001", "F0001");
        assert_eq!(ft.level(), Level::Feature);
        assert_eq!(ft.sample_id(), "S001");
        assert_eq!(ft.run_id(), Some("R001"));
        assert_eq!(ft.feature_id(), Some("F0001"));
        assert_eq!(format!("{ft}"), "S001/R001/F0001");
    }

    #[test]
    fn coords_ordering_groups_by_level_then_identity() {
        let mut coords = vec![
            EntityCoords::feature("S001", "R001", "F0002"),
            EntityCoords::sample("S002"),
            EntityCoords::run("S001", "R001"),
            EntityCoords::feature("S001", "R001", "F0001"),
            EntityCoords::sample("S001"),
        ];
        coords.sort();
        assert_eq!(coords[0], EntityCoords::sample("S001"));
        assert_eq!(coords[1], EntityCoords::sample("S002"));
        assert_eq!(coords[2], EntityCoords::run("S001", "R001"));
        assert_eq!(coords[3], EntityCoords::feature("S001", "R001", "F0001"));
        assert_eq!(coords[4], EntityCoords::feature("S001", "R001", "F0002"));
    }

    #[test]
    fn level_display_is_lowercase() {
        assert_eq!(Level::Sample.to_string(), "sample");
        assert_eq!(Level::Run.to_string(), "run");
        assert_eq!(Level::Feature.to_string(), "feature");
        assert!(Level::Sample < Level::Run);
        assert!(Level::Run < Level::Feature);
    }

    #[test]
    fn builders_fill_optional_fields() {
        let run = Run::new("R001", "S001")
            .instrument("QTOF-XYZ")
            .method("POS_5min")
            .batch("B01");
        assert_eq!(run.instrument.as_deref(), Some("QTOF-XYZ"));
        assert_eq!(run.batch_id.as_deref(), Some("B01"));

        let feature = Feature::new("F0001", "R001", "S001", 301.123_456)
            .rt(312.4)
            .area(154_321.2);
        assert_eq!(feature.rt, Some(312.4));
        assert_eq!(feature.area, Some(154_321.2));
    }

    #[test]
    fn coords_serde_round_trip_tags_level() {
        let ft = EntityCoords::feature("S001", "R001", "F0001");
        let json = serde_json::to_value(&ft).unwrap();
        assert_eq!(json["level"], "feature");
        let back: EntityCoords = serde_json::from_value(json).unwrap();
        assert_eq!(back, ft);
    }
}
