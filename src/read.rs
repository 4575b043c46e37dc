//! Unified read layer over the three observation levels.
//!
//! Sample, run, and feature observations share one shape ([`crate::observation::Observation`]);
//! the read layer only has to narrow a scan. [`ObservationFilter`] supports
//! any combination of level, entity, and key without materializing rows that
//! do not match.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityCoords, Level};
use crate::observation::Observation;

/// Filter for observation scans.
///
/// An empty filter matches everything. Filters compose: all set criteria must
/// hold.
///
/// # Example
/// ```rust,ignore
/// let filter = ObservationFilter::new()
///     .level(Level::Feature)
///     .key("qc.dqs");
/// let rows = engine.observations(&filter)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationFilter {
    /// Restrict to one level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    /// Restrict to exact entity coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<EntityCoords>,
    /// Restrict to one property key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ObservationFilter {
    /// Creates a match-all filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one level.
    #[must_use]
    pub const fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Restrict to exact entity coordinates. Implies that entity's level.
    #[must_use]
    pub fn entity(mut self, coords: EntityCoords) -> Self {
        self.coords = Some(coords);
        self
    }

    /// Restrict to one property key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Whether an observation passes all set criteria.
    #[must_use]
    pub fn matches(&self, obs: &Observation) -> bool {
        if let Some(level) = self.level {
            if obs.level() != level {
                return false;
            }
        }
        if let Some(coords) = &self.coords {
            if obs.coords != *coords {
                return false;
            }
        }
        if let Some(key) = &self.key {
            if obs.prop_key != *key {
                return false;
            }
        }
        true
    }

    /// Whether no criterion is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.level.is_none() && self.coords.is_none() && self.key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{ObservationId, Provenance};
    use chrono::Utc;

    fn obs(coords: EntityCoords, key: &str) -> Observation {
        Observation {
            id: ObservationId::new(),
            coords,
            prop_key: key.to_string(),
            value: Some(1.0),
            value_text: None,
            unit: None,
            ontology_ref: None,
            provenance: Provenance::new("algo"),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ObservationFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&obs(EntityCoords::sample("S001"), "qc.dqs")));
        assert!(filter.matches(&obs(EntityCoords::feature("S001", "R001", "F0001"), "x.y")));
    }

    #[test]
    fn criteria_compose_conjunctively() {
        let filter = ObservationFilter::new()
            .level(Level::Feature)
            .key("qc.dqs");

        assert!(filter.matches(&obs(EntityCoords::feature("S001", "R001", "F0001"), "qc.dqs")));
        assert!(!filter.matches(&obs(EntityCoords::run("S001", "R001"), "qc.dqs")));
        assert!(!filter.matches(&obs(
            EntityCoords::feature("S001", "R001", "F0001"),
            "peakwidth.fwhm"
        )));
    }

    #[test]
    fn entity_filter_is_exact_not_hierarchical() {
        let filter = ObservationFilter::new().entity(EntityCoords::run("S001", "R001"));
        assert!(filter.matches(&obs(EntityCoords::run("S001", "R001"), "qc.dqs")));
        // A feature under that run is a different entity.
        assert!(!filter.matches(&obs(EntityCoords::feature("S001", "R001", "F0001"), "qc.dqs")));
    }
}
