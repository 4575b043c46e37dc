//! Consistency diagnostics over the observation set.
//!
//! The only structural check today is the orphan-uncertainty scan: an
//! uncertainty observation whose declared base property has no observation on
//! the same entity is structurally incomplete: the uncertainty quantifies a
//! value nobody reported. The scan is advisory: it never mutates state and
//! never blocks writes.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::entity::{EntityCoords, Level};
use crate::observation::Observation;
use crate::vocab::PropertyDictionary;

/// One structurally incomplete uncertainty observation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrphanUncertainty {
    /// Entity coordinates the uncertainty was recorded at.
    pub coords: EntityCoords,
    /// The uncertainty property key.
    pub uncertainty_key: String,
    /// The declared base key with no observation on this entity.
    pub missing_base_key: String,
}

impl OrphanUncertainty {
    /// The level of the affected entity.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.coords.level()
    }
}

/// Finds uncertainty observations whose base property is absent on the same
/// entity.
///
/// The check is level-scoped: it looks only at the exact coordinates of the
/// uncertainty observation, never at parents or children. Any algorithm's
/// observation of the base key satisfies the check. Results are deduplicated
/// per `(entity, uncertainty key)` and deterministically ordered.
#[must_use]
pub fn find_orphan_uncertainties(
    dictionary: &PropertyDictionary,
    observations: &[Observation],
) -> Vec<OrphanUncertainty> {
    let present: HashSet<(&EntityCoords, &str)> = observations
        .iter()
        .map(|obs| (&obs.coords, obs.prop_key.as_str()))
        .collect();

    let mut orphans: BTreeSet<OrphanUncertainty> = BTreeSet::new();
    for obs in observations {
        let Some(def) = dictionary.resolve(&obs.prop_key) else {
            // Undefined keys cannot be classified; record_observation rejects
            // them, so a missing definition here means the dictionary lost a
            // key after the write. Not this scan's problem.
            continue;
        };
        if !def.is_uncertainty() {
            continue;
        }
        let Some(base_key) = def.base_key else {
            continue;
        };

        if !present.contains(&(&obs.coords, base_key.as_str())) {
            orphans.insert(OrphanUncertainty {
                coords: obs.coords.clone(),
                uncertainty_key: obs.prop_key.clone(),
                missing_base_key: base_key,
            });
        }
    }

    orphans.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::observation::{ObservationId, Provenance};
    use crate::vocab::{PropertyDefinition, UNCERTAINTY_PREFIX};

    fn dictionary() -> PropertyDictionary {
        let dict = PropertyDictionary::new();
        dict.register_prefix("qc", "Quality control", None).unwrap();
        dict.register_prefix(UNCERTAINTY_PREFIX, "Uncertainty", None)
            .unwrap();
        dict.define_property(PropertyDefinition::new("qc.dqs", "Data quality score"))
            .unwrap();
        dict.define_property(
            PropertyDefinition::new("uncertainty.qc.dqs", "DQS uncertainty").base_key("qc.dqs"),
        )
        .unwrap();
        dict
    }

    fn obs(coords: EntityCoords, key: &str, algo: &str) -> Observation {
        Observation {
            id: ObservationId::new(),
            coords,
            prop_key: key.to_string(),
            value: Some(0.05),
            value_text: None,
            unit: None,
            ontology_ref: None,
            provenance: Provenance::new(algo),
            created_utc: Utc::now(),
        }
    }

    fn f0001() -> EntityCoords {
        EntityCoords::feature("S001", "R001", "F0001")
    }

    #[test]
    fn uncertainty_without_base_is_reported_once() {
        let dict = dictionary();
        let rows = vec![
            obs(f0001(), "uncertainty.qc.dqs", "qAlgorithms"),
            // A second algorithm reporting the same orphan does not duplicate
            // the diagnostic.
            obs(f0001(), "uncertainty.qc.dqs", "VendorX"),
        ];

        let orphans = find_orphan_uncertainties(&dict, &rows);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].level(), Level::Feature);
        assert_eq!(orphans[0].coords, f0001());
        assert_eq!(orphans[0].uncertainty_key, "uncertainty.qc.dqs");
        assert_eq!(orphans[0].missing_base_key, "qc.dqs");
    }

    #[test]
    fn base_from_any_algorithm_clears_the_orphan() {
        let dict = dictionary();
        let rows = vec![
            obs(f0001(), "uncertainty.qc.dqs", "qAlgorithms"),
            obs(f0001(), "qc.dqs", "VendorX"),
        ];

        assert!(find_orphan_uncertainties(&dict, &rows).is_empty());
    }

    #[test]
    fn check_is_level_scoped_to_exact_coordinates() {
        let dict = dictionary();
        // Base exists on the parent run, not on the feature: still an orphan.
        let rows = vec![
            obs(f0001(), "uncertainty.qc.dqs", "qAlgorithms"),
            obs(EntityCoords::run("S001", "R001"), "qc.dqs", "qAlgorithms"),
        ];

        let orphans = find_orphan_uncertainties(&dict, &rows);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].coords, f0001());
    }

    #[test]
    fn non_uncertainty_observations_are_ignored() {
        let dict = dictionary();
        let rows = vec![obs(f0001(), "qc.dqs", "qAlgorithms")];
        assert!(find_orphan_uncertainties(&dict, &rows).is_empty());
    }

    #[test]
    fn orphans_are_deterministically_ordered() {
        let dict = dictionary();
        let rows = vec![
            obs(
                EntityCoords::feature("S001", "R001", "F0002"),
                "uncertainty.qc.dqs",
                "a",
            ),
            obs(f0001(), "uncertainty.qc.dqs", "a"),
        ];

        let orphans = find_orphan_uncertainties(&dict, &rows);
        assert_eq!(orphans.len(), 2);
        assert!(orphans[0].coords < orphans[1].coords);
    }
}
