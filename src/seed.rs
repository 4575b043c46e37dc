//! Minimal starter vocabulary.
//!
//! Seeds the namespace prefixes and property definitions a fresh deployment
//! needs before any observations can be recorded. Every entry is an
//! idempotent upsert, so re-seeding an already seeded dictionary is a no-op.

use crate::error::PintsResult;
use crate::vocab::{PropertyDefinition, PropertyDictionary, UNCERTAINTY_PREFIX};

/// Logical schema name recorded by hosts that persist engine state.
pub const SCHEMA_NAME: &str = "pints_schema";
/// Version of the entity/observation data model.
pub const SCHEMA_VERSION: &str = "1";
/// Logical name of the seeded dictionary.
pub const VOCAB_NAME: &str = "pints_dictionary";
/// Version of the seeded dictionary contents.
pub const VOCAB_VERSION: &str = "1";

/// Seeds the minimal PSI-MS/UO-linked dictionary.
///
/// Base properties are defined before their uncertainty counterparts so the
/// dictionary's base-key check holds at every intermediate step.
pub fn seed_minimal_vocab(dictionary: &PropertyDictionary) -> PintsResult<()> {
    dictionary.register_prefix(
        "qc",
        "Quality control",
        Some("Per-entity data quality metrics".to_string()),
    )?;
    dictionary.register_prefix(
        "peakwidth",
        "Peak width",
        Some("Chromatographic peak shape descriptors".to_string()),
    )?;
    dictionary.register_prefix(
        "area",
        "Peak area",
        Some("Integrated signal abundance".to_string()),
    )?;
    dictionary.register_prefix(
        UNCERTAINTY_PREFIX,
        "Uncertainty",
        Some("Uncertainty values attached to base properties".to_string()),
    )?;

    dictionary.define_property(
        PropertyDefinition::new("qc.dqs", "Data quality score")
            .ontology_ref("http://example.org/nts#dqsFeature")
            .unit("UO:0000186"),
    )?;
    dictionary.define_property(
        PropertyDefinition::new("qc.snr", "Signal-to-noise ratio").unit("UO:0000186"),
    )?;
    dictionary.define_property(
        PropertyDefinition::new("peakwidth.fwhm", "Full width at half maximum")
            .ontology_ref("MS:1000086")
            .unit("UO:0000010"),
    )?;
    dictionary.define_property(
        PropertyDefinition::new("area.integrated", "Integrated peak area").unit("UO:0000186"),
    )?;

    dictionary.define_property(
        PropertyDefinition::new("uncertainty.qc.dqs", "Absolute uncertainty of qc.dqs")
            .base_key("qc.dqs")
            .unit("UO:0000186"),
    )?;
    dictionary.define_property(
        PropertyDefinition::new("uncertainty.qc.dqs.rel", "Relative uncertainty of qc.dqs")
            .base_key("qc.dqs")
            .unit("UO:0000187"),
    )?;
    dictionary.define_property(
        PropertyDefinition::new(
            "uncertainty.peakwidth.fwhm",
            "Absolute uncertainty of peakwidth.fwhm",
        )
        .base_key("peakwidth.fwhm")
        .unit("UO:0000010"),
    )?;
    dictionary.define_property(
        PropertyDefinition::new("uncertainty.area.integrated", "Absolute uncertainty of area")
            .base_key("area.integrated")
            .unit("UO:0000186"),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_defines_expected_keys() {
        let dict = PropertyDictionary::new();
        seed_minimal_vocab(&dict).unwrap();

        for key in [
            "qc.dqs",
            "qc.snr",
            "peakwidth.fwhm",
            "area.integrated",
            "uncertainty.qc.dqs",
            "uncertainty.qc.dqs.rel",
            "uncertainty.peakwidth.fwhm",
            "uncertainty.area.integrated",
        ] {
            assert!(dict.contains(key), "missing seeded key {key}");
        }
        let prefixes: Vec<String> = dict.prefixes().into_iter().map(|p| p.prefix).collect();
        assert!(prefixes.contains(&"qc".to_string()));
        assert!(prefixes.contains(&UNCERTAINTY_PREFIX.to_string()));
    }

    #[test]
    fn seed_is_idempotent() {
        let dict = PropertyDictionary::new();
        seed_minimal_vocab(&dict).unwrap();
        seed_minimal_vocab(&dict).unwrap();
        assert_eq!(dict.definitions().len(), 8);
    }

    #[test]
    fn uncertainty_entries_point_at_defined_bases() {
        let dict = PropertyDictionary::new();
        seed_minimal_vocab(&dict).unwrap();

        let def = dict.resolve("uncertainty.qc.dqs.rel").unwrap();
        assert!(def.is_uncertainty());
        assert_eq!(def.base_key.as_deref(), Some("qc.dqs"));
        assert!(dict.contains("qc.dqs"));
    }
}
