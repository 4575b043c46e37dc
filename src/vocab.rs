//! Namespaced property vocabulary: prefix registry and property dictionary.
//!
//! Every property key is dot-namespaced (`qc.dqs`, `uncertainty.peakwidth.fwhm`)
//! and owned by a registered prefix. The dictionary validates structural
//! invariants at definition time so downstream components can trust every
//! resolved key:
//!
//! - the key's leading segment equals its declared prefix,
//! - the prefix exists in the registry,
//! - `uncertainty.*` keys always name the base property they quantify
//!   uncertainty for, and that base is itself defined.
//!
//! Definition writes are rare (vocabulary bootstrap) and are serialized behind
//! a single lock; lookups are cheap cloned reads.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{PintsError, PintsResult, VocabError};

/// Reserved prefix for uncertainty properties.
///
/// Keys under this prefix must declare the base property they quantify
/// uncertainty for.
pub const UNCERTAINTY_PREFIX: &str = "uncertainty";

/// A registered property-key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespacePrefix {
    /// The prefix itself, e.g. `qc`.
    pub prefix: String,
    /// Human-readable label.
    pub label: String,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Canonical definition of a property key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Dot-namespaced canonical key, e.g. `qc.dqs`.
    pub key: String,
    /// Owning prefix; must equal the key's leading segment.
    pub prefix: String,
    /// Display label.
    pub label: String,
    /// Ontology reference carried through unchanged (e.g. a PSI-MS URI).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_ref: Option<String>,
    /// Default unit code carried through unchanged (e.g. a UO code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Key of the base property this key quantifies uncertainty for.
    ///
    /// Mandatory for `uncertainty.*` keys, optional otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_key: Option<String>,
}

impl PropertyDefinition {
    /// Creates a definition with the prefix derived from the key's leading
    /// segment. The derived prefix is still validated on `define_property`.
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        let prefix = key.split('.').next().unwrap_or_default().to_string();
        Self {
            key,
            prefix,
            label: label.into(),
            ontology_ref: None,
            unit: None,
            description: None,
            base_key: None,
        }
    }

    /// Sets the ontology reference.
    #[must_use]
    pub fn ontology_ref(mut self, ontology_ref: impl Into<String>) -> Self {
        self.ontology_ref = Some(ontology_ref.into());
        self
    }

    /// Sets the default unit code.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the free-text description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the base property key.
    #[must_use]
    pub fn base_key(mut self, base_key: impl Into<String>) -> Self {
        self.base_key = Some(base_key.into());
        self
    }

    /// Whether this definition lives under the `uncertainty` prefix.
    #[must_use]
    pub fn is_uncertainty(&self) -> bool {
        self.prefix == UNCERTAINTY_PREFIX
    }
}

#[derive(Debug, Default)]
struct VocabState {
    prefixes: BTreeMap<String, NamespacePrefix>,
    definitions: BTreeMap<String, PropertyDefinition>,
}

/// Thread-safe namespace registry plus property dictionary.
///
/// Lookups are pure; mutation is validated before any state change so a failed
/// `define_property` never leaves partial work behind.
#[derive(Debug, Default)]
pub struct PropertyDictionary {
    state: RwLock<VocabState>,
}

fn lock_err(context: &'static str) -> PintsError {
    PintsError::internal(format!("poisoned vocabulary lock: {context}"))
}

impl PropertyDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prefix. Idempotent upsert: re-registering replaces the
    /// label/description. The only validation is non-emptiness.
    pub fn register_prefix(
        &self,
        prefix: impl Into<String>,
        label: impl Into<String>,
        description: Option<String>,
    ) -> PintsResult<()> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(VocabError::MalformedKey {
                key: prefix,
                reason: "prefix cannot be empty".to_string(),
            }
            .into());
        }

        let entry = NamespacePrefix {
            prefix: prefix.clone(),
            label: label.into(),
            description,
        };

        let mut state = self.state.write().map_err(|_| lock_err("register_prefix"))?;
        state.prefixes.insert(prefix, entry);
        Ok(())
    }

    /// Defines a property key, validating every structural invariant first.
    ///
    /// Re-defining a key with identical fields is a no-op; differing fields
    /// fail with `ConflictingRedefinition`. Base properties must be defined
    /// before their uncertainty counterparts.
    pub fn define_property(&self, def: PropertyDefinition) -> PintsResult<()> {
        validate_key_shape(&def.key, &def.prefix)?;

        if def.is_uncertainty() {
            match def.base_key.as_deref() {
                None => {
                    return Err(VocabError::MissingUncertaintyBase {
                        key: def.key.clone(),
                    }
                    .into())
                }
                Some(base) if base == def.key => {
                    return Err(VocabError::MissingUncertaintyBase {
                        key: def.key.clone(),
                    }
                    .into())
                }
                Some(_) => {}
            }
        }

        let mut state = self.state.write().map_err(|_| lock_err("define_property"))?;

        if !state.prefixes.contains_key(&def.prefix) {
            return Err(VocabError::UnregisteredPrefix {
                prefix: def.prefix.clone(),
            }
            .into());
        }

        if let Some(base) = def.base_key.as_deref() {
            if !state.definitions.contains_key(base) {
                return Err(VocabError::UnknownBaseKey {
                    key: def.key.clone(),
                    base_key: base.to_string(),
                }
                .into());
            }
        }

        if let Some(existing) = state.definitions.get(&def.key) {
            if *existing == def {
                return Ok(());
            }
            return Err(VocabError::ConflictingRedefinition {
                key: def.key.clone(),
            }
            .into());
        }

        state.definitions.insert(def.key.clone(), def);
        Ok(())
    }

    /// Pure lookup of a property definition by canonical key.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<PropertyDefinition> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.definitions.get(key).cloned())
    }

    /// Whether the key is defined.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state
            .read()
            .map(|state| state.definitions.contains_key(key))
            .unwrap_or(false)
    }

    /// Snapshot of all registered prefixes, ordered by prefix.
    #[must_use]
    pub fn prefixes(&self) -> Vec<NamespacePrefix> {
        self.state
            .read()
            .map(|state| state.prefixes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of all property definitions, ordered by key.
    #[must_use]
    pub fn definitions(&self) -> Vec<PropertyDefinition> {
        self.state
            .read()
            .map(|state| state.definitions.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn validate_key_shape(key: &str, prefix: &str) -> Result<(), VocabError> {
    if !key.contains('.') {
        return Err(VocabError::MalformedKey {
            key: key.to_string(),
            reason: "missing namespace separator '.'".to_string(),
        });
    }

    if key.split('.').any(|segment| segment.is_empty()) {
        return Err(VocabError::MalformedKey {
            key: key.to_string(),
            reason: "empty key segment".to_string(),
        });
    }

    let leading = key.split('.').next().unwrap_or_default();
    if leading != prefix {
        return Err(VocabError::MalformedKey {
            key: key.to_string(),
            reason: format!("leading segment '{leading}' does not match prefix '{prefix}'"),
        });
    }

    Ok(())
}
