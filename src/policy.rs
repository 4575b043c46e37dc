//! Per-key resolution policies.
//!
//! A policy tells the resolution engine how to pick one winning observation
//! for a property key when several algorithms disagree. Policies are pure
//! data; applying them is the job of [`crate::resolve`].

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Tie-break preferences for one property key.
///
/// `prefer_latest` left unset means "enabled": recency is consulted by default
/// and a caller that wants it ignored must explicitly disable it. At most one
/// of `prefer_min`/`prefer_max` may be set; both is an authoring error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    /// Property key this policy governs.
    pub prop_key: String,
    /// Observations from this algorithm outrank all others.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_algo: Option<String>,
    /// Prefer the most recently accepted observation. Unset == enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_latest: Option<bool>,
    /// Prefer the smaller numeric value (nulls sort last).
    #[serde(default)]
    pub prefer_min: bool,
    /// Prefer the larger numeric value (nulls sort last).
    #[serde(default)]
    pub prefer_max: bool,
}

impl ResolutionPolicy {
    /// Creates the default (recency-only) policy for a key, the same
    /// behavior as having no policy row at all.
    #[must_use]
    pub fn for_key(prop_key: impl Into<String>) -> Self {
        Self {
            prop_key: prop_key.into(),
            prefer_algo: None,
            prefer_latest: None,
            prefer_min: false,
            prefer_max: false,
        }
    }

    /// Prefer observations from this algorithm above all other criteria.
    #[must_use]
    pub fn prefer_algo(mut self, algo_id: impl Into<String>) -> Self {
        self.prefer_algo = Some(algo_id.into());
        self
    }

    /// Explicitly enable or disable recency preference.
    #[must_use]
    pub const fn prefer_latest(mut self, enabled: bool) -> Self {
        self.prefer_latest = Some(enabled);
        self
    }

    /// Prefer the smaller numeric value.
    #[must_use]
    pub const fn prefer_min(mut self) -> Self {
        self.prefer_min = true;
        self
    }

    /// Prefer the larger numeric value.
    #[must_use]
    pub const fn prefer_max(mut self) -> Self {
        self.prefer_max = true;
        self
    }

    /// Whether recency preference is in effect. Unset degrades to enabled.
    #[must_use]
    pub fn prefer_latest_effective(&self) -> bool {
        self.prefer_latest.unwrap_or(true)
    }

    /// Rejects policies that set both value preferences.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.prefer_min && self.prefer_max {
            return Err(PolicyError::AmbiguousPolicy {
                key: self.prop_key.clone(),
            });
        }
        Ok(())
    }
}
