//! Policy-driven resolution of competing observations.
//!
//! For every distinct `(entity, property key)` group the engine selects
//! exactly one winning observation by applying a fixed multi-key comparator;
//! a total order, so re-running resolution on an unchanged store always yields
//! identical output. The ranking chain, first decisive criterion wins:
//!
//! 1. the policy's preferred algorithm outranks all others;
//! 2. if `prefer_latest` is in effect (explicitly enabled **or unset**), the
//!    newer acceptance timestamp outranks the older;
//! 3. the policy's value preference: `prefer_min` ranks smaller numeric values
//!    first, `prefer_max` larger; observations without a numeric value sort
//!    last either way;
//! 4. newer acceptance timestamp again (recency is consulted twice, so it
//!    dominates unless a policy explicitly disables `prefer_latest` and a
//!    value preference is decisive);
//! 5. lexicographically smaller algorithm id wins. This last criterion cannot
//!    tie: within a group, algorithm ids are unique by construction.
//!
//! Resolution is a pure function of the observation set and the policy table;
//! it holds no locks across groups and may be abandoned between groups.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityCoords, Level};
use crate::observation::{Observation, ObservationId};
use crate::policy::ResolutionPolicy;

/// The winning observation for one `(entity, property key)` group.
///
/// Carries the full observation payload plus a traceability pointer to the
/// source row and its algorithm identity for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    /// Entity coordinates of the group.
    pub coords: EntityCoords,
    /// Property key of the group.
    pub prop_key: String,
    /// Winning numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Winning text value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,
    /// Unit code the winning observation reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Ontology reference the winning observation used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_ref: Option<String>,
    /// Algorithm that produced the winning observation.
    pub algo_id: String,
    /// Version of that algorithm, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algo_version: Option<String>,
    /// Acceptance timestamp of the winning observation.
    pub created_utc: DateTime<Utc>,
    /// Traceability pointer to the source observation row.
    pub source: ObservationId,
}

impl ResolvedValue {
    /// The level of the resolved group.
    #[must_use]
    pub const fn level(&self) -> Level {
        self.coords.level()
    }

    fn from_observation(obs: &Observation) -> Self {
        Self {
            coords: obs.coords.clone(),
            prop_key: obs.prop_key.clone(),
            value: obs.value,
            value_text: obs.value_text.clone(),
            unit: obs.unit.clone(),
            ontology_ref: obs.ontology_ref.clone(),
            algo_id: obs.provenance.algo_id.clone(),
            algo_version: obs.provenance.algo_version.clone(),
            created_utc: obs.created_utc,
            source: obs.id,
        }
    }
}

/// Compares two observations under a policy. `Greater` means `a` outranks `b`.
///
/// This is the explicit multi-key comparator documented at module level; it is
/// a total order over any group in which algorithm ids are unique.
#[must_use]
pub fn compare_candidates(
    policy: &ResolutionPolicy,
    a: &Observation,
    b: &Observation,
) -> Ordering {
    // 1. Preferred algorithm outranks everything.
    if let Some(preferred) = policy.prefer_algo.as_deref() {
        let ord = (a.algo_id() == preferred).cmp(&(b.algo_id() == preferred));
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // 2. Recency, unless explicitly disabled.
    if policy.prefer_latest_effective() {
        let ord = a.created_utc.cmp(&b.created_utc);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // 3. Value preference; rows without a numeric value sort last.
    if policy.prefer_min || policy.prefer_max {
        let ord = match (a.value, b.value) {
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
            (Some(x), Some(y)) => {
                if policy.prefer_min {
                    y.total_cmp(&x)
                } else {
                    x.total_cmp(&y)
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // 4. Recency again, as the universal tie-break.
    let ord = a.created_utc.cmp(&b.created_utc);
    if ord != Ordering::Equal {
        return ord;
    }

    // 5. Stable final criterion: lexicographically smaller algo id wins.
    b.algo_id().cmp(a.algo_id())
}

/// Resolves every `(entity, property key)` group to exactly one winner.
///
/// `policies` is keyed by property key; a missing row falls back to the
/// recency-only default. Output is ordered by level, then entity coordinates,
/// then key.
#[must_use]
pub fn resolve_observations(
    observations: &[Observation],
    policies: &HashMap<String, ResolutionPolicy>,
) -> Vec<ResolvedValue> {
    let mut groups: BTreeMap<(EntityCoords, &str), Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry((obs.coords.clone(), obs.prop_key.as_str()))
            .or_default()
            .push(obs);
    }

    let mut resolved = Vec::with_capacity(groups.len());
    for ((_, key), candidates) in groups {
        let default_policy;
        let policy = match policies.get(key) {
            Some(p) => p,
            None => {
                default_policy = ResolutionPolicy::for_key(key);
                &default_policy
            }
        };

        let mut winner = candidates[0];
        for &candidate in &candidates[1..] {
            if compare_candidates(policy, candidate, winner) == Ordering::Greater {
                winner = candidate;
            }
        }
        resolved.push(ResolvedValue::from_observation(winner));
    }
    resolved
}
