//! In-memory storage backend.
//!
//! Thread-safe reference implementations of the storage traits, intended for
//! embedded use and tests. State lives behind a single `RwLock` per store, so
//! an upsert is atomic and a scan sees a consistent snapshot; writes to
//! distinct stores never block each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::entity::{EntityCoords, Feature, Run, Sample};
use crate::observation::{Observation, ObservationDraft, ObservationId};
use crate::policy::ResolutionPolicy;
use crate::read::ObservationFilter;
use crate::storage::traits::{
    HierarchyStore, ObservationStore, PolicyStore, StorageError,
};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct HierarchyState {
    samples: BTreeMap<String, Sample>,
    runs: BTreeMap<(String, String), Run>,
    features: BTreeMap<(String, String, String), Feature>,
}

/// Thread-safe in-memory hierarchy store.
#[derive(Debug, Default)]
pub struct InMemoryHierarchyStore {
    state: RwLock<HierarchyState>,
}

impl InMemoryHierarchyStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HierarchyStore for InMemoryHierarchyStore {
    fn insert_sample(&self, sample: Sample) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("sample.insert"))?;
        if state.samples.contains_key(&sample.sample_id) {
            return Err(StorageError::DuplicateKey(sample.sample_id));
        }
        state.samples.insert(sample.sample_id.clone(), sample);
        Ok(())
    }

    fn insert_run(&self, run: Run) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("run.insert"))?;
        if !state.samples.contains_key(&run.sample_id) {
            return Err(StorageError::ParentNotFound(format!(
                "sample '{}'",
                run.sample_id
            )));
        }
        let key = (run.sample_id.clone(), run.run_id.clone());
        if state.runs.contains_key(&key) {
            return Err(StorageError::DuplicateKey(format!(
                "{}/{}",
                run.sample_id, run.run_id
            )));
        }
        state.runs.insert(key, run);
        Ok(())
    }

    fn insert_feature(&self, feature: Feature) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("feature.insert"))?;
        let run_key = (feature.sample_id.clone(), feature.run_id.clone());
        if !state.runs.contains_key(&run_key) {
            return Err(StorageError::ParentNotFound(format!(
                "run '{}/{}'",
                feature.sample_id, feature.run_id
            )));
        }
        let key = (
            feature.sample_id.clone(),
            feature.run_id.clone(),
            feature.feature_id.clone(),
        );
        if state.features.contains_key(&key) {
            return Err(StorageError::DuplicateKey(format!(
                "{}/{}/{}",
                feature.sample_id, feature.run_id, feature.feature_id
            )));
        }
        state.features.insert(key, feature);
        Ok(())
    }

    fn set_sample_description(
        &self,
        sample_id: &str,
        description: Option<String>,
    ) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("sample.set_description"))?;
        let sample = state
            .samples
            .get_mut(sample_id)
            .ok_or_else(|| StorageError::NotFound(format!("sample '{sample_id}'")))?;
        sample.description = description;
        Ok(())
    }

    fn get_sample(&self, sample_id: &str) -> Result<Option<Sample>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("sample.get"))?;
        Ok(state.samples.get(sample_id).cloned())
    }

    fn get_run(&self, sample_id: &str, run_id: &str) -> Result<Option<Run>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("run.get"))?;
        Ok(state
            .runs
            .get(&(sample_id.to_string(), run_id.to_string()))
            .cloned())
    }

    fn get_feature(
        &self,
        sample_id: &str,
        run_id: &str,
        feature_id: &str,
    ) -> Result<Option<Feature>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("feature.get"))?;
        Ok(state
            .features
            .get(&(
                sample_id.to_string(),
                run_id.to_string(),
                feature_id.to_string(),
            ))
            .cloned())
    }

    fn contains(&self, coords: &EntityCoords) -> Result<bool, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("hierarchy.contains"))?;
        Ok(match coords {
            EntityCoords::Sample { sample_id } => state.samples.contains_key(sample_id),
            EntityCoords::Run { sample_id, run_id } => state
                .runs
                .contains_key(&(sample_id.clone(), run_id.clone())),
            EntityCoords::Feature {
                sample_id,
                run_id,
                feature_id,
            } => state.features.contains_key(&(
                sample_id.clone(),
                run_id.clone(),
                feature_id.clone(),
            )),
        })
    }

    fn samples(&self) -> Result<Vec<Sample>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("samples.list"))?;
        Ok(state.samples.values().cloned().collect())
    }

    fn runs(&self) -> Result<Vec<Run>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("runs.list"))?;
        Ok(state.runs.values().cloned().collect())
    }

    fn features(&self) -> Result<Vec<Feature>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("features.list"))?;
        Ok(state.features.values().cloned().collect())
    }
}

type ObservationKey = (EntityCoords, String, String);

#[derive(Debug, Default)]
struct ObservationState {
    rows: HashMap<ObservationKey, Observation>,
    last_stamp: Option<DateTime<Utc>>,
}

/// Thread-safe in-memory observation store.
///
/// Acceptance timestamps are stamped under the write lock and kept strictly
/// monotonic, so store-assigned time is a total order even when two writes
/// land within clock resolution.
#[derive(Debug, Default)]
pub struct InMemoryObservationStore {
    state: RwLock<ObservationState>,
}

impl InMemoryObservationStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_stamp(state: &mut ObservationState) -> DateTime<Utc> {
        let mut stamp = Utc::now();
        if let Some(last) = state.last_stamp {
            if stamp <= last {
                stamp = last + Duration::microseconds(1);
            }
        }
        state.last_stamp = Some(stamp);
        stamp
    }
}

impl ObservationStore for InMemoryObservationStore {
    fn upsert(&self, draft: ObservationDraft) -> Result<Observation, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("observation.upsert"))?;
        let created_utc = Self::next_stamp(&mut state);

        let key = (
            draft.coords.clone(),
            draft.prop_key.clone(),
            draft.provenance.algo_id.clone(),
        );
        let obs = Observation {
            id: ObservationId::new(),
            coords: draft.coords,
            prop_key: draft.prop_key,
            value: draft.value,
            value_text: draft.value_text,
            unit: draft.unit,
            ontology_ref: draft.ontology_ref,
            provenance: draft.provenance,
            created_utc,
        };

        // Last write wins per (entity, key, algo_id); the row is replaced
        // whole under the lock so readers never see a partial overwrite.
        state.rows.insert(key, obs.clone());
        Ok(obs)
    }

    fn get(
        &self,
        coords: &EntityCoords,
        prop_key: &str,
        algo_id: &str,
    ) -> Result<Option<Observation>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("observation.get"))?;
        Ok(state
            .rows
            .get(&(
                coords.clone(),
                prop_key.to_string(),
                algo_id.to_string(),
            ))
            .cloned())
    }

    fn scan(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("observation.scan"))?;
        let mut rows: Vec<Observation> = state
            .rows
            .values()
            .filter(|obs| filter.matches(obs))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.coords
                .cmp(&b.coords)
                .then_with(|| a.prop_key.cmp(&b.prop_key))
                .then_with(|| a.provenance.algo_id.cmp(&b.provenance.algo_id))
        });
        Ok(rows)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("observation.len"))?;
        Ok(state.rows.len())
    }
}

#[derive(Debug, Default)]
struct PolicyState {
    by_key: BTreeMap<String, ResolutionPolicy>,
}

/// Thread-safe in-memory policy table.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    state: RwLock<PolicyState>,
}

impl InMemoryPolicyStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn set(&self, policy: ResolutionPolicy) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("policy.set"))?;
        state.by_key.insert(policy.prop_key.clone(), policy);
        Ok(())
    }

    fn get(&self, prop_key: &str) -> Result<Option<ResolutionPolicy>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("policy.get"))?;
        Ok(state.by_key.get(prop_key).cloned())
    }

    fn all(&self) -> Result<Vec<ResolutionPolicy>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("policy.all"))?;
        Ok(state.by_key.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::entity::{Level, SampleType};
    use crate::observation::{ObservationDraft, Provenance};

    fn seeded_hierarchy() -> InMemoryHierarchyStore {
        let store = InMemoryHierarchyStore::new();
        store
            .insert_sample(Sample::new("S001", SampleType::Sample))
            .unwrap();
        store.insert_run(Run::new("R001", "S001")).unwrap();
        store
            .insert_feature(Feature::new("F0001", "R001", "S001", 301.123_456))
            .unwrap();
        store
    }

    fn feature_draft(key: &str, algo: &str, value: f64) -> ObservationDraft {
        ObservationDraft::builder(Level::Feature, key)
            .sample("S001")
            .run("R001")
            .feature("F0001")
            .value(value)
            .provenance(Provenance::new(algo))
            .build()
            .unwrap()
    }

    #[test]
    fn hierarchy_enforces_parent_before_child() {
        let store = InMemoryHierarchyStore::new();

        assert!(matches!(
            store.insert_run(Run::new("R001", "S001")),
            Err(StorageError::ParentNotFound(_))
        ));

        store
            .insert_sample(Sample::new("S001", SampleType::Sample))
            .unwrap();
        assert!(matches!(
            store.insert_feature(Feature::new("F0001", "R001", "S001", 100.0)),
            Err(StorageError::ParentNotFound(_))
        ));

        store.insert_run(Run::new("R001", "S001")).unwrap();
        store
            .insert_feature(Feature::new("F0001", "R001", "S001", 100.0))
            .unwrap();

        assert!(store
            .contains(&EntityCoords::feature("S001", "R001", "F0001"))
            .unwrap());
    }

    #[test]
    fn hierarchy_rejects_duplicate_scoped_identities() {
        let store = seeded_hierarchy();

        assert!(matches!(
            store.insert_sample(Sample::new("S001", SampleType::Blank)),
            Err(StorageError::DuplicateKey(_))
        ));
        assert!(matches!(
            store.insert_run(Run::new("R001", "S001")),
            Err(StorageError::DuplicateKey(_))
        ));
        assert!(matches!(
            store.insert_feature(Feature::new("F0001", "R001", "S001", 1.0)),
            Err(StorageError::DuplicateKey(_))
        ));
    }

    #[test]
    fn run_ids_are_scoped_to_their_sample() {
        let store = seeded_hierarchy();
        store
            .insert_sample(Sample::new("S002", SampleType::Qc))
            .unwrap();

        // Same run id under a different sample is a distinct identity.
        store.insert_run(Run::new("R001", "S002")).unwrap();

        assert!(store.get_run("S001", "R001").unwrap().is_some());
        assert!(store.get_run("S002", "R001").unwrap().is_some());
        assert!(store.get_run("S002", "R002").unwrap().is_none());
        assert_eq!(store.runs().unwrap().len(), 2);
    }

    #[test]
    fn sample_description_is_the_only_mutable_field() {
        let store = seeded_hierarchy();
        store
            .set_sample_description("S001", Some("River water".to_string()))
            .unwrap();
        let sample = store.get_sample("S001").unwrap().unwrap();
        assert_eq!(sample.description.as_deref(), Some("River water"));
        assert_eq!(sample.sample_type, SampleType::Sample);

        assert!(matches!(
            store.set_sample_description("S999", None),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn upsert_replaces_same_algo_and_keeps_other_algos() {
        let store = InMemoryObservationStore::new();
        let coords = EntityCoords::feature("S001", "R001", "F0001");

        let first = store.upsert(feature_draft("qc.dqs", "qAlgorithms", 0.87)).unwrap();
        let second = store.upsert(feature_draft("qc.dqs", "qAlgorithms", 0.91)).unwrap();
        store.upsert(feature_draft("qc.dqs", "VendorX", 0.83)).unwrap();

        assert_eq!(store.len().unwrap(), 2);
        let kept = store.get(&coords, "qc.dqs", "qAlgorithms").unwrap().unwrap();
        assert_eq!(kept.value, Some(0.91));
        assert_eq!(kept.id, second.id);
        assert_ne!(kept.id, first.id);

        let other = store.get(&coords, "qc.dqs", "VendorX").unwrap().unwrap();
        assert_eq!(other.value, Some(0.83));
    }

    #[test]
    fn acceptance_stamps_are_strictly_monotonic() {
        let store = InMemoryObservationStore::new();
        let a = store.upsert(feature_draft("qc.dqs", "a", 1.0)).unwrap();
        let b = store.upsert(feature_draft("qc.dqs", "b", 2.0)).unwrap();
        let c = store.upsert(feature_draft("qc.dqs", "a", 3.0)).unwrap();
        assert!(a.created_utc < b.created_utc);
        assert!(b.created_utc < c.created_utc);
    }

    #[test]
    fn scan_filters_and_orders_deterministically() {
        let store = InMemoryObservationStore::new();
        store.upsert(feature_draft("qc.dqs", "b", 1.0)).unwrap();
        store.upsert(feature_draft("qc.dqs", "a", 2.0)).unwrap();
        store
            .upsert(
                ObservationDraft::builder(Level::Run, "qc.dqs")
                    .sample("S001")
                    .run("R001")
                    .value(0.5)
                    .provenance(Provenance::new("a"))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let all = store.scan(&ObservationFilter::new()).unwrap();
        assert_eq!(all.len(), 3);
        // Run-level coords sort before feature-level.
        assert_eq!(all[0].level(), Level::Run);
        assert_eq!(all[1].provenance.algo_id, "a");
        assert_eq!(all[2].provenance.algo_id, "b");

        let features_only = store
            .scan(&ObservationFilter::new().level(Level::Feature))
            .unwrap();
        assert_eq!(features_only.len(), 2);

        let by_entity = store
            .scan(&ObservationFilter::new().entity(EntityCoords::run("S001", "R001")))
            .unwrap();
        assert_eq!(by_entity.len(), 1);
        assert_eq!(by_entity[0].value, Some(0.5));
    }

    #[test]
    fn policy_store_upserts_by_key() {
        let store = InMemoryPolicyStore::new();
        store
            .set(ResolutionPolicy::for_key("qc.dqs").prefer_max())
            .unwrap();
        store
            .set(ResolutionPolicy::for_key("qc.dqs").prefer_algo("qAlgorithms"))
            .unwrap();

        let policy = store.get("qc.dqs").unwrap().unwrap();
        assert_eq!(policy.prefer_algo.as_deref(), Some("qAlgorithms"));
        assert!(!policy.prefer_max);
        assert_eq!(store.all().unwrap().len(), 1);
        assert!(store.get("peakwidth.fwhm").unwrap().is_none());
    }
}
