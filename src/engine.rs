//! Engine facade composing dictionary, hierarchy, observations, and policies.
//!
//! [`PintsEngine`] is the write and read surface the host talks to. Every
//! mutation is validated before any state change (typed error, no partial
//! work, no internal retry); reads are pure over consistent store snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use crate::diagnostics::{find_orphan_uncertainties, OrphanUncertainty};
use crate::entity::{Feature, Level, Run, Sample};
use crate::error::{HierarchyError, ObservationError, PintsError, PintsResult};
use crate::observation::{Observation, ObservationDraft};
use crate::policy::ResolutionPolicy;
use crate::read::ObservationFilter;
use crate::resolve::{resolve_observations, ResolvedValue};
use crate::storage::{
    HierarchyStore, InMemoryHierarchyStore, InMemoryObservationStore, InMemoryPolicyStore,
    ObservationStore, PolicyStore, StorageError,
};
use crate::vocab::{PropertyDefinition, PropertyDictionary};

fn hierarchy_err(level: Level, id: String, err: StorageError) -> PintsError {
    match err {
        StorageError::DuplicateKey(_) => HierarchyError::DuplicateIdentity { level, id }.into(),
        StorageError::ParentNotFound(parent) => {
            HierarchyError::UnknownParent { level, id, parent }.into()
        }
        StorageError::NotFound(_) => HierarchyError::NotFound { level, id }.into(),
        other => other.into(),
    }
}

/// The PINTS property provenance and resolution engine.
///
/// Cheap to clone; clones share the underlying stores.
///
/// # Example
/// ```rust,ignore
/// let engine = PintsEngine::in_memory();
/// engine.register_prefix("qc", "Quality control", None)?;
/// engine.define_property(PropertyDefinition::new("qc.dqs", "Data quality score"))?;
/// engine.create_sample(Sample::new("S001", SampleType::Sample))?;
/// ```
#[derive(Clone)]
pub struct PintsEngine {
    dictionary: Arc<PropertyDictionary>,
    hierarchy: Arc<dyn HierarchyStore>,
    observations: Arc<dyn ObservationStore>,
    policies: Arc<dyn PolicyStore>,
}

impl PintsEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(
        dictionary: Arc<PropertyDictionary>,
        hierarchy: Arc<dyn HierarchyStore>,
        observations: Arc<dyn ObservationStore>,
        policies: Arc<dyn PolicyStore>,
    ) -> Self {
        Self {
            dictionary,
            hierarchy,
            observations,
            policies,
        }
    }

    /// Creates an engine backed by the in-memory reference stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(PropertyDictionary::new()),
            Arc::new(InMemoryHierarchyStore::new()),
            Arc::new(InMemoryObservationStore::new()),
            Arc::new(InMemoryPolicyStore::new()),
        )
    }

    /// The shared property dictionary.
    #[must_use]
    pub fn dictionary(&self) -> &PropertyDictionary {
        &self.dictionary
    }

    // ---- vocabulary bootstrap ----

    /// Registers a namespace prefix (idempotent upsert).
    pub fn register_prefix(
        &self,
        prefix: impl Into<String>,
        label: impl Into<String>,
        description: Option<String>,
    ) -> PintsResult<()> {
        self.dictionary.register_prefix(prefix, label, description)
    }

    /// Defines a property key (idempotent for identical fields).
    pub fn define_property(&self, def: PropertyDefinition) -> PintsResult<()> {
        self.dictionary.define_property(def)
    }

    // ---- entity ingestion ----

    /// Creates a sample.
    pub fn create_sample(&self, sample: Sample) -> PintsResult<()> {
        let id = sample.sample_id.clone();
        self.hierarchy
            .insert_sample(sample)
            .map_err(|e| hierarchy_err(Level::Sample, id, e))
    }

    /// Creates a run under an existing sample.
    pub fn create_run(&self, run: Run) -> PintsResult<()> {
        let id = format!("{}/{}", run.sample_id, run.run_id);
        self.hierarchy
            .insert_run(run)
            .map_err(|e| hierarchy_err(Level::Run, id, e))
    }

    /// Creates a feature under an existing run.
    pub fn create_feature(&self, feature: Feature) -> PintsResult<()> {
        let id = format!(
            "{}/{}/{}",
            feature.sample_id, feature.run_id, feature.feature_id
        );
        self.hierarchy
            .insert_feature(feature)
            .map_err(|e| hierarchy_err(Level::Feature, id, e))
    }

    /// Updates a sample's free-text description.
    pub fn set_sample_description(
        &self,
        sample_id: &str,
        description: Option<String>,
    ) -> PintsResult<()> {
        self.hierarchy
            .set_sample_description(sample_id, description)
            .map_err(|e| hierarchy_err(Level::Sample, sample_id.to_string(), e))
    }

    /// Gets a sample by id.
    pub fn sample(&self, sample_id: &str) -> PintsResult<Option<Sample>> {
        Ok(self.hierarchy.get_sample(sample_id)?)
    }

    /// Gets a run by composite identity.
    pub fn run(&self, sample_id: &str, run_id: &str) -> PintsResult<Option<Run>> {
        Ok(self.hierarchy.get_run(sample_id, run_id)?)
    }

    /// Gets a feature by composite identity.
    pub fn feature(
        &self,
        sample_id: &str,
        run_id: &str,
        feature_id: &str,
    ) -> PintsResult<Option<Feature>> {
        Ok(self.hierarchy.get_feature(sample_id, run_id, feature_id)?)
    }

    /// Snapshot of all samples.
    pub fn samples(&self) -> PintsResult<Vec<Sample>> {
        Ok(self.hierarchy.samples()?)
    }

    /// Snapshot of all runs.
    pub fn runs(&self) -> PintsResult<Vec<Run>> {
        Ok(self.hierarchy.runs()?)
    }

    /// Snapshot of all features.
    pub fn features(&self) -> PintsResult<Vec<Feature>> {
        Ok(self.hierarchy.features()?)
    }

    // ---- observation writes ----

    /// Records one observation, returning the accepted row.
    ///
    /// Validation order: the property key must be defined, then the entity
    /// must exist at the draft's coordinates. On success the store performs an
    /// atomic insert-or-replace on `(entity, key, algo_id)` and stamps the
    /// acceptance time.
    pub fn record_observation(&self, draft: ObservationDraft) -> PintsResult<Observation> {
        if !self.dictionary.contains(&draft.prop_key) {
            return Err(ObservationError::UnknownProperty {
                key: draft.prop_key,
            }
            .into());
        }
        if !self.hierarchy.contains(&draft.coords)? {
            return Err(ObservationError::EntityNotFound {
                coords: draft.coords,
            }
            .into());
        }
        Ok(self.observations.upsert(draft)?)
    }

    /// Records a batch of observations.
    ///
    /// Each draft is validated and written independently; a failure never
    /// rolls back earlier successes. Callers that need all-or-nothing must
    /// wrap the batch in their own scoped transaction.
    pub fn record_observations(
        &self,
        drafts: Vec<ObservationDraft>,
    ) -> Vec<PintsResult<Observation>> {
        drafts
            .into_iter()
            .map(|draft| self.record_observation(draft))
            .collect()
    }

    // ---- unified read layer ----

    /// Finite, restartable snapshot of observations matching the filter.
    pub fn observations(&self, filter: &ObservationFilter) -> PintsResult<Vec<Observation>> {
        Ok(self.observations.scan(filter)?)
    }

    // ---- policy table ----

    /// Inserts or replaces the resolution policy for its key.
    pub fn set_policy(&self, policy: ResolutionPolicy) -> PintsResult<()> {
        policy.validate()?;
        Ok(self.policies.set(policy)?)
    }

    /// The policy row for a key, if any.
    pub fn policy(&self, prop_key: &str) -> PintsResult<Option<ResolutionPolicy>> {
        Ok(self.policies.get(prop_key)?)
    }

    // ---- resolution & diagnostics ----

    /// Resolves every `(entity, property key)` group to one winner.
    ///
    /// A pure function of the current observation and policy contents; safe
    /// to recompute on every read.
    pub fn resolve(&self) -> PintsResult<Vec<ResolvedValue>> {
        self.resolve_filtered(&ObservationFilter::new())
    }

    /// Resolves only the groups whose observations match the filter.
    pub fn resolve_filtered(&self, filter: &ObservationFilter) -> PintsResult<Vec<ResolvedValue>> {
        let rows = self.observations.scan(filter)?;
        let policies: HashMap<String, ResolutionPolicy> = self
            .policies
            .all()?
            .into_iter()
            .map(|p| (p.prop_key.clone(), p))
            .collect();
        Ok(resolve_observations(&rows, &policies))
    }

    /// Reports uncertainty observations whose base property is absent on the
    /// same entity. Advisory only; never mutates state.
    pub fn find_orphan_uncertainties(&self) -> PintsResult<Vec<OrphanUncertainty>> {
        let rows = self.observations.scan(&ObservationFilter::new())?;
        Ok(find_orphan_uncertainties(&self.dictionary, &rows))
    }
}
