//! Abstract storage traits for PINTS core.
//!
//! The engine talks to storage through these traits so the in-memory
//! reference backend can be swapped for a transactional store without touching
//! validation or resolution logic. Implementations must be safe for multiple
//! concurrent writers and readers: an upsert is atomic with respect to its own
//! insert-or-replace, and a scan returns a consistent snapshot of the rows it
//! touches.

use thiserror::Error;

use crate::entity::{EntityCoords, Feature, Run, Sample};
use crate::observation::{Observation, ObservationDraft};
use crate::policy::ResolutionPolicy;
use crate::read::ObservationFilter;

/// Errors reported by storage backends.
///
/// The engine maps these onto the typed domain errors (duplicate key becomes
/// `DuplicateIdentity`, parent-not-found becomes `UnknownParent`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Referenced parent entity does not exist.
    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    /// Row not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend error (lock poisoning, I/O, ...).
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage for the sample/run/feature hierarchy.
///
/// Referential integrity is enforced at write time under the store's own
/// synchronization: a run can only be inserted when its sample exists and a
/// feature only when its run exists, so traversal from any feature always
/// reaches a valid run and sample.
pub trait HierarchyStore: Send + Sync {
    /// Insert a new sample. Fails with `DuplicateKey` if the id exists.
    fn insert_sample(&self, sample: Sample) -> Result<(), StorageError>;

    /// Insert a new run. Fails with `ParentNotFound`/`DuplicateKey`.
    fn insert_run(&self, run: Run) -> Result<(), StorageError>;

    /// Insert a new feature. Fails with `ParentNotFound`/`DuplicateKey`.
    fn insert_feature(&self, feature: Feature) -> Result<(), StorageError>;

    /// Update a sample's description, the only mutable entity field.
    fn set_sample_description(
        &self,
        sample_id: &str,
        description: Option<String>,
    ) -> Result<(), StorageError>;

    /// Get a sample by id.
    fn get_sample(&self, sample_id: &str) -> Result<Option<Sample>, StorageError>;

    /// Get a run by its composite identity.
    fn get_run(&self, sample_id: &str, run_id: &str) -> Result<Option<Run>, StorageError>;

    /// Get a feature by its composite identity.
    fn get_feature(
        &self,
        sample_id: &str,
        run_id: &str,
        feature_id: &str,
    ) -> Result<Option<Feature>, StorageError>;

    /// Whether an entity exists at the given coordinates.
    fn contains(&self, coords: &EntityCoords) -> Result<bool, StorageError>;

    /// Snapshot of all samples, ordered by id.
    fn samples(&self) -> Result<Vec<Sample>, StorageError>;

    /// Snapshot of all runs, ordered by composite identity.
    fn runs(&self) -> Result<Vec<Run>, StorageError>;

    /// Snapshot of all features, ordered by composite identity.
    fn features(&self) -> Result<Vec<Feature>, StorageError>;
}

/// Storage for provenance-tagged property observations.
pub trait ObservationStore: Send + Sync {
    /// Atomic insert-or-replace keyed by `(coords, prop_key, algo_id)`.
    ///
    /// The store stamps `created_utc` at acceptance time (never
    /// caller-supplied) and mints a fresh [`crate::observation::ObservationId`]
    /// for the accepted row; the accepted observation is returned.
    fn upsert(&self, draft: ObservationDraft) -> Result<Observation, StorageError>;

    /// Get one observation by its full identity.
    fn get(
        &self,
        coords: &EntityCoords,
        prop_key: &str,
        algo_id: &str,
    ) -> Result<Option<Observation>, StorageError>;

    /// Snapshot of all observations matching the filter, in stable
    /// `(coords, prop_key, algo_id)` order.
    fn scan(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, StorageError>;

    /// Number of stored observations.
    fn len(&self) -> Result<usize, StorageError>;

    /// Whether the store holds no observations.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Storage for per-key resolution policies.
pub trait PolicyStore: Send + Sync {
    /// Insert or replace the policy row for its key.
    fn set(&self, policy: ResolutionPolicy) -> Result<(), StorageError>;

    /// Get the policy row for a key, if any.
    fn get(&self, prop_key: &str) -> Result<Option<ResolutionPolicy>, StorageError>;

    /// Snapshot of all policy rows, ordered by key.
    fn all(&self) -> Result<Vec<ResolutionPolicy>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure traits are object-safe
    fn _assert_hierarchy_store_object_safe(_: &dyn HierarchyStore) {}
    fn _assert_observation_store_object_safe(_: &dyn ObservationStore) {}
    fn _assert_policy_store_object_safe(_: &dyn PolicyStore) {}

    #[test]
    fn storage_error_display() {
        let err = StorageError::DuplicateKey("S001".to_string());
        assert!(err.to_string().contains("S001"));

        let err = StorageError::ParentNotFound("run 'R001' of sample 'S001'".to_string());
        assert!(err.to_string().contains("R001"));
    }
}
