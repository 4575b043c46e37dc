//! Storage traits and the in-memory reference backend.

mod memory;
mod traits;

pub use memory::{InMemoryHierarchyStore, InMemoryObservationStore, InMemoryPolicyStore};
pub use traits::{HierarchyStore, ObservationStore, PolicyStore, StorageError};
