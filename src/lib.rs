//! # PINTS - Property Provenance & Resolution for Measurement Pipelines
//!
//! PINTS tracks per-entity measurement properties produced by multiple
//! algorithms without losing any of them. Every algorithm's claim is kept as
//! a provenance-tagged observation; a deterministic, policy-driven resolver
//! answers "which value should I use?" on read, without ever deleting the
//! competing claims.
//!
//! ## Core Concepts
//!
//! - **Entity**: a node in the sample / run / feature hierarchy
//! - **Property key**: a namespaced, ontology-linkable vocabulary entry
//! - **Observation**: one algorithm's claim about one property of one entity
//! - **Resolution policy**: per-key preferences that pick a single winner
//! - **Orphan uncertainty**: an uncertainty claim whose base value is missing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pints_core::{Level, ObservationDraft, PintsEngine, Provenance, Sample, SampleType};
//!
//! let engine = PintsEngine::in_memory();
//! pints_core::seed_minimal_vocab(engine.dictionary())?;
//!
//! engine.create_sample(Sample::new("S001", SampleType::Sample))?;
//! engine.create_run(Run::new("R001", "S001"))?;
//! engine.create_feature(Feature::new("F0001", "R001", "S001", 301.123_456))?;
//!
//! let obs = engine.record_observation(
//!     ObservationDraft::builder(Level::Feature, "qc.dqs")
//!         .sample("S001")
//!         .run("R001")
//!         .feature("F0001")
//!         .value(0.87)
//!         .provenance(Provenance::new("qAlgorithms").version("1.0.0"))
//!         .build()?,
//! )?;
//!
//! let resolved = engine.resolve()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core domain types
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod observation;
pub mod policy;
pub mod read;
pub mod vocab;

// Engine, resolution, and storage
pub mod engine;
pub mod resolve;
pub mod seed;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use diagnostics::{find_orphan_uncertainties, OrphanUncertainty};
pub use engine::PintsEngine;
pub use entity::{EntityCoords, Feature, Level, Run, Sample, SampleType};
pub use error::{
    HierarchyError, ObservationError, PintsError, PintsResult, PolicyError, VocabError,
};
pub use observation::{
    Observation, ObservationDraft, ObservationDraftBuilder, ObservationId, Provenance,
};
pub use policy::ResolutionPolicy;
pub use read::ObservationFilter;
pub use resolve::{resolve_observations, ResolvedValue};
pub use seed::{seed_minimal_vocab, SCHEMA_NAME, SCHEMA_VERSION, VOCAB_NAME, VOCAB_VERSION};
pub use storage::{
    HierarchyStore, InMemoryHierarchyStore, InMemoryObservationStore, InMemoryPolicyStore,
    ObservationStore, PolicyStore, StorageError,
};
pub use vocab::{NamespacePrefix, PropertyDefinition, PropertyDictionary, UNCERTAINTY_PREFIX};
