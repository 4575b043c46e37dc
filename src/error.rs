//! Error types for PINTS core.
//!
//! All errors are strongly typed using thiserror and surfaced synchronously at
//! the point of the offending write. Nothing is retried internally; retry
//! policy belongs to the host.

use thiserror::Error;

use crate::entity::{EntityCoords, Level};
use crate::storage::StorageError;

/// Errors raised by the namespace registry and property dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabError {
    #[error("Namespace prefix '{prefix}' is not registered")]
    UnregisteredPrefix { prefix: String },

    #[error("Malformed property key '{key}': {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("Uncertainty property '{key}' must declare a base property key distinct from itself")]
    MissingUncertaintyBase { key: String },

    #[error("Base property '{base_key}' referenced by '{key}' is not a defined property")]
    UnknownBaseKey { key: String, base_key: String },

    #[error("Property '{key}' is already defined with different fields")]
    ConflictingRedefinition { key: String },
}

/// Errors raised by the entity hierarchy store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Cannot create {level} '{id}': parent {parent} does not exist")]
    UnknownParent {
        level: Level,
        id: String,
        parent: String,
    },

    #[error("Duplicate {level} identity: {id}")]
    DuplicateIdentity { level: Level, id: String },

    #[error("Unknown {level}: {id}")]
    NotFound { level: Level, id: String },
}

/// Errors raised when recording observations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("Property key '{key}' is not defined in the dictionary")]
    UnknownProperty { key: String },

    #[error("Entity not found at {coords}")]
    EntityNotFound { coords: EntityCoords },

    #[error("Coordinates do not match {level} level: {reason}")]
    LevelMismatch { level: Level, reason: String },

    #[error("Required field '{field}' is missing")]
    MissingField { field: String },
}

/// Errors raised when authoring resolution policies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Policy for '{key}' sets both prefer_min and prefer_max")]
    AmbiguousPolicy { key: String },
}

/// Top-level error type for PINTS core operations.
#[derive(Debug, Error)]
pub enum PintsError {
    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),

    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Observation error: {0}")]
    Observation(#[from] ObservationError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PintsError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a vocabulary error.
    #[must_use]
    pub const fn is_vocab(&self) -> bool {
        matches!(self, Self::Vocab(_))
    }

    /// Returns true if this is a hierarchy error.
    #[must_use]
    pub const fn is_hierarchy(&self) -> bool {
        matches!(self, Self::Hierarchy(_))
    }

    /// Returns true if this is an observation error.
    #[must_use]
    pub const fn is_observation(&self) -> bool {
        matches!(self, Self::Observation(_))
    }
}

/// Result type alias for PINTS core operations.
pub type PintsResult<T> = Result<T, PintsError>;
