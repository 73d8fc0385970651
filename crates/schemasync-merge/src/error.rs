//! Error types for the merge engine.

use schemasync_model::ModelError;

/// Errors that can occur during a schema merge run.
///
/// Only [`MergeError::Introspection`] and [`MergeError::Model`] propagate to
/// the caller as hard failures. Everything else is raised by individual
/// change tokens, caught by the executor, and accumulated in the run's
/// validation result so an operator sees every problem, not just the first.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Database introspection failed; aborts the import before any diff runs.
    #[error("Introspection failed: {0}")]
    Introspection(String),

    /// Failed to load or save the persisted model.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A token referenced an entity that is not in the model.
    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    /// A token tried to add an entity that already exists.
    #[error("Entity '{0}' already exists")]
    DuplicateEntity(String),

    /// A token referenced a column that is not in its entity.
    #[error("Column '{column}' not found in entity '{entity}'")]
    ColumnNotFound {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// A token tried to add a column that already exists.
    #[error("Column '{column}' already exists in entity '{entity}'")]
    DuplicateColumn {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// A token referenced a relationship that is not in its source entity.
    #[error("Relationship '{0}' not found")]
    RelationshipNotFound(String),

    /// A token referenced a procedure that is not in the model.
    #[error("Procedure '{0}' not found")]
    ProcedureNotFound(String),

    /// A token tried to add a procedure that already exists.
    #[error("Procedure '{0}' already exists")]
    DuplicateProcedure(String),

    /// A database-direction token was executed without a database executor.
    #[error("No database executor attached for token '{0}'")]
    NoDatabaseExecutor(String),

    /// The database-facing collaborator rejected a change.
    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
