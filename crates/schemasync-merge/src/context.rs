//! Execution context and failure accumulation.
//!
//! [`MergeContext`] bundles what a change token needs to run: the target
//! model, the optional database-facing collaborator, and the merge delegate.
//! The validation accumulator is deliberately *not* part of the context; the
//! executor owns it and returns it, so failures are never ambient state.

use std::fmt;

use schemasync_model::{EntitySchema, RelationshipSchema, SchemaModel};

use crate::error::{MergeError, Result};
use crate::token::MergeToken;

/// One recorded, non-fatal failure from a merge run.
#[derive(Debug)]
pub struct ValidationFailure {
    message: String,
    cause: Option<MergeError>,
}

impl ValidationFailure {
    /// Creates a failure from a message and an optional triggering error.
    #[must_use]
    pub fn new(message: impl Into<String>, cause: Option<MergeError>) -> Self {
        Self {
            message: message.into(),
            cause,
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the triggering error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&MergeError> {
        self.cause.as_ref()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {cause}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Append-only list of failures accumulated over one merge run. Never
/// cleared mid-run; consulted only after the executor finishes.
#[derive(Debug, Default)]
pub struct ValidationResult {
    failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one failure.
    pub fn add_failure(&mut self, message: impl Into<String>, cause: Option<MergeError>) {
        self.failures.push(ValidationFailure::new(message, cause));
    }

    /// Returns true when at least one failure was recorded.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Returns every recorded failure, in record order.
    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }
}

/// Database-facing collaborator. Applies one change token at a time against
/// a live database; stubbed in tests.
pub trait DdlExecutor {
    /// Applies a single database-direction token.
    fn apply(&mut self, token: &MergeToken) -> Result<()>;
}

/// Observer notified as entities and relationships are added to or removed
/// from the model during a merge. For logging and UI consumption only; it
/// must not affect the merge outcome.
pub trait MergeDelegate {
    /// An entity was added to the model.
    fn entity_added(&mut self, _entity: &EntitySchema) {}

    /// An entity was removed from the model.
    fn entity_removed(&mut self, _entity: &EntitySchema) {}

    /// A relationship was added to the model.
    fn relationship_added(&mut self, _relationship: &RelationshipSchema) {}

    /// A relationship was removed from the model.
    fn relationship_removed(&mut self, _relationship: &RelationshipSchema) {}
}

/// A delegate that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelegate;

impl MergeDelegate for NoopDelegate {}

/// Everything a token needs while executing.
pub struct MergeContext<'a> {
    model: &'a mut SchemaModel,
    ddl: Option<&'a mut dyn DdlExecutor>,
    delegate: Option<&'a mut dyn MergeDelegate>,
}

impl<'a> MergeContext<'a> {
    /// Creates a context around the target model, with no database executor
    /// and no delegate.
    #[must_use]
    pub fn new(model: &'a mut SchemaModel) -> Self {
        Self {
            model,
            ddl: None,
            delegate: None,
        }
    }

    /// Attaches the database-facing executor.
    #[must_use]
    pub fn with_ddl_executor(mut self, ddl: &'a mut dyn DdlExecutor) -> Self {
        self.ddl = Some(ddl);
        self
    }

    /// Attaches the merge delegate.
    #[must_use]
    pub fn with_delegate(mut self, delegate: &'a mut dyn MergeDelegate) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Returns the target model.
    #[must_use]
    pub fn model(&self) -> &SchemaModel {
        self.model
    }

    /// Returns the target model mutably.
    #[must_use]
    pub fn model_mut(&mut self) -> &mut SchemaModel {
        self.model
    }

    pub(crate) fn apply_to_database(&mut self, token: &MergeToken) -> Result<()> {
        match self.ddl.as_mut() {
            Some(ddl) => ddl.apply(token),
            None => Err(MergeError::NoDatabaseExecutor(token.name().to_string())),
        }
    }

    pub(crate) fn notify_entity_added(&mut self, entity: &EntitySchema) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.entity_added(entity);
        }
    }

    pub(crate) fn notify_entity_removed(&mut self, entity: &EntitySchema) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.entity_removed(entity);
        }
    }

    pub(crate) fn notify_relationship_added(&mut self, relationship: &RelationshipSchema) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.relationship_added(relationship);
        }
    }

    pub(crate) fn notify_relationship_removed(&mut self, relationship: &RelationshipSchema) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.relationship_removed(relationship);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_accumulates() {
        let mut result = ValidationResult::new();
        assert!(!result.has_failures());

        result.add_failure("first", None);
        result.add_failure(
            "second",
            Some(MergeError::EntityNotFound("artist".to_string())),
        );

        assert!(result.has_failures());
        assert_eq!(result.failures().len(), 2);
        assert_eq!(result.failures()[0].message(), "first");
        assert!(result.failures()[1].cause().is_some());
    }

    #[test]
    fn test_validation_failure_display() {
        let plain = ValidationFailure::new("bad token", None);
        assert_eq!(plain.to_string(), "bad token");

        let caused = ValidationFailure::new(
            "bad token",
            Some(MergeError::EntityNotFound("artist".to_string())),
        );
        assert_eq!(caused.to_string(), "bad token: Entity 'artist' not found");
    }
}
