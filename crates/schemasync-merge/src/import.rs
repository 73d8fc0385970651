//! Schema import action.
//!
//! Drives one full reconciliation run: introspect the database, load the
//! persisted model, diff, sequence, execute, sanitize, persist. Introspection
//! and persistence failures abort the run; everything else is accumulated
//! into the returned report.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use schemasync_model::{ModelStore, SchemaModel};

use crate::context::{MergeContext, MergeDelegate, ValidationResult};
use crate::diff::{DiffOptions, SchemaDiff};
use crate::error::{MergeError, Result};
use crate::executor::MergeExecutor;
use crate::sanitize::sanitize_relationships;
use crate::sequence::sort_tokens;

/// Produces the source-of-truth schema snapshot. Implementations talk to a
/// live database or, like [`SnapshotIntrospector`], read a captured
/// snapshot; either way a failure here aborts the import before any diff
/// runs.
pub trait SchemaIntrospector {
    /// Builds a schema model describing the current database structure.
    fn introspect(&mut self) -> Result<SchemaModel>;
}

/// Introspector backed by a schema snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotIntrospector {
    path: PathBuf,
}

impl SnapshotIntrospector {
    /// Creates an introspector reading the given snapshot file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SchemaIntrospector for SnapshotIntrospector {
    fn introspect(&mut self) -> Result<SchemaModel> {
        let data = fs::read_to_string(&self.path).map_err(|err| {
            MergeError::Introspection(format!(
                "cannot read snapshot '{}': {err}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&data).map_err(|err| {
            MergeError::Introspection(format!(
                "cannot parse snapshot '{}': {err}",
                self.path.display()
            ))
        })
    }
}

/// How an import run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No prior model existed; the introspected model was persisted as-is.
    InitialImport,
    /// The models already agreed; nothing was applied.
    NoChanges,
    /// Every token applied cleanly.
    Complete,
    /// At least one token failed; see the report's failures.
    CompleteWithFailures,
}

/// The structured result of one import run.
#[derive(Debug)]
pub struct ImportReport {
    /// How the run ended.
    pub outcome: MergeOutcome,
    /// Every detected change as `(token name, token value)`, in execution
    /// order.
    pub changes: Vec<(String, String)>,
    /// Failures accumulated while executing tokens.
    pub failures: ValidationResult,
    /// Relationships the sanitizer removed because an endpoint never
    /// materialized.
    pub removed_relationships: Vec<schemasync_model::RelationshipSchema>,
}

impl ImportReport {
    fn short_circuit(outcome: MergeOutcome) -> Self {
        Self {
            outcome,
            changes: Vec::new(),
            failures: ValidationResult::new(),
            removed_relationships: Vec::new(),
        }
    }
}

/// Reconciles an introspected schema into the persisted model.
pub struct ImportAction<I> {
    introspector: I,
    store: ModelStore,
    options: DiffOptions,
}

impl<I: SchemaIntrospector> ImportAction<I> {
    /// Creates an import action with default diff options.
    #[must_use]
    pub fn new(introspector: I, store: ModelStore) -> Self {
        Self {
            introspector,
            store,
            options: DiffOptions::new(),
        }
    }

    /// Sets the diff options.
    #[must_use]
    pub fn with_options(mut self, options: DiffOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the import. The delegate observes entity and relationship
    /// changes as they are applied; pass [`crate::context::NoopDelegate`]
    /// when nothing needs to watch.
    pub fn execute(&mut self, delegate: &mut dyn MergeDelegate) -> Result<ImportReport> {
        let introspected = self.introspector.introspect()?;
        info!(
            model = %introspected.name,
            entities = introspected.entities.len(),
            "Loaded schema snapshot"
        );

        let Some(mut existing) = self.store.load()? else {
            info!(
                path = %self.store.path().display(),
                "No existing model; saving introspected model as-is"
            );
            self.store.save(&introspected)?;
            return Ok(ImportReport::short_circuit(MergeOutcome::InitialImport));
        };

        let tokens = SchemaDiff::with_options(self.options.clone()).diff(&existing, &introspected);
        if tokens.is_empty() {
            info!("Detected changes: no changes to import");
            return Ok(ImportReport::short_circuit(MergeOutcome::NoChanges));
        }

        let tokens = sort_tokens(tokens);
        info!("Detected changes:");
        for token in &tokens {
            let (name, value) = token.describe();
            info!("    {name:<20} {value}");
        }

        let mut ctx = MergeContext::new(&mut existing).with_delegate(&mut *delegate);
        let failures = MergeExecutor::new().execute(&tokens, &mut ctx);

        let removed_relationships = sanitize_relationships(&mut existing, delegate);
        debug!(
            removed = removed_relationships.len(),
            "Relationship sanity pass finished"
        );

        self.store.save(&existing)?;

        let outcome = if failures.has_failures() {
            MergeOutcome::CompleteWithFailures
        } else {
            MergeOutcome::Complete
        };

        Ok(ImportReport {
            outcome,
            changes: tokens
                .iter()
                .map(|t| {
                    let (name, value) = t.describe();
                    (name.to_string(), value)
                })
                .collect(),
            failures,
            removed_relationships,
        })
    }
}
