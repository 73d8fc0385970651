//! Merge executor.
//!
//! Applies an ordered token sequence to a target model. Each token's failure
//! is caught, recorded, and execution continues with the next token; a
//! single failing token never aborts the batch and nothing is rolled back.
//! This is an append-forward, best-effort reconciliation, not a transaction.

use tracing::{debug, info, warn};

use crate::context::{MergeContext, ValidationResult};
use crate::token::MergeToken;

/// Executes an ordered sequence of change tokens.
#[derive(Debug, Default)]
pub struct MergeExecutor;

impl MergeExecutor {
    /// Creates a new executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes every token strictly in order, accumulating one validation
    /// failure per failing token. The returned result is empty on full
    /// success; otherwise it enumerates every recorded failure.
    pub fn execute(
        &self,
        tokens: &[MergeToken],
        ctx: &mut MergeContext<'_>,
    ) -> ValidationResult {
        let mut validation = ValidationResult::new();

        for token in tokens {
            let (name, value) = token.describe();
            debug!(token = name, value = %value, "Applying change token");

            if let Err(err) = token.execute(ctx) {
                let message =
                    format!("Migration error. Can't apply changes from token: {name} ({value})");
                warn!(token = name, value = %value, error = %err, "Change token failed");
                validation.add_failure(message, Some(err));
            }
        }

        if validation.has_failures() {
            info!("Migration complete.");
            warn!("Migration finished. The following problem(s) were ignored.");
            for failure in validation.failures() {
                warn!(%failure, "Ignored merge failure");
            }
        } else {
            info!("Migration completed successfully.");
        }

        validation
    }
}
