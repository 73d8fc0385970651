//! Schema diff-and-merge engine for database reverse-engineering.
//!
//! `schemasync-merge` reconciles a freshly introspected database structure
//! against a previously saved schema model. It computes the minimal set of
//! atomic change tokens between the two snapshots, orders them so dependent
//! changes never run before their prerequisites, applies them with per-token
//! failure isolation, and cleans up anything a partial failure left dangling.
//!
//! # Architecture
//!
//! - **Tokens** — atomic, reversible schema changes with an
//!   execute/reverse/describe contract ([`token`])
//! - **Diff** — compares two schema models into an unordered token set
//!   ([`diff`])
//! - **Sequencer** — orders tokens and derives database-facing inverses
//!   ([`sequence`])
//! - **Executor** — applies an ordered sequence, accumulating failures
//!   instead of aborting ([`executor`])
//! - **Sanitizer** — removes relationships left dangling by partial failure
//!   ([`sanitize`])
//! - **Import** — the end-to-end introspect/load/diff/merge/persist pipeline
//!   ([`import`])
//!
//! # Example
//!
//! ```rust
//! use schemasync_merge::prelude::*;
//! use schemasync_model::{ColumnSchema, EntitySchema, SchemaModel, SqlType};
//!
//! let existing = SchemaModel::new("gallery").entity(
//!     EntitySchema::new("artist")
//!         .column(ColumnSchema::new("id", SqlType::BigInt).primary_key()),
//! );
//! let mut target = existing.clone();
//!
//! let introspected = SchemaModel::new("gallery").entity(
//!     EntitySchema::new("artist")
//!         .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
//!         .column(ColumnSchema::new("name", SqlType::Text)),
//! );
//!
//! let tokens = sort_tokens(SchemaDiff::new().diff(&existing, &introspected));
//! let mut ctx = MergeContext::new(&mut target);
//! let failures = MergeExecutor::new().execute(&tokens, &mut ctx);
//! assert!(!failures.has_failures());
//! ```

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod import;
pub mod sanitize;
pub mod sequence;
pub mod token;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::context::{
        DdlExecutor, MergeContext, MergeDelegate, NoopDelegate, ValidationFailure,
        ValidationResult,
    };
    pub use crate::diff::{DiffOptions, SchemaDiff};
    pub use crate::error::{MergeError, Result};
    pub use crate::executor::MergeExecutor;
    pub use crate::import::{
        ImportAction, ImportReport, MergeOutcome, SchemaIntrospector, SnapshotIntrospector,
    };
    pub use crate::sanitize::sanitize_relationships;
    pub use crate::sequence::{reverse_for_database, sort_tokens};
    pub use crate::token::{MergeDirection, MergeToken, TokenKind};
}
