//! In-memory schema model for database reverse-engineering.
//!
//! This crate holds the passive data structures that describe a relational
//! database: entities with typed columns, relationships between entities, and
//! stored procedures. The model is produced by an introspector, persisted as
//! JSON, and mutated in place by the merge engine in `schemasync-merge`.
//!
//! Entities are addressed by name within their owning model. Relationships
//! store the *names* of their endpoint entities rather than references;
//! endpoints are resolved at lookup time, which keeps the model an acyclic
//! value type and makes dangling-reference checks a simple existence lookup.

pub mod error;
pub mod procedure;
pub mod schema;
pub mod store;

pub use error::{ModelError, Result};
pub use procedure::{CallParameter, ParamDirection, ProcedureSchema};
pub use schema::{
    Cardinality, ColumnSchema, EntitySchema, JoinPair, RelationshipSchema, SchemaModel, SqlType,
};
pub use store::ModelStore;
