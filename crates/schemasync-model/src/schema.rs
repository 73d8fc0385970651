//! Schema representation types.
//!
//! These types describe the structure of a relational database as seen by the
//! reverse-engineering pipeline: entities (tables), their typed columns, and
//! the relationships joining them. Iteration order over every collection is
//! the insertion order, so two models built the same way compare equal and
//! report in the same order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SQL data types recognized by the schema model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Small integer (16-bit).
    SmallInt,
    /// Text/string without a declared length.
    Text,
    /// Variable-length character string.
    Varchar(usize),
    /// Fixed-length character string.
    Char(usize),
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    Timestamp,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Decimal with precision and scale.
    Decimal(u8, u8),
    /// Binary large object.
    Blob,
    /// JSON data.
    Json,
    /// UUID.
    Uuid,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Text => write!(f, "TEXT"),
            Self::Varchar(len) => write!(f, "VARCHAR({len})"),
            Self::Char(len) => write!(f, "CHAR({len})"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Real => write!(f, "REAL"),
            Self::Double => write!(f, "DOUBLE PRECISION"),
            Self::Decimal(p, s) => write!(f, "DECIMAL({p}, {s})"),
            Self::Blob => write!(f, "BLOB"),
            Self::Json => write!(f, "JSON"),
            Self::Uuid => write!(f, "UUID"),
        }
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
}

impl ColumnSchema {
    /// Creates a new nullable, non-key column.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are always NOT NULL
        self
    }
}

/// Cardinality of a relationship, as seen from its source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// The source row references at most one target row.
    ToOne,
    /// The source row references any number of target rows.
    ToMany,
}

/// A pair of joined columns, one on each endpoint of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinPair {
    /// Column in the source entity.
    pub source_column: String,
    /// Column in the target entity.
    pub target_column: String,
}

/// Schema definition for a relationship between two entities.
///
/// Endpoints are stored as entity names and resolved against the owning model
/// at lookup time. A relationship whose endpoint name does not resolve is
/// invalid and is removed by the post-merge sanitizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    /// Relationship name, unique within the source entity.
    pub name: String,
    /// Name of the source entity (the owner of this relationship).
    pub source_entity: String,
    /// Name of the target entity.
    pub target_entity: String,
    /// Cardinality as seen from the source.
    pub cardinality: Cardinality,
    /// Join column pairs.
    pub joins: Vec<JoinPair>,
}

impl RelationshipSchema {
    /// Creates a new relationship with no joins.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            source_entity: source_entity.into(),
            target_entity: target_entity.into(),
            cardinality,
            joins: Vec::new(),
        }
    }

    /// Adds a join column pair.
    #[must_use]
    pub fn join(
        mut self,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        self.joins.push(JoinPair {
            source_column: source_column.into(),
            target_column: target_column.into(),
        });
        self
    }

    /// Returns true when both relationships join the same entities through
    /// the same column pairs. This is the identity used when diffing; the
    /// relationship name and cardinality do not participate.
    #[must_use]
    pub fn same_endpoints(&self, other: &Self) -> bool {
        self.source_entity == other.source_entity
            && self.target_entity == other.target_entity
            && self.joins == other.joins
    }
}

impl fmt::Display for RelationshipSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source_entity, self.target_entity)
    }
}

/// Schema definition for an entity (a table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Entity name, unique within the owning model.
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<ColumnSchema>,
    /// Relationships owned by this entity (this entity is the source).
    pub relationships: Vec<RelationshipSchema>,
}

impl EntitySchema {
    /// Creates a new entity with no columns.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Adds a column to the entity.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets a mutable column by name.
    #[must_use]
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnSchema> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Appends a column.
    pub fn add_column(&mut self, column: ColumnSchema) {
        self.columns.push(column);
    }

    /// Removes a column by name, returning its definition.
    pub fn remove_column(&mut self, name: &str) -> Option<ColumnSchema> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Removes the relationship with the same endpoints as `relationship`,
    /// returning the removed definition.
    pub fn remove_relationship(
        &mut self,
        relationship: &RelationshipSchema,
    ) -> Option<RelationshipSchema> {
        let idx = self
            .relationships
            .iter()
            .position(|r| r.same_endpoints(relationship))?;
        Some(self.relationships.remove(idx))
    }

    /// Returns the names of the primary key columns, in declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }
}

/// A named collection of entities, relationships, and stored procedures.
///
/// Constructed fresh per introspection run or loaded from persisted state,
/// mutated in place by change tokens during a merge, then persisted and
/// discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Model name.
    pub name: String,
    /// Entities, in insertion order.
    pub entities: Vec<EntitySchema>,
    /// Stored procedures, in insertion order.
    pub procedures: Vec<crate::procedure::ProcedureSchema>,
}

impl SchemaModel {
    /// Creates a new empty model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            procedures: Vec::new(),
        }
    }

    /// Adds an entity to the model.
    #[must_use]
    pub fn entity(mut self, entity: EntitySchema) -> Self {
        self.entities.push(entity);
        self
    }

    /// Adds a procedure to the model.
    #[must_use]
    pub fn procedure(mut self, procedure: crate::procedure::ProcedureSchema) -> Self {
        self.procedures.push(procedure);
        self
    }

    /// Gets an entity by name.
    #[must_use]
    pub fn get_entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Gets a mutable entity by name.
    #[must_use]
    pub fn get_entity_mut(&mut self, name: &str) -> Option<&mut EntitySchema> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    /// Appends an entity.
    pub fn add_entity(&mut self, entity: EntitySchema) {
        self.entities.push(entity);
    }

    /// Removes an entity by name, returning its definition. Relationships
    /// owned by the entity are removed with it; relationships in other
    /// entities that target it are left behind and must be cleaned up by the
    /// caller (the post-merge sanitizer).
    pub fn remove_entity(&mut self, name: &str) -> Option<EntitySchema> {
        let idx = self.entities.iter().position(|e| e.name == name)?;
        Some(self.entities.remove(idx))
    }

    /// Files a relationship under its owning (source) entity. Returns false
    /// when the source entity is not present in the model.
    #[must_use]
    pub fn add_relationship(&mut self, relationship: RelationshipSchema) -> bool {
        match self.get_entity_mut(&relationship.source_entity) {
            Some(entity) => {
                entity.relationships.push(relationship);
                true
            }
            None => false,
        }
    }

    /// Gets a procedure by name.
    #[must_use]
    pub fn get_procedure(&self, name: &str) -> Option<&crate::procedure::ProcedureSchema> {
        self.procedures.iter().find(|p| p.name == name)
    }

    /// Gets a mutable procedure by name.
    #[must_use]
    pub fn get_procedure_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut crate::procedure::ProcedureSchema> {
        self.procedures.iter_mut().find(|p| p.name == name)
    }

    /// Appends a procedure.
    pub fn add_procedure(&mut self, procedure: crate::procedure::ProcedureSchema) {
        self.procedures.push(procedure);
    }

    /// Removes a procedure by name, returning its definition.
    pub fn remove_procedure(&mut self, name: &str) -> Option<crate::procedure::ProcedureSchema> {
        let idx = self.procedures.iter().position(|p| p.name == name)?;
        Some(self.procedures.remove(idx))
    }

    /// Returns entity names, in insertion order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }
}
