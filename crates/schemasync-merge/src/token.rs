//! Change tokens.
//!
//! A [`MergeToken`] is an immutable description of one atomic schema
//! difference, together with the behavior to apply it, report it, and derive
//! its inverse. Tokens are produced by the diff engine, ordered by the
//! sequencer, and applied in order by the merge executor.
//!
//! Every token carries a direction: `TowardModel` tokens mutate the in-memory
//! schema model, `TowardDatabase` tokens are handed to the database-facing
//! collaborator one at a time. The same operation kind behaves differently in
//! the two directions; most visibly for relationships, where the model side
//! just files the definition under its source entity while the database side
//! has to emit a constraint.

use serde::{Deserialize, Serialize};

use schemasync_model::{ColumnSchema, EntitySchema, ProcedureSchema, RelationshipSchema};

use crate::context::MergeContext;
use crate::error::{MergeError, Result};

/// The side of the reconciliation a token executes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeDirection {
    /// The token is applied to the live database through the DDL executor.
    TowardDatabase,
    /// The token mutates the in-memory schema model.
    TowardModel,
}

/// The operation a token performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Add an entity with all of its columns. Relationships are not part of
    /// the payload; they arrive as separate relationship tokens.
    AddEntity {
        /// Full entity definition.
        entity: EntitySchema,
    },

    /// Drop an entity. The full definition is retained for reversal.
    DropEntity {
        /// Full entity definition at the time of the drop.
        entity: EntitySchema,
    },

    /// Add a column to an existing entity.
    AddColumn {
        /// Entity name.
        entity: String,
        /// Column definition.
        column: ColumnSchema,
    },

    /// Drop a column. The full definition is retained for reversal.
    DropColumn {
        /// Entity name.
        entity: String,
        /// Column definition at the time of the drop.
        column: ColumnSchema,
    },

    /// Change a column's data type.
    SetColumnType {
        /// Entity name.
        entity: String,
        /// Column definition before the change.
        from: ColumnSchema,
        /// Column definition after the change.
        to: ColumnSchema,
    },

    /// Make a column NOT NULL.
    SetNotNull {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// Make a column nullable.
    SetAllowNull {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// Add a column to the primary key.
    AddPrimaryKey {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// Remove a column from the primary key.
    DropPrimaryKey {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// Add a relationship under its source entity.
    AddRelationship {
        /// Relationship definition.
        relationship: RelationshipSchema,
    },

    /// Drop a relationship from its source entity.
    DropRelationship {
        /// Relationship definition at the time of the drop.
        relationship: RelationshipSchema,
    },

    /// Add a stored procedure. Model-only; procedures have no
    /// database-facing form here.
    AddProcedure {
        /// Procedure definition.
        procedure: ProcedureSchema,
    },

    /// Drop a stored procedure.
    DropProcedure {
        /// Procedure definition at the time of the drop.
        procedure: ProcedureSchema,
    },

    /// Replace a procedure's definition wholesale. Parameter lists are never
    /// patched piecemeal.
    SetProcedureParameters {
        /// Definition before the change.
        from: ProcedureSchema,
        /// Definition after the change.
        to: ProcedureSchema,
    },
}

/// One atomic, reversible schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeToken {
    direction: MergeDirection,
    kind: TokenKind,
}

impl MergeToken {
    /// Creates a token with an explicit direction.
    #[must_use]
    pub fn new(direction: MergeDirection, kind: TokenKind) -> Self {
        Self { direction, kind }
    }

    // Convenience constructors. The diff engine emits model-direction
    // tokens; `toward_database` retags where DDL planning needs the other
    // side.

    /// Creates an add-entity token.
    #[must_use]
    pub fn add_entity(entity: EntitySchema) -> Self {
        Self::new(MergeDirection::TowardModel, TokenKind::AddEntity { entity })
    }

    /// Creates a drop-entity token.
    #[must_use]
    pub fn drop_entity(entity: EntitySchema) -> Self {
        Self::new(MergeDirection::TowardModel, TokenKind::DropEntity { entity })
    }

    /// Creates an add-column token.
    #[must_use]
    pub fn add_column(entity: impl Into<String>, column: ColumnSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::AddColumn {
                entity: entity.into(),
                column,
            },
        )
    }

    /// Creates a drop-column token.
    #[must_use]
    pub fn drop_column(entity: impl Into<String>, column: ColumnSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::DropColumn {
                entity: entity.into(),
                column,
            },
        )
    }

    /// Creates a set-column-type token.
    #[must_use]
    pub fn set_column_type(
        entity: impl Into<String>,
        from: ColumnSchema,
        to: ColumnSchema,
    ) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::SetColumnType {
                entity: entity.into(),
                from,
                to,
            },
        )
    }

    /// Creates a set-not-null token.
    #[must_use]
    pub fn set_not_null(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::SetNotNull {
                entity: entity.into(),
                column: column.into(),
            },
        )
    }

    /// Creates a set-allow-null token.
    #[must_use]
    pub fn set_allow_null(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::SetAllowNull {
                entity: entity.into(),
                column: column.into(),
            },
        )
    }

    /// Creates an add-primary-key token.
    #[must_use]
    pub fn add_primary_key(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::AddPrimaryKey {
                entity: entity.into(),
                column: column.into(),
            },
        )
    }

    /// Creates a drop-primary-key token.
    #[must_use]
    pub fn drop_primary_key(entity: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::DropPrimaryKey {
                entity: entity.into(),
                column: column.into(),
            },
        )
    }

    /// Creates an add-relationship token.
    #[must_use]
    pub fn add_relationship(relationship: RelationshipSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::AddRelationship { relationship },
        )
    }

    /// Creates a drop-relationship token.
    #[must_use]
    pub fn drop_relationship(relationship: RelationshipSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::DropRelationship { relationship },
        )
    }

    /// Creates an add-procedure token.
    #[must_use]
    pub fn add_procedure(procedure: ProcedureSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::AddProcedure { procedure },
        )
    }

    /// Creates a drop-procedure token.
    #[must_use]
    pub fn drop_procedure(procedure: ProcedureSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::DropProcedure { procedure },
        )
    }

    /// Creates a procedure-replacement token.
    #[must_use]
    pub fn set_procedure_parameters(from: ProcedureSchema, to: ProcedureSchema) -> Self {
        Self::new(
            MergeDirection::TowardModel,
            TokenKind::SetProcedureParameters { from, to },
        )
    }

    /// Returns the token's direction.
    #[must_use]
    pub fn direction(&self) -> MergeDirection {
        self.direction
    }

    /// Returns the token's operation.
    #[must_use]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Retags the token as database-direction.
    #[must_use]
    pub fn toward_database(mut self) -> Self {
        self.direction = MergeDirection::TowardDatabase;
        self
    }

    /// Returns the token's display name. Never fails.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.kind {
            TokenKind::AddEntity { .. } => "Add Entity",
            TokenKind::DropEntity { .. } => "Drop Entity",
            TokenKind::AddColumn { .. } => "Add Column",
            TokenKind::DropColumn { .. } => "Drop Column",
            TokenKind::SetColumnType { .. } => "Set Column Type",
            TokenKind::SetNotNull { .. } => "Set Not Null",
            TokenKind::SetAllowNull { .. } => "Set Allow Null",
            TokenKind::AddPrimaryKey { .. } => "Add Primary Key",
            TokenKind::DropPrimaryKey { .. } => "Drop Primary Key",
            TokenKind::AddRelationship { .. } => "Add Relationship",
            TokenKind::DropRelationship { .. } => "Drop Relationship",
            TokenKind::AddProcedure { .. } => "Add Procedure",
            TokenKind::DropProcedure { .. } => "Drop Procedure",
            TokenKind::SetProcedureParameters { .. } => "Set Procedure Parameters",
        }
    }

    /// Returns the identity of the affected object. Never fails.
    #[must_use]
    pub fn value(&self) -> String {
        match &self.kind {
            TokenKind::AddEntity { entity } | TokenKind::DropEntity { entity } => {
                entity.name.clone()
            }
            TokenKind::AddColumn { entity, column } | TokenKind::DropColumn { entity, column } => {
                format!("{entity}.{}", column.name)
            }
            TokenKind::SetColumnType { entity, from, to } => {
                format!("{entity}.{} {} -> {}", to.name, from.sql_type, to.sql_type)
            }
            TokenKind::SetNotNull { entity, column }
            | TokenKind::SetAllowNull { entity, column }
            | TokenKind::AddPrimaryKey { entity, column }
            | TokenKind::DropPrimaryKey { entity, column } => format!("{entity}.{column}"),
            TokenKind::AddRelationship { relationship }
            | TokenKind::DropRelationship { relationship } => relationship.to_string(),
            TokenKind::AddProcedure { procedure } | TokenKind::DropProcedure { procedure } => {
                procedure.fully_qualified_name()
            }
            TokenKind::SetProcedureParameters { to, .. } => to.fully_qualified_name(),
        }
    }

    /// Returns `(name, value)` for reporting.
    #[must_use]
    pub fn describe(&self) -> (&'static str, String) {
        (self.name(), self.value())
    }

    /// Returns true for relationship-addition tokens, which the sequencer
    /// places after every other token.
    #[must_use]
    pub fn is_relationship_addition(&self) -> bool {
        matches!(self.kind, TokenKind::AddRelationship { .. })
    }

    /// Returns true when the operation can be expressed against a live
    /// database. Procedure changes are model-only.
    #[must_use]
    pub fn has_database_form(&self) -> bool {
        !matches!(
            self.kind,
            TokenKind::AddProcedure { .. }
                | TokenKind::DropProcedure { .. }
                | TokenKind::SetProcedureParameters { .. }
        )
    }

    /// Returns the semantically inverse token in the same direction: add
    /// becomes drop, a type change A -> B becomes B -> A. Drop tokens carry
    /// the full dropped definition, so every kind is reversible.
    #[must_use]
    pub fn reverse(&self) -> Self {
        let kind = match &self.kind {
            TokenKind::AddEntity { entity } => TokenKind::DropEntity {
                entity: entity.clone(),
            },
            TokenKind::DropEntity { entity } => TokenKind::AddEntity {
                entity: entity.clone(),
            },
            TokenKind::AddColumn { entity, column } => TokenKind::DropColumn {
                entity: entity.clone(),
                column: column.clone(),
            },
            TokenKind::DropColumn { entity, column } => TokenKind::AddColumn {
                entity: entity.clone(),
                column: column.clone(),
            },
            TokenKind::SetColumnType { entity, from, to } => TokenKind::SetColumnType {
                entity: entity.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            TokenKind::SetNotNull { entity, column } => TokenKind::SetAllowNull {
                entity: entity.clone(),
                column: column.clone(),
            },
            TokenKind::SetAllowNull { entity, column } => TokenKind::SetNotNull {
                entity: entity.clone(),
                column: column.clone(),
            },
            TokenKind::AddPrimaryKey { entity, column } => TokenKind::DropPrimaryKey {
                entity: entity.clone(),
                column: column.clone(),
            },
            TokenKind::DropPrimaryKey { entity, column } => TokenKind::AddPrimaryKey {
                entity: entity.clone(),
                column: column.clone(),
            },
            TokenKind::AddRelationship { relationship } => TokenKind::DropRelationship {
                relationship: relationship.clone(),
            },
            TokenKind::DropRelationship { relationship } => TokenKind::AddRelationship {
                relationship: relationship.clone(),
            },
            TokenKind::AddProcedure { procedure } => TokenKind::DropProcedure {
                procedure: procedure.clone(),
            },
            TokenKind::DropProcedure { procedure } => TokenKind::AddProcedure {
                procedure: procedure.clone(),
            },
            TokenKind::SetProcedureParameters { from, to } => TokenKind::SetProcedureParameters {
                from: to.clone(),
                to: from.clone(),
            },
        };

        Self::new(self.direction, kind)
    }

    /// Returns the database-facing inverse of this token, or `None` for
    /// operations with no database form. Used by the sequencer to turn a
    /// detected-change list into the DDL that re-creates the prior model
    /// shape on the database side.
    #[must_use]
    pub fn database_reverse(&self) -> Option<Self> {
        if self.has_database_form() {
            Some(self.reverse().toward_database())
        } else {
            None
        }
    }

    /// Applies the token. Model-direction tokens mutate the context's model
    /// and notify the merge delegate; database-direction tokens are handed
    /// to the DDL executor. A failure affects only the entity, relationship,
    /// or procedure this token touches.
    pub fn execute(&self, ctx: &mut MergeContext<'_>) -> Result<()> {
        match self.direction {
            MergeDirection::TowardDatabase => ctx.apply_to_database(self),
            MergeDirection::TowardModel => self.execute_on_model(ctx),
        }
    }

    fn execute_on_model(&self, ctx: &mut MergeContext<'_>) -> Result<()> {
        match &self.kind {
            TokenKind::AddEntity { entity } => {
                if ctx.model().get_entity(&entity.name).is_some() {
                    return Err(MergeError::DuplicateEntity(entity.name.clone()));
                }
                ctx.model_mut().add_entity(entity.clone());
                ctx.notify_entity_added(entity);
                Ok(())
            }

            TokenKind::DropEntity { entity } => {
                let removed = ctx
                    .model_mut()
                    .remove_entity(&entity.name)
                    .ok_or_else(|| MergeError::EntityNotFound(entity.name.clone()))?;
                ctx.notify_entity_removed(&removed);
                Ok(())
            }

            TokenKind::AddColumn { entity, column } => {
                let target = ctx
                    .model_mut()
                    .get_entity_mut(entity)
                    .ok_or_else(|| MergeError::EntityNotFound(entity.clone()))?;
                if target.get_column(&column.name).is_some() {
                    return Err(MergeError::DuplicateColumn {
                        entity: entity.clone(),
                        column: column.name.clone(),
                    });
                }
                target.add_column(column.clone());
                Ok(())
            }

            TokenKind::DropColumn { entity, column } => {
                let target = ctx
                    .model_mut()
                    .get_entity_mut(entity)
                    .ok_or_else(|| MergeError::EntityNotFound(entity.clone()))?;
                target
                    .remove_column(&column.name)
                    .ok_or_else(|| MergeError::ColumnNotFound {
                        entity: entity.clone(),
                        column: column.name.clone(),
                    })?;
                Ok(())
            }

            TokenKind::SetColumnType { entity, to, .. } => {
                let column = Self::column_mut(ctx, entity, &to.name)?;
                column.sql_type = to.sql_type.clone();
                Ok(())
            }

            TokenKind::SetNotNull { entity, column } => {
                Self::column_mut(ctx, entity, column)?.nullable = false;
                Ok(())
            }

            TokenKind::SetAllowNull { entity, column } => {
                Self::column_mut(ctx, entity, column)?.nullable = true;
                Ok(())
            }

            TokenKind::AddPrimaryKey { entity, column } => {
                let column = Self::column_mut(ctx, entity, column)?;
                column.primary_key = true;
                column.nullable = false;
                Ok(())
            }

            TokenKind::DropPrimaryKey { entity, column } => {
                Self::column_mut(ctx, entity, column)?.primary_key = false;
                Ok(())
            }

            TokenKind::AddRelationship { relationship } => {
                // The target endpoint is deliberately not checked here; the
                // sanitizer removes relationships left dangling by failed
                // entity tokens.
                if !ctx.model_mut().add_relationship(relationship.clone()) {
                    return Err(MergeError::EntityNotFound(
                        relationship.source_entity.clone(),
                    ));
                }
                ctx.notify_relationship_added(relationship);
                Ok(())
            }

            TokenKind::DropRelationship { relationship } => {
                let source = ctx
                    .model_mut()
                    .get_entity_mut(&relationship.source_entity)
                    .ok_or_else(|| {
                        MergeError::EntityNotFound(relationship.source_entity.clone())
                    })?;
                let removed = source
                    .remove_relationship(relationship)
                    .ok_or_else(|| MergeError::RelationshipNotFound(relationship.name.clone()))?;
                ctx.notify_relationship_removed(&removed);
                Ok(())
            }

            TokenKind::AddProcedure { procedure } => {
                if ctx.model().get_procedure(&procedure.name).is_some() {
                    return Err(MergeError::DuplicateProcedure(procedure.name.clone()));
                }
                ctx.model_mut().add_procedure(procedure.clone());
                Ok(())
            }

            TokenKind::DropProcedure { procedure } => {
                ctx.model_mut()
                    .remove_procedure(&procedure.name)
                    .ok_or_else(|| MergeError::ProcedureNotFound(procedure.name.clone()))?;
                Ok(())
            }

            TokenKind::SetProcedureParameters { to, .. } => {
                let procedure = ctx
                    .model_mut()
                    .get_procedure_mut(&to.name)
                    .ok_or_else(|| MergeError::ProcedureNotFound(to.name.clone()))?;
                *procedure = to.clone();
                Ok(())
            }
        }
    }

    fn column_mut<'m>(
        ctx: &'m mut MergeContext<'_>,
        entity: &str,
        column: &str,
    ) -> Result<&'m mut ColumnSchema> {
        ctx.model_mut()
            .get_entity_mut(entity)
            .ok_or_else(|| MergeError::EntityNotFound(entity.to_string()))?
            .get_column_mut(column)
            .ok_or_else(|| MergeError::ColumnNotFound {
                entity: entity.to_string(),
                column: column.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_model::{Cardinality, SchemaModel, SqlType};

    fn artist() -> EntitySchema {
        EntitySchema::new("artist")
            .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
            .column(ColumnSchema::new("name", SqlType::Varchar(255)))
    }

    #[test]
    fn test_describe_add_column() {
        let token = MergeToken::add_column("artist", ColumnSchema::new("name", SqlType::Text));
        let (name, value) = token.describe();
        assert_eq!(name, "Add Column");
        assert_eq!(value, "artist.name");
    }

    #[test]
    fn test_describe_relationship() {
        let rel = RelationshipSchema::new("paintings", "artist", "painting", Cardinality::ToMany);
        let token = MergeToken::add_relationship(rel);
        assert_eq!(token.value(), "artist -> painting");
    }

    #[test]
    fn test_reverse_add_entity() {
        let token = MergeToken::add_entity(artist());
        let reverse = token.reverse();
        assert_eq!(reverse.name(), "Drop Entity");
        assert_eq!(reverse.direction(), MergeDirection::TowardModel);
        assert_eq!(reverse.reverse(), token);
    }

    #[test]
    fn test_reverse_set_column_type_swaps() {
        let from = ColumnSchema::new("age", SqlType::Integer);
        let to = ColumnSchema::new("age", SqlType::BigInt);
        let token = MergeToken::set_column_type("artist", from.clone(), to.clone());

        match token.reverse().kind() {
            TokenKind::SetColumnType {
                from: rev_from,
                to: rev_to,
                ..
            } => {
                assert_eq!(rev_from, &to);
                assert_eq!(rev_to, &from);
            }
            other => panic!("Expected SetColumnType, got {other:?}"),
        }
    }

    #[test]
    fn test_reverse_nullability_tokens() {
        let token = MergeToken::set_not_null("artist", "name");
        assert_eq!(token.reverse().name(), "Set Allow Null");
        assert_eq!(token.reverse().reverse(), token);
    }

    #[test]
    fn test_database_reverse_excludes_procedures() {
        let token = MergeToken::add_procedure(ProcedureSchema::new("find_artist"));
        assert!(token.database_reverse().is_none());

        let token = MergeToken::add_entity(artist());
        let reverse = token.database_reverse().unwrap();
        assert_eq!(reverse.direction(), MergeDirection::TowardDatabase);
        assert_eq!(reverse.name(), "Drop Entity");
    }

    #[test]
    fn test_execute_then_reverse_restores_model() {
        let mut model = SchemaModel::new("test").entity(artist());
        let before = model.clone();

        let token = MergeToken::add_column("artist", ColumnSchema::new("email", SqlType::Text));
        let mut ctx = MergeContext::new(&mut model);
        token.execute(&mut ctx).unwrap();
        token.reverse().execute(&mut ctx).unwrap();

        assert_eq!(model, before);
    }

    #[test]
    fn test_execute_add_entity_rejects_duplicate() {
        let mut model = SchemaModel::new("test").entity(artist());
        let token = MergeToken::add_entity(artist());

        let mut ctx = MergeContext::new(&mut model);
        let err = token.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateEntity(name) if name == "artist"));
    }

    #[test]
    fn test_execute_add_relationship_requires_source_only() {
        let mut model = SchemaModel::new("test").entity(artist());
        let rel = RelationshipSchema::new("paintings", "artist", "painting", Cardinality::ToMany)
            .join("id", "artist_id");

        // Target entity is absent; the token still applies and the dangling
        // reference is the sanitizer's problem.
        let token = MergeToken::add_relationship(rel);
        let mut ctx = MergeContext::new(&mut model);
        token.execute(&mut ctx).unwrap();
        assert_eq!(model.get_entity("artist").unwrap().relationships.len(), 1);
    }

    #[test]
    fn test_execute_add_relationship_missing_source_fails() {
        let mut model = SchemaModel::new("test");
        let rel = RelationshipSchema::new("paintings", "artist", "painting", Cardinality::ToMany);

        let token = MergeToken::add_relationship(rel);
        let mut ctx = MergeContext::new(&mut model);
        let err = token.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, MergeError::EntityNotFound(name) if name == "artist"));
    }

    #[test]
    fn test_execute_toward_database_without_executor_fails() {
        let mut model = SchemaModel::new("test");
        let token = MergeToken::add_entity(artist()).toward_database();

        let mut ctx = MergeContext::new(&mut model);
        let err = token.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, MergeError::NoDatabaseExecutor(_)));
    }

    #[test]
    fn test_set_procedure_parameters_replaces_wholesale() {
        use schemasync_model::{CallParameter, ParamDirection};

        let old = ProcedureSchema::new("find_artist").parameter(CallParameter::new(
            "artist_name",
            SqlType::Varchar(255),
            ParamDirection::In,
        ));
        let new = ProcedureSchema::new("find_artist")
            .returning_value()
            .parameter(CallParameter::new(
                "result",
                SqlType::Integer,
                ParamDirection::Out,
            ));

        let mut model = SchemaModel::new("test").procedure(old.clone());
        let token = MergeToken::set_procedure_parameters(old, new.clone());
        let mut ctx = MergeContext::new(&mut model);
        token.execute(&mut ctx).unwrap();

        assert_eq!(model.get_procedure("find_artist").unwrap(), &new);
    }
}
