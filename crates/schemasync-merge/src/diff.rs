//! Schema diff engine.
//!
//! Compares two schema models and produces the change tokens that transform
//! the target into structural alignment with the source. The diff is
//! stateless and order-independent: re-running it on the same two snapshots
//! always yields the same token set.

use std::collections::HashMap;

use tracing::warn;

use schemasync_model::{
    ColumnSchema, EntitySchema, ProcedureSchema, RelationshipSchema, SchemaModel,
};

use crate::token::MergeToken;

/// Options for the diff engine.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Whether entity, column, and procedure names compare
    /// case-insensitively.
    pub case_insensitive: bool,
    /// Whether stored procedures participate in the diff.
    pub include_procedures: bool,
}

impl DiffOptions {
    /// Creates default options: case-sensitive, procedures excluded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables case-insensitive name comparison.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Includes stored procedures in the diff.
    #[must_use]
    pub fn with_procedures(mut self) -> Self {
        self.include_procedures = true;
        self
    }
}

/// Computes the change tokens between two schema models.
#[derive(Debug, Default)]
pub struct SchemaDiff {
    options: DiffOptions,
}

impl SchemaDiff {
    /// Creates a diff engine with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a diff engine with custom options.
    #[must_use]
    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compares two models and returns the tokens needed to transform
    /// `target` into structural alignment with `source`. Tokens come back
    /// unordered; run them through the sequencer before executing.
    #[must_use]
    pub fn diff(&self, target: &SchemaModel, source: &SchemaModel) -> Vec<MergeToken> {
        let mut tokens = Vec::new();

        let target_entities: HashMap<String, &EntitySchema> = target
            .entities
            .iter()
            .map(|e| (self.key(&e.name), e))
            .collect();
        let source_entities: HashMap<String, &EntitySchema> = source
            .entities
            .iter()
            .map(|e| (self.key(&e.name), e))
            .collect();

        // Entities only in the source: added, columns and all. Their
        // relationships arrive through the relationship pass below.
        for entity in &source.entities {
            match target_entities.get(&self.key(&entity.name)) {
                None => tokens.push(MergeToken::add_entity(EntitySchema {
                    relationships: Vec::new(),
                    ..entity.clone()
                })),
                Some(existing) => self.diff_entity(existing, entity, &mut tokens),
            }
        }

        // Entities only in the target: dropped.
        for entity in &target.entities {
            if !source_entities.contains_key(&self.key(&entity.name)) {
                tokens.push(MergeToken::drop_entity(entity.clone()));
            }
        }

        // Relationships compare after every entity and column token is
        // computed.
        self.diff_relationships(target, source, &target_entities, &source_entities, &mut tokens);

        if self.options.include_procedures {
            self.diff_procedures(target, source, &mut tokens);
        }

        tokens
    }

    fn key(&self, name: &str) -> String {
        if self.options.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Compares the columns of two matched entities.
    fn diff_entity(
        &self,
        target: &EntitySchema,
        source: &EntitySchema,
        tokens: &mut Vec<MergeToken>,
    ) {
        let target_cols: HashMap<String, &ColumnSchema> = target
            .columns
            .iter()
            .map(|c| (self.key(&c.name), c))
            .collect();
        let source_cols: HashMap<String, &ColumnSchema> = source
            .columns
            .iter()
            .map(|c| (self.key(&c.name), c))
            .collect();

        for column in &source.columns {
            match target_cols.get(&self.key(&column.name)) {
                None => tokens.push(MergeToken::add_column(&target.name, column.clone())),
                Some(existing) => {
                    if existing.sql_type != column.sql_type {
                        tokens.push(MergeToken::set_column_type(
                            &target.name,
                            (*existing).clone(),
                            column.clone(),
                        ));
                    }
                    if existing.nullable != column.nullable {
                        if column.nullable {
                            tokens.push(MergeToken::set_allow_null(&target.name, &existing.name));
                        } else {
                            tokens.push(MergeToken::set_not_null(&target.name, &existing.name));
                        }
                    }
                    if existing.primary_key != column.primary_key {
                        if column.primary_key {
                            tokens.push(MergeToken::add_primary_key(&target.name, &existing.name));
                        } else {
                            tokens.push(MergeToken::drop_primary_key(&target.name, &existing.name));
                        }
                    }
                }
            }
        }

        for column in &target.columns {
            if !source_cols.contains_key(&self.key(&column.name)) {
                tokens.push(MergeToken::drop_column(&target.name, column.clone()));
            }
        }
    }

    /// Compares relationship sets by (source, target, join-columns)
    /// identity. Relationships of newly added source entities participate;
    /// relationships retired along with a dropped entity do not need their
    /// own tokens.
    fn diff_relationships(
        &self,
        target: &SchemaModel,
        source: &SchemaModel,
        target_entities: &HashMap<String, &EntitySchema>,
        source_entities: &HashMap<String, &EntitySchema>,
        tokens: &mut Vec<MergeToken>,
    ) {
        for entity in &source.entities {
            let counterpart = target_entities.get(&self.key(&entity.name)).copied();
            for relationship in &entity.relationships {
                if !source_entities.contains_key(&self.key(&relationship.target_entity)) {
                    warn!(
                        relationship = %relationship.name,
                        target = %relationship.target_entity,
                        "Skipping relationship with unresolved target entity"
                    );
                    continue;
                }

                let already_present = counterpart.is_some_and(|t| {
                    t.relationships
                        .iter()
                        .any(|r| self.same_relationship(r, relationship))
                });
                if !already_present {
                    tokens.push(MergeToken::add_relationship(relationship.clone()));
                }
            }
        }

        for entity in &target.entities {
            let Some(counterpart) = source_entities.get(&self.key(&entity.name)).copied() else {
                continue;
            };
            for relationship in &entity.relationships {
                let still_present = counterpart
                    .relationships
                    .iter()
                    .any(|r| self.same_relationship(r, relationship));
                if !still_present {
                    tokens.push(MergeToken::drop_relationship(relationship.clone()));
                }
            }
        }
    }

    fn same_relationship(&self, a: &RelationshipSchema, b: &RelationshipSchema) -> bool {
        self.key(&a.source_entity) == self.key(&b.source_entity)
            && self.key(&a.target_entity) == self.key(&b.target_entity)
            && a.joins.len() == b.joins.len()
            && a.joins.iter().zip(&b.joins).all(|(x, y)| {
                self.key(&x.source_column) == self.key(&y.source_column)
                    && self.key(&x.target_column) == self.key(&y.target_column)
            })
    }

    /// Compares procedures by name. A differing definition is replaced
    /// wholesale; parameter lists are never patched.
    fn diff_procedures(
        &self,
        target: &SchemaModel,
        source: &SchemaModel,
        tokens: &mut Vec<MergeToken>,
    ) {
        let target_procs: HashMap<String, &ProcedureSchema> = target
            .procedures
            .iter()
            .map(|p| (self.key(&p.name), p))
            .collect();
        let source_procs: HashMap<String, &ProcedureSchema> = source
            .procedures
            .iter()
            .map(|p| (self.key(&p.name), p))
            .collect();

        for procedure in &source.procedures {
            match target_procs.get(&self.key(&procedure.name)) {
                None => tokens.push(MergeToken::add_procedure(procedure.clone())),
                Some(existing) => {
                    if Self::procedures_differ(existing, procedure) {
                        tokens.push(MergeToken::set_procedure_parameters(
                            (*existing).clone(),
                            procedure.clone(),
                        ));
                    }
                }
            }
        }

        for procedure in &target.procedures {
            if !source_procs.contains_key(&self.key(&procedure.name)) {
                tokens.push(MergeToken::drop_procedure(procedure.clone()));
            }
        }
    }

    fn procedures_differ(a: &ProcedureSchema, b: &ProcedureSchema) -> bool {
        a.parameters != b.parameters
            || a.returning_value != b.returning_value
            || a.schema != b.schema
            || a.catalog != b.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use schemasync_model::{CallParameter, Cardinality, ParamDirection, SqlType};

    fn differ() -> SchemaDiff {
        SchemaDiff::new()
    }

    fn names(tokens: &[MergeToken]) -> Vec<(&'static str, String)> {
        tokens.iter().map(MergeToken::describe).collect()
    }

    #[test]
    fn test_detect_new_entity() {
        let target = SchemaModel::new("existing");
        let source = SchemaModel::new("loaded").entity(
            EntitySchema::new("artist")
                .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
                .column(ColumnSchema::new("name", SqlType::Text)),
        );

        let tokens = differ().diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        match tokens[0].kind() {
            TokenKind::AddEntity { entity } => {
                assert_eq!(entity.name, "artist");
                assert_eq!(entity.columns.len(), 2);
            }
            other => panic!("Expected AddEntity, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_dropped_entity() {
        let target = SchemaModel::new("existing").entity(
            EntitySchema::new("artist").column(ColumnSchema::new("id", SqlType::BigInt)),
        );
        let source = SchemaModel::new("loaded");

        let tokens = differ().diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Drop Entity");
    }

    #[test]
    fn test_detect_new_and_dropped_columns() {
        let target = SchemaModel::new("existing").entity(
            EntitySchema::new("artist")
                .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
                .column(ColumnSchema::new("old_field", SqlType::Text)),
        );
        let source = SchemaModel::new("loaded").entity(
            EntitySchema::new("artist")
                .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
                .column(ColumnSchema::new("email", SqlType::Text)),
        );

        let tokens = differ().diff(&target, &source);
        let described = names(&tokens);
        assert!(described.contains(&("Add Column", "artist.email".to_string())));
        assert!(described.contains(&("Drop Column", "artist.old_field".to_string())));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_detect_column_type_change() {
        let target = SchemaModel::new("existing").entity(
            EntitySchema::new("artist").column(ColumnSchema::new("age", SqlType::Integer)),
        );
        let source = SchemaModel::new("loaded").entity(
            EntitySchema::new("artist").column(ColumnSchema::new("age", SqlType::BigInt)),
        );

        let tokens = differ().diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        match tokens[0].kind() {
            TokenKind::SetColumnType { from, to, .. } => {
                assert_eq!(from.sql_type, SqlType::Integer);
                assert_eq!(to.sql_type, SqlType::BigInt);
            }
            other => panic!("Expected SetColumnType, got {other:?}"),
        }
    }

    #[test]
    fn test_detect_nullability_change() {
        let target = SchemaModel::new("existing").entity(
            EntitySchema::new("artist").column(ColumnSchema::new("name", SqlType::Text)),
        );
        let source = SchemaModel::new("loaded").entity(
            EntitySchema::new("artist").column(ColumnSchema::new("name", SqlType::Text).not_null()),
        );

        let tokens = differ().diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Set Not Null");

        // And the other way around.
        let tokens = differ().diff(&source, &target);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Set Allow Null");
    }

    #[test]
    fn test_detect_primary_key_change() {
        let target = SchemaModel::new("existing").entity(
            EntitySchema::new("artist")
                .column(ColumnSchema::new("id", SqlType::BigInt))
                .column(ColumnSchema::new("code", SqlType::Text).primary_key()),
        );
        let source = SchemaModel::new("loaded").entity(
            EntitySchema::new("artist")
                .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
                .column(ColumnSchema::new("code", SqlType::Text).not_null()),
        );

        let tokens = differ().diff(&target, &source);
        let described = names(&tokens);
        assert!(described.contains(&("Add Primary Key", "artist.id".to_string())));
        assert!(described.contains(&("Drop Primary Key", "artist.code".to_string())));
    }

    #[test]
    fn test_detect_relationship_addition_and_removal() {
        let artist = EntitySchema::new("artist").column(ColumnSchema::new("id", SqlType::BigInt));
        let painting =
            EntitySchema::new("painting").column(ColumnSchema::new("id", SqlType::BigInt));

        let target = SchemaModel::new("existing")
            .entity(artist.clone())
            .entity(painting.clone());

        let mut source = SchemaModel::new("loaded").entity(artist).entity(painting);
        let rel = RelationshipSchema::new("paintings", "artist", "painting", Cardinality::ToMany)
            .join("id", "artist_id");
        assert!(source.add_relationship(rel.clone()));

        let tokens = differ().diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Add Relationship");

        let tokens = differ().diff(&source, &target);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Drop Relationship");
    }

    #[test]
    fn test_malformed_relationship_is_skipped() {
        let target = SchemaModel::new("existing")
            .entity(EntitySchema::new("artist").column(ColumnSchema::new("id", SqlType::BigInt)));

        // Snapshot contains a relationship pointing at an entity it does not
        // define; the diff recovers by skipping it.
        let mut source = SchemaModel::new("loaded")
            .entity(EntitySchema::new("artist").column(ColumnSchema::new("id", SqlType::BigInt)));
        let rel = RelationshipSchema::new("ghost", "artist", "missing", Cardinality::ToOne);
        assert!(source.add_relationship(rel));

        let tokens = differ().diff(&target, &source);
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_case_insensitive_matching() {
        let target = SchemaModel::new("existing").entity(
            EntitySchema::new("ARTIST").column(ColumnSchema::new("ID", SqlType::BigInt)),
        );
        let source = SchemaModel::new("loaded").entity(
            EntitySchema::new("artist").column(ColumnSchema::new("id", SqlType::BigInt)),
        );

        // Case-sensitive: nothing matches, so everything is dropped and
        // re-added.
        assert!(!differ().diff(&target, &source).is_empty());

        // Case-insensitive: the models align.
        let relaxed = SchemaDiff::with_options(DiffOptions::new().case_insensitive());
        assert!(relaxed.diff(&target, &source).is_empty());
    }

    #[test]
    fn test_procedures_excluded_by_default() {
        let target = SchemaModel::new("existing");
        let source = SchemaModel::new("loaded").procedure(ProcedureSchema::new("find_artist"));

        assert!(differ().diff(&target, &source).is_empty());

        let with_procs = SchemaDiff::with_options(DiffOptions::new().with_procedures());
        let tokens = with_procs.diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Add Procedure");
    }

    #[test]
    fn test_procedure_parameter_change_is_replacement() {
        let old = ProcedureSchema::new("find_artist").parameter(CallParameter::new(
            "artist_name",
            SqlType::Varchar(255),
            ParamDirection::In,
        ));
        let new = ProcedureSchema::new("find_artist").parameter(CallParameter::new(
            "artist_id",
            SqlType::BigInt,
            ParamDirection::In,
        ));

        let target = SchemaModel::new("existing").procedure(old);
        let source = SchemaModel::new("loaded").procedure(new);

        let with_procs = SchemaDiff::with_options(DiffOptions::new().with_procedures());
        let tokens = with_procs.diff(&target, &source);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name(), "Set Procedure Parameters");
    }

    #[test]
    fn test_no_changes() {
        let model = SchemaModel::new("m").entity(
            EntitySchema::new("artist")
                .column(ColumnSchema::new("id", SqlType::BigInt).primary_key())
                .column(ColumnSchema::new("name", SqlType::Text)),
        );

        assert!(differ().diff(&model, &model).is_empty());
    }

    #[test]
    fn test_diff_is_deterministic_as_a_set() {
        let target = SchemaModel::new("existing")
            .entity(EntitySchema::new("artist").column(ColumnSchema::new("id", SqlType::BigInt)))
            .entity(EntitySchema::new("gallery").column(ColumnSchema::new("id", SqlType::BigInt)));
        let source = SchemaModel::new("loaded")
            .entity(
                EntitySchema::new("artist")
                    .column(ColumnSchema::new("id", SqlType::BigInt))
                    .column(ColumnSchema::new("name", SqlType::Text)),
            )
            .entity(EntitySchema::new("painting").column(ColumnSchema::new("id", SqlType::BigInt)));

        let mut first = names(&differ().diff(&target, &source));
        let mut second = names(&differ().diff(&target, &source));
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }

    // The concrete scenario from the import contract: one new column, one
    // new entity, one new relationship; exactly three tokens.
    #[test]
    fn test_three_token_scenario() {
        let target = SchemaModel::new("existing")
            .entity(EntitySchema::new("e1").column(ColumnSchema::new("id", SqlType::BigInt)));

        let mut source = SchemaModel::new("loaded")
            .entity(
                EntitySchema::new("e1")
                    .column(ColumnSchema::new("id", SqlType::BigInt))
                    .column(ColumnSchema::new("name", SqlType::Text)),
            )
            .entity(EntitySchema::new("e2").column(ColumnSchema::new("id", SqlType::BigInt)));
        let rel = RelationshipSchema::new("to_e2", "e1", "e2", Cardinality::ToOne).join("id", "id");
        assert!(source.add_relationship(rel));

        let tokens = differ().diff(&target, &source);
        let described = names(&tokens);

        assert_eq!(tokens.len(), 3);
        assert!(described.contains(&("Add Column", "e1.name".to_string())));
        assert!(described.contains(&("Add Entity", "e2".to_string())));
        assert!(described.contains(&("Add Relationship", "e1 -> e2".to_string())));
    }
}
