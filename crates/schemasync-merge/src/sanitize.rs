//! Post-merge sanitizer.
//!
//! A partially failed merge can leave relationships whose endpoint entities
//! never materialized. This pass removes them so the invariant "every
//! relationship endpoint resolves to a live entity" holds even after
//! failures, and reports every removal.

use std::collections::HashSet;

use tracing::warn;

use schemasync_model::{RelationshipSchema, SchemaModel};

use crate::context::MergeDelegate;

/// Removes every relationship whose source or target entity is absent from
/// the model. Each removal is logged, reported to the delegate, and
/// returned; nothing is dropped silently.
pub fn sanitize_relationships(
    model: &mut SchemaModel,
    delegate: &mut dyn MergeDelegate,
) -> Vec<RelationshipSchema> {
    let live: HashSet<String> = model.entity_names().map(str::to_string).collect();
    let mut removed = Vec::new();

    for entity in &mut model.entities {
        let mut kept = Vec::with_capacity(entity.relationships.len());
        for relationship in entity.relationships.drain(..) {
            if live.contains(&relationship.source_entity)
                && live.contains(&relationship.target_entity)
            {
                kept.push(relationship);
            } else {
                warn!(
                    relationship = %relationship.name,
                    source = %relationship.source_entity,
                    target = %relationship.target_entity,
                    "Removing relationship with unresolved endpoint"
                );
                removed.push(relationship);
            }
        }
        entity.relationships = kept;
    }

    for relationship in &removed {
        delegate.relationship_removed(relationship);
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoopDelegate;
    use schemasync_model::{Cardinality, ColumnSchema, EntitySchema, SqlType};

    #[test]
    fn test_dangling_relationship_is_removed_and_reported() {
        let mut model = SchemaModel::new("test")
            .entity(EntitySchema::new("e1").column(ColumnSchema::new("id", SqlType::BigInt)));
        let rel = RelationshipSchema::new("to_e2", "e1", "e2", Cardinality::ToOne);
        assert!(model.add_relationship(rel));

        let mut delegate = NoopDelegate;
        let removed = sanitize_relationships(&mut model, &mut delegate);

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].target_entity, "e2");
        assert!(model.get_entity("e1").unwrap().relationships.is_empty());
    }

    #[test]
    fn test_resolvable_relationships_survive() {
        let mut model = SchemaModel::new("test")
            .entity(EntitySchema::new("artist"))
            .entity(EntitySchema::new("painting"));
        let rel = RelationshipSchema::new("paintings", "artist", "painting", Cardinality::ToMany);
        assert!(model.add_relationship(rel));

        let mut delegate = NoopDelegate;
        let removed = sanitize_relationships(&mut model, &mut delegate);

        assert!(removed.is_empty());
        assert_eq!(model.get_entity("artist").unwrap().relationships.len(), 1);
    }

    #[test]
    fn test_delegate_sees_each_removal() {
        struct Counting {
            removed: usize,
        }
        impl MergeDelegate for Counting {
            fn relationship_removed(&mut self, _relationship: &RelationshipSchema) {
                self.removed += 1;
            }
        }

        let mut model = SchemaModel::new("test").entity(EntitySchema::new("e1"));
        assert!(model.add_relationship(RelationshipSchema::new(
            "a",
            "e1",
            "missing_a",
            Cardinality::ToOne
        )));
        assert!(model.add_relationship(RelationshipSchema::new(
            "b",
            "e1",
            "missing_b",
            Cardinality::ToMany
        )));

        let mut delegate = Counting { removed: 0 };
        let removed = sanitize_relationships(&mut model, &mut delegate);

        assert_eq!(removed.len(), 2);
        assert_eq!(delegate.removed, 2);
    }
}
