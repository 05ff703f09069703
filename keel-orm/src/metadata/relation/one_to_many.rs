use super::{find_counterpart, PropertyRef, RelationMetadataFactory};
use crate::error::MappingError;
use crate::mapping::{
    ConnectionSide, EntitiesConnection, Field, FieldSource, Index, IndexType, Relation, RelationKind,
};
use crate::metadata::CompilationContext;

/// Resolves HAS_ONE, BELONGS_TO and HAS_MANY relations through a foreign key
/// column on the owning entity.
///
/// HAS_ONE and BELONGS_TO are owned by the declaring entity. HAS_MANY is owned
/// by the target (the many side), unless the declaring property is itself a
/// mapped column: then that column already is the foreign key and the
/// declaring entity owns it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToManyFactory;

/// Kind of the relation rendered on the owning entity.
fn owning_kind(declared: RelationKind) -> RelationKind {
    match declared {
        RelationKind::HasMany => RelationKind::BelongsTo,
        other => other,
    }
}

/// Kind of the relation rendered on the passive entity, from the owning one.
fn passive_kind(owning: RelationKind) -> RelationKind {
    match owning {
        RelationKind::HasOne => RelationKind::HasOne,
        _ => RelationKind::HasMany,
    }
}

fn declaring_owns(property: &PropertyRef) -> bool {
    match property.relation.kind {
        RelationKind::HasMany => property.field_backed,
        _ => true,
    }
}

impl RelationMetadataFactory for OneToManyFactory {
    fn supports(&self, property: &PropertyRef, ctx: &CompilationContext<'_>) -> bool {
        property.relation.kind.is_one_to_many()
            && !ctx.has_entities_connection(&[property.class.as_str(), property.relation.target.as_str()])
    }

    fn create_relation_metadata(
        &self,
        property: &PropertyRef,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<(), MappingError> {
        let counterpart = find_counterpart(ctx, property, |candidate| candidate.relation.kind.is_one_to_many());
        let synthesized = || {
            property.relation.inverse.as_ref().map(|spec| {
                let derived = if declaring_owns(property) {
                    passive_kind(owning_kind(property.relation.kind))
                } else {
                    RelationKind::BelongsTo
                };
                PropertyRef::from_inverse(property, spec, derived)
            })
        };
        let other = counterpart.or_else(synthesized);

        let (owning, passive) = if declaring_owns(property) {
            (Some(property.clone()), other)
        } else {
            (other, Some(property.clone()))
        };
        let (owning_class, passive_class) = if declaring_owns(property) {
            (property.class.clone(), property.relation.target.clone())
        } else {
            (property.relation.target.clone(), property.class.clone())
        };

        // Passive link: the column the foreign key points at, the primary key by default.
        let passive_link = {
            let builder = ctx.builder(&passive_class)?;
            let requested = passive
                .as_ref()
                .and_then(|p| p.relation.current_field.clone())
                .or_else(|| owning.as_ref().and_then(|o| o.relation.joining_field.clone()));
            match requested {
                Some(name) => builder
                    .field_by_column(&name)
                    .or_else(|| builder.field_by_property(&name))
                    .map(|f| f.column.clone())
                    .ok_or(MappingError::UnknownLinkingField {
                        class: passive_class.clone(),
                        column: name,
                    })?,
                None => builder
                    .primary_field()
                    .map(|f| f.column.clone())
                    .ok_or_else(|| MappingError::MissingPrimaryKey(passive_class.clone()))?,
            }
        };
        let passive_table = ctx.builder(&passive_class)?.name().to_string();

        let naming = ctx.naming();
        let owning_builder = ctx.builder(&owning_class)?;
        let foreign_key = owning
            .as_ref()
            .and_then(|o| o.relation.current_field.clone())
            .or_else(|| passive.as_ref().and_then(|p| p.relation.joining_field.clone()))
            .or_else(|| {
                owning
                    .as_ref()
                    .filter(|o| o.field_backed)
                    .and_then(|o| owning_builder.field_by_property(&o.property))
                    .map(|f| f.column.clone())
            })
            .unwrap_or_else(|| naming.foreign_key_name(&passive_table, &passive_link));

        let reused = owning_builder.field_by_column(&foreign_key).is_some();
        let owning_table = owning_builder.table().to_string();
        if !reused {
            let builder = ctx.builder_mut(&owning_class)?;
            builder.add_field(Field::foreign_key(&foreign_key, FieldSource::ForeignKey))?;
            let columns = vec![foreign_key.clone()];
            builder.add_index(Index::new(
                naming.index_name(&owning_table, &columns, IndexType::Index),
                IndexType::Index,
                columns,
            ));
        }

        let owning_relation_kind = owning
            .as_ref()
            .map_or(RelationKind::BelongsTo, |o| owning_kind(o.relation.kind));
        let owning_relation = owning.as_ref().map(|o| Relation {
            property: o.property.clone(),
            kind: owning_relation_kind,
            target: passive_class.clone(),
            target_field: passive_link.clone(),
            current_field: foreign_key.clone(),
            inverse: o.inverse,
            junction: None,
        });
        let passive_relation = passive.as_ref().map(|p| Relation {
            property: p.property.clone(),
            kind: p.relation.kind,
            target: owning_class.clone(),
            target_field: foreign_key.clone(),
            current_field: passive_link.clone(),
            inverse: p.inverse,
            junction: None,
        });

        let one_to_one = owning_relation_kind == RelationKind::HasOne
            || passive_relation.as_ref().is_some_and(|r| r.kind == RelationKind::HasOne);
        let kind = if one_to_one { RelationKind::HasOne } else { RelationKind::HasMany };
        let connection = EntitiesConnection {
            kind,
            sides: vec![
                ConnectionSide {
                    linking_field: foreign_key.clone(),
                    class: owning_class.clone(),
                    relation: owning_relation,
                },
                ConnectionSide {
                    linking_field: passive_link,
                    class: passive_class.clone(),
                    relation: passive_relation,
                },
            ],
            connector: None,
            leading: Some(owning_class.clone()),
        };

        ctx.attach(&connection, &[owning_class.as_str(), passive_class.as_str()])?;
        ctx.set_entities_connection(connection);
        tracing::debug!(
            owning = %owning_class,
            passive = %passive_class,
            foreign_key = %foreign_key,
            reused,
            "Resolved one-to-many relation"
        );
        Ok(())
    }
}
