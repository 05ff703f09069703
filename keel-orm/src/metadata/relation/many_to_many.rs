use super::{find_counterpart, PropertyRef, RelationMetadataFactory};
use crate::error::MappingError;
use crate::mapping::{
    ConnectionSide, EntitiesConnection, EntityBuilder, Field, FieldSource, Index, IndexType, JunctionLink,
    Relation, RelationKind,
};
use crate::metadata::CompilationContext;

/// Resolves MANY_TO_MANY relations through a synthesized junction entity.
///
/// The junction has an auto-increment `id` and one indexed foreign key per
/// side. Its name comes from both logical table names, so declaring the
/// relation on either side (or both) yields the same junction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyToManyFactory;

/// Column of `class` named by `requested`, or its primary key.
fn linking_column(
    ctx: &CompilationContext<'_>,
    class: &str,
    requested: Option<&String>,
) -> Result<String, MappingError> {
    let builder = ctx.builder(class)?;
    match requested {
        Some(name) => builder
            .field_by_column(name)
            .or_else(|| builder.field_by_property(name))
            .map(|f| f.column.clone())
            .ok_or_else(|| MappingError::UnknownLinkingField {
                class: class.to_string(),
                column: name.clone(),
            }),
        None => builder
            .primary_field()
            .map(|f| f.column.clone())
            .ok_or_else(|| MappingError::MissingPrimaryKey(class.to_string())),
    }
}

impl RelationMetadataFactory for ManyToManyFactory {
    fn supports(&self, property: &PropertyRef, ctx: &CompilationContext<'_>) -> bool {
        property.relation.kind == RelationKind::ManyToMany
            && !ctx.has_entities_connection(&[property.class.as_str(), property.relation.target.as_str()])
    }

    fn create_relation_metadata(
        &self,
        property: &PropertyRef,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<(), MappingError> {
        let current_class = property.class.clone();
        let target_class = property.relation.target.clone();
        let self_referencing = current_class == target_class;

        let reciprocal = find_counterpart(ctx, property, |candidate| {
            candidate.relation.kind == RelationKind::ManyToMany
        })
        .or_else(|| {
            property
                .relation
                .inverse
                .as_ref()
                .map(|spec| PropertyRef::from_inverse(property, spec, RelationKind::ManyToMany))
        });

        let current_link = linking_column(
            ctx,
            &current_class,
            property
                .relation
                .current_field
                .as_ref()
                .or_else(|| reciprocal.as_ref().and_then(|r| r.relation.joining_field.as_ref())),
        )?;
        let target_link = linking_column(
            ctx,
            &target_class,
            property
                .relation
                .joining_field
                .as_ref()
                .or_else(|| reciprocal.as_ref().and_then(|r| r.relation.current_field.as_ref())),
        )?;

        let naming = ctx.naming();
        let config = ctx.config();
        let current_name = ctx.builder(&current_class)?.name().to_string();
        let target_name = ctx.builder(&target_class)?.name().to_string();

        let junction_name = naming.junction_name(&[current_name.as_str(), target_name.as_str()]);
        let junction_table = format!("{}{}", config.table_prefix, junction_name);
        let current_column = naming.foreign_key_name(&current_name, &current_link);
        let target_column = if self_referencing {
            naming.foreign_key_name(&property.property, &target_link)
        } else {
            naming.foreign_key_name(&target_name, &target_link)
        };

        let mut junction = EntityBuilder::new(&junction_name, &junction_name, &junction_table);
        junction.synthetic();
        junction.add_field(Field::auto_id("id", FieldSource::Junction))?;
        for column in [&current_column, &target_column] {
            junction.add_field(Field::foreign_key(column, FieldSource::Junction))?;
            let columns = vec![column.clone()];
            junction.add_index(Index::new(
                naming.index_name(&junction_table, &columns, IndexType::Index),
                IndexType::Index,
                columns,
            ));
        }

        let link = |current: &str, target: &str| JunctionLink {
            class: junction_name.clone(),
            table: junction_table.clone(),
            current_column: current.to_string(),
            target_column: target.to_string(),
        };
        let current_relation = Relation {
            property: property.property.clone(),
            kind: RelationKind::ManyToMany,
            target: target_class.clone(),
            target_field: target_link.clone(),
            current_field: current_link.clone(),
            inverse: false,
            junction: Some(link(&current_column, &target_column)),
        };
        let target_relation = reciprocal.as_ref().map(|r| Relation {
            property: r.property.clone(),
            kind: RelationKind::ManyToMany,
            target: current_class.clone(),
            target_field: current_link.clone(),
            current_field: target_link.clone(),
            inverse: r.inverse,
            junction: Some(link(&target_column, &current_column)),
        });

        let connection = EntitiesConnection {
            kind: RelationKind::ManyToMany,
            sides: vec![
                ConnectionSide {
                    linking_field: current_link,
                    class: current_class.clone(),
                    relation: Some(current_relation),
                },
                ConnectionSide {
                    linking_field: target_link,
                    class: target_class.clone(),
                    relation: target_relation,
                },
            ],
            connector: Some(junction_name.clone()),
            leading: Some(junction_name.clone()),
        };

        ctx.insert_builder(junction);
        ctx.attach(
            &connection,
            &[current_class.as_str(), target_class.as_str(), junction_name.as_str()],
        )?;
        ctx.set_entities_connection(connection);
        tracing::debug!(
            junction = %junction_table,
            current = %current_class,
            target = %target_class,
            "Synthesized junction entity"
        );
        Ok(())
    }
}
