use crate::catalog::{entity_attribute, field_attributes, index_attributes};
use crate::config::OrmConfig;
use crate::declaration::EntityDeclaration;
use crate::error::MappingError;
use crate::mapping::{EntityBuilder, Field, FieldSource, Index, IndexType, NamingStrategy};
use crate::types::TypeRegistry;

/// Build the table part of an entity: fields, per-field indexes and
/// class-level indexes. Relations are resolved later, on the same builder.
pub fn build_entity(
    declaration: &EntityDeclaration,
    types: &TypeRegistry,
    naming: &dyn NamingStrategy,
    config: &OrmConfig,
) -> Result<EntityBuilder, MappingError> {
    let attribute = entity_attribute(declaration)?;
    let table = format!("{}{}", config.table_prefix, attribute.table);
    let mut builder = EntityBuilder::new(&declaration.class, &attribute.table, &table);
    builder.comment(attribute.comment.clone());

    for (property, attr) in field_attributes(declaration) {
        if !types.contains(&attr.type_name) {
            tracing::warn!(
                class = %declaration.class,
                property = %property.name,
                type_name = %attr.type_name,
                "Unknown field type, values will pass through unconverted"
            );
        }
        let primary = attr.primary || attr.index == Some(IndexType::Primary);
        let mut field = Field::new(&property.name, &attr.type_name);
        field.column = attr.name.clone().unwrap_or_else(|| property.name.clone());
        field.length = attr.length;
        field.enum_values = attr.enum_values.clone();
        field.serialize = attr.serialize;
        field.primary = primary;
        field.nullable = attr.nullable && !primary;
        field.auto_increment = primary && attr.type_name == "int";
        field.index = if primary { Some(IndexType::Primary) } else { attr.index };
        field.source = FieldSource::Declared;

        let column = field.column.clone();
        let index = field.index;
        builder.add_field(field)?;
        if let Some(kind) = index {
            let columns = vec![column];
            builder.add_index(Index::new(naming.index_name(&table, &columns, kind), kind, columns));
        }
    }

    if builder.primary_field().is_none() {
        return Err(MappingError::MissingPrimaryKey(declaration.class.clone()));
    }

    for attr in index_attributes(declaration) {
        let columns = attr
            .fields
            .iter()
            .map(|name| {
                builder
                    .field_by_property(name)
                    .or_else(|| builder.field_by_column(name))
                    .map(|f| f.column.clone())
                    .ok_or_else(|| MappingError::UnknownIndexField {
                        class: declaration.class.clone(),
                        field: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        builder.add_index(Index::new(naming.index_name(&table, &columns, attr.kind), attr.kind, columns));
    }

    tracing::debug!(
        class = %declaration.class,
        table = %table,
        fields = builder.fields().len(),
        "Built entity fields"
    );
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{FieldAttribute, IndexAttribute};
    use crate::mapping::DefaultNamingStrategy;

    fn config() -> OrmConfig {
        OrmConfig {
            table_prefix: "app_".into(),
            ..OrmConfig::default()
        }
    }

    fn build(declaration: &EntityDeclaration) -> Result<EntityBuilder, MappingError> {
        build_entity(declaration, &TypeRegistry::with_defaults(), &DefaultNamingStrategy, &config())
    }

    #[test]
    fn fields_and_indexes_are_derived_from_attributes() {
        let declaration = EntityDeclaration::entity("User", "user")
            .comment("accounts")
            .field("id", FieldAttribute::new("int").primary())
            .field("email", FieldAttribute::new("string").index(IndexType::Unique))
            .field("createdAt", FieldAttribute::new("datetime").name("created_at").nullable())
            .field("password", FieldAttribute::new("string").hidden())
            .index(IndexAttribute::new(["email", "createdAt"], IndexType::Index));
        let entity = build(&declaration).unwrap().build().unwrap();

        assert_eq!(entity.table, "app_user");
        assert_eq!(entity.name, "user");
        assert_eq!(entity.comment.as_deref(), Some("accounts"));
        let id = entity.primary_field();
        assert!(id.auto_increment);
        assert!(!id.nullable);
        assert_eq!(entity.field("createdAt").unwrap().column, "created_at");
        assert!(!entity.field("password").unwrap().serialize);

        let names: Vec<_> = entity.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            ["PRIMARY", "app_user_email_unique", "app_user_email_created_at_index"]
        );
    }

    #[test]
    fn missing_primary_key_fails_early() {
        let declaration = EntityDeclaration::entity("Log", "log").field("line", FieldAttribute::new("text"));
        assert_eq!(build(&declaration).unwrap_err(), MappingError::MissingPrimaryKey("Log".into()));
    }

    #[test]
    fn two_primary_keys_fail() {
        let declaration = EntityDeclaration::entity("Pair", "pair")
            .field("a", FieldAttribute::new("int").primary())
            .field("b", FieldAttribute::new("int").primary());
        assert!(matches!(build(&declaration), Err(MappingError::MultiplePrimaryKeys { .. })));
    }

    #[test]
    fn index_on_unknown_property_fails() {
        let declaration = EntityDeclaration::entity("User", "user")
            .field("id", FieldAttribute::new("int").primary())
            .index(IndexAttribute::new(["nope"], IndexType::Index));
        assert_eq!(
            build(&declaration).unwrap_err(),
            MappingError::UnknownIndexField {
                class: "User".into(),
                field: "nope".into()
            }
        );
    }

    #[test]
    fn not_an_entity_is_rejected() {
        assert_eq!(
            build(&EntityDeclaration::new("Dto")).unwrap_err(),
            MappingError::NotAnEntity("Dto".into())
        );
    }
}
