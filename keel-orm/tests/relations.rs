use std::sync::Arc;

use keel_cache::{CachePool, FileStore};
use keel_orm::declaration::{EntityDeclaration, FieldAttribute, RelationAttribute};
use keel_orm::mapping::{FieldSource, IndexType, RelationKind};
use keel_orm::{DataError, MappingError, Orm};

fn user() -> EntityDeclaration {
    EntityDeclaration::entity("User", "user")
        .field("id", FieldAttribute::new("int").primary())
        .field("username", FieldAttribute::new("string").length(64))
        .field("email", FieldAttribute::new("string").index(IndexType::Unique))
}

fn post() -> EntityDeclaration {
    EntityDeclaration::entity("Post", "post")
        .field("id", FieldAttribute::new("int").primary())
        .field("title", FieldAttribute::new("string"))
}

#[test]
fn test_has_many_on_mapped_column_reuses_it() {
    let post = post()
        .field("user_id", FieldAttribute::new("int"))
        .relation("user_id", RelationAttribute::new(RelationKind::HasMany, "User"));
    let orm = Orm::builder().declare(user()).declare(post).build().unwrap();
    let registry = orm.registry();

    assert!(registry.has_entities_connection(&["User", "Post"]));
    assert_eq!(orm.report().connections, 1);

    let post = registry.entity("Post").unwrap();
    assert_eq!(post.entity().fields.len(), 3);
    let relation = post.entity().relation("user_id").unwrap();
    assert_eq!(relation.kind, RelationKind::BelongsTo);
    assert_eq!(relation.target, "User");
    assert_eq!(relation.current_field, "user_id");
    assert_eq!(relation.target_field, "id");

    let user = registry.entity("User").unwrap();
    assert_eq!(user.entity().fields.len(), 3);
    let connection = user.entity().connection_to("Post").unwrap();
    assert_eq!(connection.leading.as_deref(), Some("Post"));
    assert_eq!(
        connection.side("Post").and_then(|s| s.relation.as_ref()).map(|r| r.property.as_str()),
        Some("user_id")
    );
}

#[test]
fn test_relation_declared_on_both_sides_connects_once() {
    let user = user().relation("posts", RelationAttribute::new(RelationKind::HasMany, "Post"));
    let post = post().relation("author", RelationAttribute::new(RelationKind::BelongsTo, "User"));
    let orm = Orm::builder().declare(user).declare(post).build().unwrap();
    let registry = orm.registry();

    assert_eq!(orm.report().connections, 1);
    let post = registry.entity("Post").unwrap();
    let foreign_key = post.entity().field("user_id").unwrap();
    assert_eq!(foreign_key.source, FieldSource::ForeignKey);
    assert!(foreign_key.nullable);
    assert!(post.entity().index("post_user_id_index").is_some());
    assert_eq!(post.entity().relation("author").unwrap().kind, RelationKind::BelongsTo);

    let user = registry.entity("User").unwrap();
    assert_eq!(user.entity().fields.len(), 3);
    let posts = user.entity().relation("posts").unwrap();
    assert_eq!(posts.kind, RelationKind::HasMany);
    assert_eq!(posts.target_field, "user_id");
    assert!(!posts.inverse);
}

#[test]
fn test_one_sided_relation_synthesizes_the_inverse() {
    let comment = EntityDeclaration::entity("Comment", "comment")
        .field("id", FieldAttribute::new("int").primary())
        .relation(
            "post",
            RelationAttribute::new(RelationKind::BelongsTo, "Post").inverse("comments"),
        );
    let orm = Orm::builder().declare(post()).declare(comment).build().unwrap();

    let post = orm.registry().entity("Post").unwrap();
    let comments = post.entity().relation("comments").unwrap();
    assert_eq!(comments.kind, RelationKind::HasMany);
    assert_eq!(comments.target, "Comment");
    assert_eq!(comments.target_field, "post_id");
    assert!(comments.inverse);
}

#[test]
fn test_many_to_many_synthesizes_one_junction() {
    let article = EntityDeclaration::entity("Article", "article")
        .field("id", FieldAttribute::new("int").primary())
        .relation("tags", RelationAttribute::new(RelationKind::ManyToMany, "Tag"));
    let tag = EntityDeclaration::entity("Tag", "tag")
        .field("id", FieldAttribute::new("int").primary())
        .relation("articles", RelationAttribute::new(RelationKind::ManyToMany, "Article"));
    let orm = Orm::builder().declare(tag).declare(article).build().unwrap();
    let registry = orm.registry();

    assert_eq!(orm.report().connections, 1);
    let junctions: Vec<_> = registry
        .get_all_class_metadata()
        .into_iter()
        .filter(|m| m.is_synthetic())
        .collect();
    assert_eq!(junctions.len(), 1);

    let junction = junctions[0].entity();
    assert_eq!(junction.table, "article_tag_connection");
    let columns: Vec<_> = junction.fields.iter().map(|f| f.column.as_str()).collect();
    assert_eq!(columns, ["id", "tag_id", "article_id"]);
    assert!(junction.primary_field().auto_increment);
    for column in ["article_id", "tag_id"] {
        let field = junction.field_by_column(column).unwrap();
        assert_eq!(field.index, Some(IndexType::Index));
        assert!(junction
            .indexes
            .iter()
            .any(|i| i.kind == IndexType::Index && i.columns == [column]));
    }

    let connection = registry.get_entities_connection(&["Article", "Tag"]).unwrap();
    assert_eq!(connection.connector.as_deref(), Some("article_tag_connection"));
    assert_eq!(connection.leading, connection.connector);

    let tags = registry.entity("Article").unwrap().entity().relation("tags").cloned().unwrap();
    let link = tags.junction.unwrap();
    assert_eq!(link.current_column, "article_id");
    assert_eq!(link.target_column, "tag_id");
    assert!(registry.entity("Tag").unwrap().entity().relation("articles").is_some());
}

#[test]
fn test_self_referencing_relation() {
    let node = EntityDeclaration::entity("Node", "node")
        .field("id", FieldAttribute::new("int").primary())
        .relation("parent", RelationAttribute::new(RelationKind::BelongsTo, "Node"))
        .relation("children", RelationAttribute::new(RelationKind::HasMany, "Node"));
    let orm = Orm::builder().declare(node).build().unwrap();

    let node = orm.registry().entity("Node").unwrap();
    let entity = node.entity();
    assert_eq!(entity.connections.len(), 1);
    assert!(entity.field("node_id").is_some());
    assert_eq!(entity.relation("parent").unwrap().kind, RelationKind::BelongsTo);
    assert_eq!(entity.relation("children").unwrap().kind, RelationKind::HasMany);
}

#[test]
fn test_relation_to_unregistered_entity_fails() {
    let post = post().relation("owner", RelationAttribute::new(RelationKind::BelongsTo, "Ghost"));
    let err = Orm::builder().declare(post).build().unwrap_err();
    assert!(matches!(
        err,
        DataError::Mapping(MappingError::EntityNotRegistered(ref class)) if class == "Ghost"
    ));
}

#[test]
fn test_discovered_class_without_declaration_fails() {
    let err = Orm::builder().declare(user()).discover("Invoice").build().unwrap_err();
    assert!(matches!(
        err,
        DataError::Mapping(MappingError::ClassNotFound(ref class)) if class == "Invoice"
    ));
}

#[test]
fn test_restart_on_file_cache_rebuilds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pool = || CachePool::new(Arc::new(FileStore::open(dir.path()).unwrap()), "orm");
    let declare = || {
        Orm::builder()
            .cache(pool())
            .declare(user().relation("posts", RelationAttribute::new(RelationKind::HasMany, "Post")))
            .declare(post())
    };

    let first = declare().build().unwrap();
    assert_eq!(first.report().built, ["User", "Post"]);
    assert!(first.report().saved.contains(&"Post".to_string()));

    let second = declare().build().unwrap();
    assert!(second.report().is_warm());
    assert_eq!(second.report().cached, ["User", "Post"]);
    assert_eq!(
        *second.class_metadata("Post").unwrap().unwrap(),
        *first.class_metadata("Post").unwrap().unwrap()
    );
    assert!(second.registry().has_entities_connection(&["Post", "User"]));
}
