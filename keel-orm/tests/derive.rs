use std::collections::BTreeMap;

use keel_orm::mapping::{FieldSource, IndexType, RelationKind};
use keel_orm::{Entity, Orm, ResultEntity, Value};

#[derive(Entity, Debug, Default, PartialEq)]
#[entity(table = "user", comment = "registered users")]
#[index(fields("username", "email"), kind = "unique")]
pub struct User {
    #[field(primary)]
    pub id: i64,
    #[field(length = 64)]
    pub username: String,
    #[field]
    pub email: Option<String>,
    #[field(hidden)]
    pub password: String,
    #[field(enum_values("active", "banned"))]
    pub status: String,
    #[relation(kind = "has_many", target = "Post")]
    pub posts: Vec<Post>,
}

#[derive(Entity, Debug, Default, PartialEq)]
pub struct Post {
    #[field(primary)]
    pub id: i64,
    #[field(type = "text")]
    pub body: String,
    #[field(name = "author_id")]
    #[relation(kind = "belongs_to", target = "User")]
    pub author: Option<i64>,
}

#[test]
fn test_declaration_reflects_attributes() {
    let declaration = User::declaration();
    assert_eq!(User::class_name(), "User");

    let entity = declaration.entity.as_ref().unwrap();
    assert_eq!(entity.table, "user");
    assert_eq!(entity.comment.as_deref(), Some("registered users"));

    let id = declaration.property_named("id").and_then(|p| p.field.as_ref()).unwrap();
    assert!(id.primary);
    assert_eq!(id.type_name, "int");

    let email = declaration.property_named("email").and_then(|p| p.field.as_ref()).unwrap();
    assert!(email.nullable);

    let status = declaration.property_named("status").and_then(|p| p.field.as_ref()).unwrap();
    assert_eq!(status.type_name, "enum");
    assert_eq!(status.enum_values.as_deref(), Some(&["active".to_string(), "banned".to_string()][..]));

    let posts = declaration.property_named("posts").unwrap();
    assert!(posts.field.is_none());
    assert_eq!(posts.relation.as_ref().unwrap().kind, RelationKind::HasMany);

    assert_eq!(declaration.indexes.len(), 1);
    assert_eq!(declaration.indexes[0].kind, IndexType::Unique);
}

#[test]
fn test_default_table_name_is_snake_case() {
    let declaration = Post::declaration();
    assert_eq!(declaration.entity.unwrap().table, "post");
}

#[test]
fn test_state_and_result_conversions() {
    let user = User {
        id: 4,
        username: "ada".into(),
        email: None,
        password: "hash".into(),
        status: "active".into(),
        posts: Vec::new(),
    };
    let state = user.to_state();
    assert_eq!(state.value("id"), Some(&Value::Int(4)));
    assert_eq!(state.value("email"), Some(&Value::Null));
    assert!(state.value("posts").is_none());

    let values: BTreeMap<String, Value> = [
        ("id", Value::Int(4)),
        ("username", Value::from("ada")),
        ("email", Value::Null),
        ("password", Value::from("hash")),
        ("status", Value::from("active")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let result = ResultEntity::from_map("User", values);
    assert_eq!(User::from_result(&result).unwrap(), user);
}

#[test]
fn test_derived_entities_compile_into_metadata() {
    let orm = Orm::builder().register::<User>().register::<Post>().build().unwrap();
    let registry = orm.registry();

    let post = registry.entity("Post").unwrap();
    let author = post.entity().field("author").unwrap();
    assert_eq!(author.column, "author_id");
    assert_eq!(author.source, FieldSource::Declared);
    assert!(author.nullable);

    let user = registry.entity("User").unwrap();
    let posts = user.entity().relation("posts").unwrap();
    assert_eq!(posts.target_field, "author_id");
    assert!(user
        .entity()
        .index("user_username_email_unique")
        .is_some_and(|i| i.columns == ["username", "email"]));
    assert!(!user.entity().field("password").unwrap().serialize);
}
