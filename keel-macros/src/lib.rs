extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod crate_path;
pub(crate) mod entity_derive;

/// Derive macro for persisted entities.
///
/// Generates a `keel_orm::Entity` impl: the class name, the entity
/// declaration read by the metadata compiler, and the conversions to a query
/// state and from a result row.
///
/// # Struct-level attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[entity(table = "...")]` | Logical table name (defaults to the snake_case struct name) |
/// | `#[entity(class = "...")]` | Class name (defaults to the struct name) |
/// | `#[entity(comment = "...")]` | Table comment |
/// | `#[index(fields("a", "b"), kind = "unique")]` | Class-level index; repeatable |
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[field]` | Map the field to a column; the type is inferred from the Rust type |
/// | `#[field(type = "...", name = "...", length = N)]` | Explicit logical type, column name, length |
/// | `#[field(primary, index = "unique", hidden, nullable)]` | Key, index and serialization flags |
/// | `#[field(enum_values("a", "b"))]` | Allowed values of an `enum` column |
/// | `#[relation(kind = "has_many", target = "Post")]` | Relation to another entity |
/// | `#[relation(..., joining_field = "...", current_field = "...")]` | Explicit linking columns |
/// | `#[relation(..., inverse = "...", inverse_kind = "...")]` | Synthesize the relation on the target |
///
/// `Option<T>` fields are nullable. Fields without `#[field]` are not
/// persisted and are filled with `Default::default()` when hydrating.
///
/// # Example
///
/// ```ignore
/// #[derive(Entity, Debug, Default)]
/// #[entity(table = "user")]
/// #[index(fields("username", "email"), kind = "unique")]
/// pub struct User {
///     #[field(primary)]
///     pub id: i64,
///     #[field(length = 64)]
///     pub username: String,
///     #[field]
///     pub email: Option<String>,
///     #[relation(kind = "has_many", target = "Post")]
///     pub posts: Vec<Post>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, field, relation, index))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}
