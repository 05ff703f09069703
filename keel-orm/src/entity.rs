use crate::declaration::EntityDeclaration;
use crate::error::DataError;
use crate::query::State;
use crate::result::ResultEntity;

/// A Rust type persisted as an entity.
///
/// Intended to be implemented via `#[derive(Entity)]`, which builds the
/// declaration from `#[entity]`, `#[field]`, `#[relation]` and `#[index]`
/// attributes.
///
/// # Example
///
/// ```ignore
/// impl Entity for User {
///     fn class_name() -> &'static str { "User" }
///     fn declaration() -> EntityDeclaration {
///         EntityDeclaration::entity("User", "user")
///             .field("id", FieldAttribute::new("int").primary())
///             .field("email", FieldAttribute::new("string"))
///     }
///     fn to_state(&self) -> State {
///         State::new().with("id", self.id).with("email", self.email.as_str())
///     }
///     fn from_result(result: &ResultEntity) -> Result<Self, DataError> {
///         Ok(Self { id: result.get_as("id")?, email: result.get_as("email")? })
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    fn class_name() -> &'static str;

    fn declaration() -> EntityDeclaration;

    /// Mapped property values, keyed by property name.
    fn to_state(&self) -> State;

    fn from_result(result: &ResultEntity) -> Result<Self, DataError>
    where
        Self: Sized;
}
