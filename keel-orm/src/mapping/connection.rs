use serde::{Deserialize, Serialize};

use super::{Relation, RelationKind};

/// Canonical key of a connection: class names sorted and joined by `|`.
///
/// The key does not depend on the order the classes are given in, which is
/// what makes a relation declared on both sides resolve to a single connection.
pub fn connection_key<S: AsRef<str>>(classes: &[S]) -> String {
    let mut names: Vec<&str> = classes.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();
    names.join("|")
}

/// One participant of an [`EntitiesConnection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSide {
    pub linking_field: String,
    pub class: String,
    /// The relation as rendered on this side; `None` when the side does not
    /// expose the relation.
    pub relation: Option<Relation>,
}

/// A resolved relationship between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitiesConnection {
    pub kind: RelationKind,
    pub sides: Vec<ConnectionSide>,
    /// Junction class for many-to-many connections.
    pub connector: Option<String>,
    /// The class that stores the link: the owning side or the junction.
    pub leading: Option<String>,
}

impl EntitiesConnection {
    pub fn key(&self) -> String {
        connection_key(&self.classes())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.sides.iter().map(|side| side.class.as_str()).collect()
    }

    pub fn involves(&self, class: &str) -> bool {
        self.sides.iter().any(|side| side.class == class)
            || self.connector.as_deref() == Some(class)
    }

    pub fn side(&self, class: &str) -> Option<&ConnectionSide> {
        self.sides.iter().find(|side| side.class == class)
    }

    /// Relations rendered on `class`. A self-referencing connection yields both.
    pub fn relations_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.sides
            .iter()
            .filter(move |side| side.class == class)
            .filter_map(|side| side.relation.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        assert_eq!(connection_key(&["User", "Post"]), "Post|User");
        assert_eq!(connection_key(&["Post", "User"]), "Post|User");
        assert_eq!(connection_key(&["Node", "Node"]), "Node|Node");
    }
}
