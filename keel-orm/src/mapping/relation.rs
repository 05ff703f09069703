use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasOne,
    BelongsTo,
    HasMany,
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::HasOne => "has_one",
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::HasMany => "has_many",
            RelationKind::ManyToMany => "many_to_many",
        }
    }

    /// Kinds resolved through a foreign key column on one of the two entities.
    pub fn is_one_to_many(self) -> bool {
        !matches!(self, RelationKind::ManyToMany)
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "has_one" | "hasone" => Ok(RelationKind::HasOne),
            "belongs_to" | "belongsto" => Ok(RelationKind::BelongsTo),
            "has_many" | "hasmany" => Ok(RelationKind::HasMany),
            "many_to_many" | "manytomany" => Ok(RelationKind::ManyToMany),
            other => Err(format!("unknown relation kind '{other}'")),
        }
    }
}

/// Junction table details of a many-to-many relation, seen from one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionLink {
    pub class: String,
    pub table: String,
    /// Junction column referencing the side that owns this relation.
    pub current_column: String,
    /// Junction column referencing the other side.
    pub target_column: String,
}

/// One side's view of a relation between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub property: String,
    pub kind: RelationKind,
    /// Target class name.
    pub target: String,
    /// Linking column on the target.
    pub target_field: String,
    /// Linking column on this side.
    pub current_field: String,
    /// Synthesized rather than declared on this side.
    pub inverse: bool,
    pub junction: Option<JunctionLink>,
}
