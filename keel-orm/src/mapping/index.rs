use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Primary,
    Index,
    Unique,
}

impl IndexType {
    pub fn as_str(self) -> &'static str {
        match self {
            IndexType::Primary => "primary",
            IndexType::Index => "index",
            IndexType::Unique => "unique",
        }
    }
}

impl FromStr for IndexType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(IndexType::Primary),
            "index" => Ok(IndexType::Index),
            "unique" => Ok(IndexType::Unique),
            other => Err(format!("unknown index type '{other}'")),
        }
    }
}

/// A named index over an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub kind: IndexType,
    pub columns: Vec<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, kind: IndexType, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.kind == IndexType::Primary
    }
}
