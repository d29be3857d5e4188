use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The kind of a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    /// Hash based index over encoded values.
    Equality,
    /// B-tree index over numeric values.
    Range,
}

impl Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Equality => write!(f, "equality"),
            IndexKind::Range => write!(f, "range"),
        }
    }
}

/// Describes an index installed on a collection field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexDescriptor {
    field: String,
    kind: IndexKind,
}

impl IndexDescriptor {
    pub fn new(field: &str, kind: IndexKind) -> Self {
        IndexDescriptor {
            field: field.to_string(),
            kind,
        }
    }

    /// The indexed field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }
}

impl Display for IndexDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} index on '{}'", self.kind, self.field)
    }
}
