//! Declarative index definitions.

use std::fmt;

use bson::{Bson, Document};

/// Kind of a single index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Ascending ordering index.
    Ascending,
    /// Descending ordering index.
    Descending,
    /// Spherical geometry index.
    Sphere2d,
}

impl IndexKind {
    fn as_bson(self) -> Bson {
        match self {
            IndexKind::Ascending => Bson::Int32(1),
            IndexKind::Descending => Bson::Int32(-1),
            IndexKind::Sphere2d => Bson::String("2dsphere".to_string()),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            IndexKind::Ascending => "1",
            IndexKind::Descending => "-1",
            IndexKind::Sphere2d => "2dsphere",
        }
    }
}

/// An index over one or more fields of a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    keys: Vec<(String, IndexKind)>,
    unique: bool,
}

impl IndexDefinition {
    /// Creates a non-unique index on a single field.
    pub fn new(field: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            keys: vec![(field.into(), kind)],
            unique: false,
        }
    }

    /// Adds another key to a compound index.
    pub fn and(mut self, field: impl Into<String>, kind: IndexKind) -> Self {
        self.keys.push((field.into(), kind));
        self
    }

    /// Marks the index as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the indexed keys in order.
    pub fn keys(&self) -> &[(String, IndexKind)] {
        &self.keys
    }

    /// Returns the names of the indexed fields.
    pub fn fields(&self) -> Vec<&str> {
        self.keys.iter().map(|(f, _)| f.as_str()).collect()
    }

    /// Returns true if the index enforces uniqueness.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the conventional index name, e.g. `id_1_collection_1`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, kind)| format!("{}_{}", field, kind.suffix()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Renders the key specification document.
    pub fn key_document(&self) -> Document {
        let mut keys = Document::new();
        for (field, kind) in &self.keys {
            keys.insert(field.clone(), kind.as_bson());
        }
        keys
    }
}

impl fmt::Display for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if self.unique {
            write!(f, " (unique)")?;
        }
        Ok(())
    }
}
