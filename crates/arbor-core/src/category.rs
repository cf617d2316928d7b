//! Category classification for artifact kinds

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ArtifactKind;

/// Top-level grouping key for reported artifacts. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Service,
    Listener,
    Connection,
    EntryPoint,
    Function,
    Type,
    Configurable,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Service,
        Category::Listener,
        Category::Connection,
        Category::EntryPoint,
        Category::Function,
        Category::Type,
        Category::Configurable,
    ];

    /// Map an artifact kind to its category.
    pub fn of(kind: ArtifactKind) -> Category {
        match kind {
            ArtifactKind::ServiceImpl => Category::Service,
            ArtifactKind::Listener => Category::Listener,
            ArtifactKind::Client => Category::Connection,
            ArtifactKind::EntryPoint => Category::EntryPoint,
            ArtifactKind::Function => Category::Function,
            ArtifactKind::Struct
            | ArtifactKind::Enum
            | ArtifactKind::Trait
            | ArtifactKind::TypeAlias => Category::Type,
            ArtifactKind::Constant | ArtifactKind::Static => Category::Configurable,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Service => "service",
            Category::Listener => "listener",
            Category::Connection => "connection",
            Category::EntryPoint => "entryPoint",
            Category::Function => "function",
            Category::Type => "type",
            Category::Configurable => "configurable",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
