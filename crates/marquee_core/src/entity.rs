//! Entity identity and hierarchy levels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a timed entity, as assigned by the configuration store
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::borrow::Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Position of an entity in the item → group → element hierarchy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    /// Top-level item, owns a line
    #[default]
    Top,
    /// Group nested in a top-level item
    Mid,
    /// Element nested in a group
    Leaf,
}

impl HierarchyLevel {
    /// The level a parent of this level must have
    pub const fn parent_level(self) -> Option<HierarchyLevel> {
        match self {
            HierarchyLevel::Top => None,
            HierarchyLevel::Mid => Some(HierarchyLevel::Top),
            HierarchyLevel::Leaf => Some(HierarchyLevel::Mid),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HierarchyLevel::Top => "top",
            HierarchyLevel::Mid => "mid",
            HierarchyLevel::Leaf => "leaf",
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
