//! Configuration error types

use crate::entity::{EntityId, HierarchyLevel};
use thiserror::Error;

/// Reasons an entity record cannot be evaluated
///
/// These never escape the evaluator: the offending entity and its subtree are
/// skipped and reported alongside the frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A field required for this hierarchy level is absent
    #[error("entity `{entity}`: missing required field `{field}`")]
    MissingField {
        entity: EntityId,
        field: &'static str,
    },

    /// A field is present but out of range
    #[error("entity `{entity}`: invalid `{field}`: {reason}")]
    InvalidField {
        entity: EntityId,
        field: &'static str,
        reason: String,
    },

    /// End time precedes start time
    #[error("entity `{entity}`: end time {end} precedes start time {start}")]
    InvertedWindow {
        entity: EntityId,
        start: f64,
        end: f64,
    },

    /// Another entity already uses this id
    #[error("entity `{0}`: duplicate id")]
    DuplicateId(EntityId),

    /// The referenced parent does not exist
    #[error("entity `{entity}`: parent `{parent}` not found")]
    UnknownParent { entity: EntityId, parent: EntityId },

    /// A nested entity has no parent reference
    #[error("entity `{entity}`: {level} entity requires a parent")]
    MissingParent {
        entity: EntityId,
        level: HierarchyLevel,
    },

    /// A top-level entity references a parent
    #[error("entity `{entity}`: top-level entity cannot have a parent")]
    UnexpectedParent { entity: EntityId },

    /// Parent exists but sits at the wrong level
    #[error("entity `{entity}`: {level} entity cannot be nested under a {parent_level} entity")]
    LevelMismatch {
        entity: EntityId,
        level: HierarchyLevel,
        parent_level: HierarchyLevel,
    },

    /// The window derived from the parent is empty
    #[error("entity `{entity}`: window lies outside its parent window")]
    OutsideParent { entity: EntityId },
}

impl ConfigError {
    /// The entity this error refers to
    pub fn entity(&self) -> &EntityId {
        match self {
            ConfigError::MissingField { entity, .. }
            | ConfigError::InvalidField { entity, .. }
            | ConfigError::InvertedWindow { entity, .. }
            | ConfigError::UnknownParent { entity, .. }
            | ConfigError::MissingParent { entity, .. }
            | ConfigError::UnexpectedParent { entity }
            | ConfigError::LevelMismatch { entity, .. }
            | ConfigError::OutsideParent { entity } => entity,
            ConfigError::DuplicateId(entity) => entity,
        }
    }
}
