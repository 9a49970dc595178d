//! Entity hierarchy and configuration validation
//!
//! The configuration store hands over flat, loosely filled [`EntityConfig`]
//! records. [`Scene::build`] validates each one exactly once into a tagged
//! [`EntitySpec`] and links the records into an item → group → element tree.
//! Records that fail validation stay in the tree with their error so the
//! coordinator can skip them (and their subtree) while still evaluating
//! everything else.

use crate::config::EngineConfig;
use crate::easing::Easing;
use marquee_core::{ConfigError, Direction, EntityId, HierarchyLevel, TimeWindow};
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

new_key_type! {
    /// Key of a node in a [`Scene`]
    pub struct NodeKey;
}

/// Raw per-entity record from the configuration store
///
/// For nested entities `start_time` and `end_time` are offsets from the
/// parent's start; for top-level entities they are absolute clock values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: EntityId,
    #[serde(default)]
    pub level: HierarchyLevel,
    pub parent: Option<EntityId>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub head_time: Option<f64>,
    pub tail_time: Option<f64>,
    pub initial_speed: Option<f64>,
    pub final_speed: Option<f64>,
    pub direction: Option<Direction>,
    pub easing: Option<Easing>,
    pub max_lines: Option<u32>,
    pub line_spacing: Option<f32>,
    pub slice_count: Option<u32>,
    pub proximity_threshold: Option<f64>,
    pub seek_threshold: Option<f64>,
    /// Static rotation in degrees, added to the parent's
    pub rotation: Option<f32>,
}

impl EntityConfig {
    /// Top-level record with an absolute window
    pub fn top(id: impl Into<EntityId>, start: f64, end: f64) -> Self {
        Self {
            id: id.into(),
            level: HierarchyLevel::Top,
            start_time: Some(start),
            end_time: Some(end),
            ..Default::default()
        }
    }

    /// Mid-level record, window relative to the parent start
    pub fn group(
        id: impl Into<EntityId>,
        parent: impl Into<EntityId>,
        start: f64,
        end: f64,
    ) -> Self {
        Self {
            id: id.into(),
            level: HierarchyLevel::Mid,
            parent: Some(parent.into()),
            start_time: Some(start),
            end_time: Some(end),
            ..Default::default()
        }
    }

    /// Leaf record, window relative to the parent start
    pub fn leaf(
        id: impl Into<EntityId>,
        parent: impl Into<EntityId>,
        start: f64,
        end: f64,
    ) -> Self {
        Self {
            level: HierarchyLevel::Leaf,
            ..Self::group(id, parent, start, end)
        }
    }

    pub fn with_head(mut self, head: f64) -> Self {
        self.head_time = Some(head);
        self
    }

    pub fn with_tail(mut self, tail: f64) -> Self {
        self.tail_time = Some(tail);
        self
    }

    pub fn with_speeds(mut self, initial: f64, final_speed: f64) -> Self {
        self.initial_speed = Some(initial);
        self.final_speed = Some(final_speed);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn with_max_lines(mut self, max_lines: u32) -> Self {
        self.max_lines = Some(max_lines);
        self
    }

    pub fn with_slices(mut self, count: u32) -> Self {
        self.slice_count = Some(count);
        self
    }

    pub fn with_proximity(mut self, proximity: f64) -> Self {
        self.proximity_threshold = Some(proximity);
        self
    }

    pub fn with_seek_threshold(mut self, threshold: f64) -> Self {
        self.seek_threshold = Some(threshold);
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self
    }
}

/// Entrance/exit motion parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionSpec {
    pub initial_speed: f64,
    pub final_speed: f64,
    pub easing: Easing,
    pub direction: Direction,
}

/// Validated top-level record
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TopSpec {
    pub window: TimeWindow,
    pub head: f64,
    pub tail: f64,
    pub motion: MotionSpec,
    pub max_lines: u32,
    pub line_spacing: f32,
    pub proximity: f64,
    pub slice_count: u32,
    pub seek_threshold: Option<f64>,
    pub rotation: f32,
}

impl TopSpec {
    /// Window padded by entrance and exit time
    pub fn effective_window(&self) -> TimeWindow {
        self.window.padded(self.head, self.tail)
    }
}

/// Validated nested record; unset fields inherit from the parent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildSpec {
    /// Window relative to the parent start
    pub offset: TimeWindow,
    pub head: Option<f64>,
    pub tail: Option<f64>,
    /// Own motion on top of the parent's; `None` moves with the parent
    pub motion: Option<MotionSpec>,
    pub easing: Option<Easing>,
    pub slice_count: u32,
    pub seek_threshold: Option<f64>,
    pub rotation: f32,
}

/// Validated record, tagged by hierarchy level
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntitySpec {
    Top(TopSpec),
    Group(ChildSpec),
    Leaf(ChildSpec),
}

impl EntitySpec {
    pub fn validate(config: &EntityConfig, defaults: &EngineConfig) -> Result<Self, ConfigError> {
        let check = Check { entity: &config.id };

        let start = check.finite("start_time", check.require("start_time", config.start_time)?)?;
        let end = check.finite("end_time", check.require("end_time", config.end_time)?)?;
        if end < start {
            return Err(ConfigError::InvertedWindow {
                entity: config.id.clone(),
                start,
                end,
            });
        }
        let window = TimeWindow::new(start, end);

        let head = check.optional_non_negative("head_time", config.head_time)?;
        let tail = check.optional_non_negative("tail_time", config.tail_time)?;
        let proximity =
            check.optional_non_negative("proximity_threshold", config.proximity_threshold)?;
        let seek_threshold = check.optional_non_negative("seek_threshold", config.seek_threshold)?;
        let slice_count = check.positive(
            "slice_count",
            config.slice_count.unwrap_or(defaults.slice_count),
        )?;
        let easing = config.easing.map(|e| check.easing(e)).transpose()?;
        let rotation = config.rotation.unwrap_or(0.0);
        if !rotation.is_finite() {
            return Err(check.invalid("rotation", "must be finite"));
        }

        let motion = match (config.initial_speed, config.final_speed) {
            (Some(initial), Some(final_speed)) => Some(MotionSpec {
                initial_speed: check.finite("initial_speed", initial)?,
                final_speed: check.finite("final_speed", final_speed)?,
                easing: match easing {
                    Some(easing) => easing,
                    None => check.easing(defaults.easing)?,
                },
                direction: config.direction.unwrap_or_default(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(check.missing("final_speed")),
            (None, Some(_)) => return Err(check.missing("initial_speed")),
        };

        match config.level {
            HierarchyLevel::Top => {
                let line_spacing = config.line_spacing.unwrap_or(defaults.line_spacing);
                if !line_spacing.is_finite() {
                    return Err(check.invalid("line_spacing", "must be finite"));
                }
                Ok(EntitySpec::Top(TopSpec {
                    window,
                    head: check.require("head_time", head)?,
                    tail: check.require("tail_time", tail)?,
                    motion: match motion {
                        Some(motion) => motion,
                        None => return Err(check.missing("initial_speed")),
                    },
                    max_lines: check.positive(
                        "max_lines",
                        config.max_lines.unwrap_or(defaults.max_lines),
                    )?,
                    line_spacing,
                    proximity: proximity.unwrap_or(defaults.proximity_threshold),
                    slice_count,
                    seek_threshold,
                    rotation,
                }))
            }
            HierarchyLevel::Mid | HierarchyLevel::Leaf => {
                let child = ChildSpec {
                    offset: window,
                    head,
                    tail,
                    motion,
                    easing,
                    slice_count,
                    seek_threshold,
                    rotation,
                };
                Ok(if config.level == HierarchyLevel::Mid {
                    EntitySpec::Group(child)
                } else {
                    EntitySpec::Leaf(child)
                })
            }
        }
    }

    pub fn level(&self) -> HierarchyLevel {
        match self {
            EntitySpec::Top(_) => HierarchyLevel::Top,
            EntitySpec::Group(_) => HierarchyLevel::Mid,
            EntitySpec::Leaf(_) => HierarchyLevel::Leaf,
        }
    }
}

struct Check<'a> {
    entity: &'a EntityId,
}

impl Check<'_> {
    fn missing(&self, field: &'static str) -> ConfigError {
        ConfigError::MissingField {
            entity: self.entity.clone(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: &str) -> ConfigError {
        ConfigError::InvalidField {
            entity: self.entity.clone(),
            field,
            reason: reason.to_string(),
        }
    }

    fn easing(&self, easing: Easing) -> Result<Easing, ConfigError> {
        easing.check().map_err(|reason| self.invalid("easing", reason))?;
        Ok(easing)
    }

    fn require<T>(&self, field: &'static str, value: Option<T>) -> Result<T, ConfigError> {
        value.ok_or_else(|| self.missing(field))
    }

    fn finite(&self, field: &'static str, value: f64) -> Result<f64, ConfigError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.invalid(field, "must be finite"))
        }
    }

    fn optional_non_negative(
        &self,
        field: &'static str,
        value: Option<f64>,
    ) -> Result<Option<f64>, ConfigError> {
        match value {
            Some(v) if !v.is_finite() => Err(self.invalid(field, "must be finite")),
            Some(v) if v < 0.0 => Err(self.invalid(field, "must not be negative")),
            other => Ok(other),
        }
    }

    fn positive(&self, field: &'static str, value: u32) -> Result<u32, ConfigError> {
        if value == 0 {
            Err(self.invalid(field, "must be at least 1"))
        } else {
            Ok(value)
        }
    }
}

/// A node of the entity tree
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub id: EntityId,
    pub level: HierarchyLevel,
    /// Lookup-only back reference
    pub parent: Option<NodeKey>,
    pub children: SmallVec<[NodeKey; 4]>,
    pub spec: Result<EntitySpec, ConfigError>,
}

/// Validated entity hierarchy for one configuration snapshot
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeKey, SceneNode>,
    index: FxHashMap<EntityId, NodeKey>,
    roots: Vec<NodeKey>,
    /// Valid top-level nodes ordered by (effective start, id)
    tops_by_entry: Vec<NodeKey>,
    /// Records rejected before they could become nodes
    rejected: Vec<ConfigError>,
    layout_fingerprint: u64,
}

impl Scene {
    /// Validate and link a set of configuration records
    ///
    /// Never fails: invalid records are kept with their error and reported by
    /// [`Scene::errors`].
    pub fn build(
        configs: impl IntoIterator<Item = EntityConfig>,
        defaults: &EngineConfig,
    ) -> Scene {
        let mut scene = Scene::default();
        let mut links: Vec<(NodeKey, Option<EntityId>)> = Vec::new();

        for config in configs {
            if scene.index.contains_key(&config.id) {
                tracing::warn!(entity = %config.id, "duplicate entity id, record ignored");
                scene.rejected.push(ConfigError::DuplicateId(config.id));
                continue;
            }
            let spec = EntitySpec::validate(&config, defaults);
            let key = scene.nodes.insert(SceneNode {
                id: config.id.clone(),
                level: config.level,
                parent: None,
                children: SmallVec::new(),
                spec,
            });
            scene.index.insert(config.id, key);
            links.push((key, config.parent));
        }

        // Link in input order so children keep their configured order
        for (key, parent_id) in links {
            let link = scene.resolve_parent(key, parent_id);
            match link {
                Ok(Some(parent)) => {
                    if let Some(node) = scene.nodes.get_mut(key) {
                        node.parent = Some(parent);
                    }
                    if let Some(parent) = scene.nodes.get_mut(parent) {
                        parent.children.push(key);
                    }
                }
                Ok(None) => scene.roots.push(key),
                Err(err) => {
                    if let Some(node) = scene.nodes.get_mut(key) {
                        if node.spec.is_ok() {
                            node.spec = Err(err);
                        }
                    }
                    scene.roots.push(key);
                }
            }
        }

        for node in scene.nodes.values() {
            if let Err(err) = &node.spec {
                tracing::warn!(entity = %node.id, error = %err, "invalid entity configuration");
            }
        }

        let mut tops: Vec<(NodeKey, f64)> = scene
            .roots
            .iter()
            .filter_map(|&key| match scene.nodes.get(key).map(|n| &n.spec) {
                Some(Ok(EntitySpec::Top(top))) => Some((key, top.effective_window().start)),
                _ => None,
            })
            .collect();
        tops.sort_by(|(a_key, a_start), (b_key, b_start)| {
            a_start
                .total_cmp(b_start)
                .then_with(|| scene.nodes[*a_key].id.cmp(&scene.nodes[*b_key].id))
        });
        scene.tops_by_entry = tops.into_iter().map(|(key, _)| key).collect();
        scene.layout_fingerprint = scene.compute_fingerprint();
        scene
    }

    fn resolve_parent(
        &self,
        key: NodeKey,
        parent_id: Option<EntityId>,
    ) -> Result<Option<NodeKey>, ConfigError> {
        let Some(node) = self.nodes.get(key) else {
            return Ok(None);
        };
        let entity = node.id.clone();
        match (node.level.parent_level(), parent_id) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(ConfigError::UnexpectedParent { entity }),
            (Some(_), None) => Err(ConfigError::MissingParent {
                entity,
                level: node.level,
            }),
            (Some(expected), Some(parent)) => {
                let Some(&parent_key) = self.index.get(&parent) else {
                    return Err(ConfigError::UnknownParent { entity, parent });
                };
                let parent_level = self
                    .nodes
                    .get(parent_key)
                    .map(|p| p.level)
                    .unwrap_or(expected);
                if parent_level == expected {
                    Ok(Some(parent_key))
                } else {
                    Err(ConfigError::LevelMismatch {
                        entity,
                        level: node.level,
                        parent_level,
                    })
                }
            }
        }
    }

    fn compute_fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for (_, top) in self.tops_by_entry() {
            let window = top.effective_window();
            window.start.to_bits().hash(&mut hasher);
            window.end.to_bits().hash(&mut hasher);
            top.max_lines.hash(&mut hasher);
            top.proximity.to_bits().hash(&mut hasher);
        }
        for key in &self.tops_by_entry {
            if let Some(node) = self.nodes.get(*key) {
                node.id.hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    /// Root nodes in configuration order
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub fn get(&self, id: &str) -> Option<&SceneNode> {
        self.index.get(id).and_then(|key| self.nodes.get(*key))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    /// Valid top-level entities in line allocation order
    pub fn tops_by_entry(&self) -> impl Iterator<Item = (&SceneNode, &TopSpec)> {
        self.tops_by_entry.iter().filter_map(|key| {
            let node = self.nodes.get(*key)?;
            match &node.spec {
                Ok(EntitySpec::Top(top)) => Some((node, top)),
                _ => None,
            }
        })
    }

    /// Changes whenever anything that affects line allocation changes
    pub fn layout_fingerprint(&self) -> u64 {
        self.layout_fingerprint
    }

    /// Every configuration error found while building
    pub fn errors(&self) -> impl Iterator<Item = &ConfigError> {
        self.rejected
            .iter()
            .chain(self.nodes.values().filter_map(|n| n.spec.as_ref().err()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
