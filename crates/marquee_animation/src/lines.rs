//! Interval line allocator
//!
//! Keeps temporally overlapping top-level entities on different lines. Two
//! windows conflict when they intersect or when the gap between them is within
//! the proximity threshold. A new entity takes the smallest line not used by
//! any conflicting assignment.
//!
//! When every line in `0..max_lines` is taken, the line of the oldest
//! conflicting assignment is reused and both entities share it. The line count
//! never grows past `max_lines`.

use marquee_core::{ClockMs, EntityId, TimeWindow};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Key of a live assignment in the allocator table
    pub struct AssignmentKey;
}

/// A line held by one entity
#[derive(Clone, Debug, PartialEq)]
pub struct LineAssignment {
    pub entity: EntityId,
    pub line: u32,
    /// Effective window, already padded by head and tail time
    pub window: TimeWindow,
    /// Creation sequence, used only to pick the eviction victim
    pub assigned_at: u64,
}

/// Live line assignments for one session
#[derive(Debug)]
pub struct LineAllocator {
    assignments: SlotMap<AssignmentKey, LineAssignment>,
    by_entity: FxHashMap<EntityId, AssignmentKey>,
    /// How long past its window end an assignment stays live
    expiry_threshold: f64,
    next_sequence: u64,
}

impl LineAllocator {
    pub fn new(expiry_threshold: f64) -> Self {
        Self {
            assignments: SlotMap::with_key(),
            by_entity: FxHashMap::default(),
            expiry_threshold: expiry_threshold.max(0.0),
            next_sequence: 0,
        }
    }

    pub fn expiry_threshold(&self) -> f64 {
        self.expiry_threshold
    }

    /// Line for `entity`, assigning one if it holds none
    ///
    /// Repeated calls for the same entity return the same line until it is
    /// released or expires.
    pub fn assign_line(
        &mut self,
        entity: &EntityId,
        window: TimeWindow,
        now: ClockMs,
        max_lines: u32,
        proximity: f64,
    ) -> u32 {
        self.expire(now);

        if let Some(&key) = self.by_entity.get(entity) {
            if let Some(existing) = self.assignments.get_mut(key) {
                existing.window = window;
                return existing.line;
            }
        }

        let max_lines = max_lines.max(1);
        let conflicts: SmallVec<[(u32, u64); 8]> = self
            .assignments
            .values()
            .filter(|a| a.window.conflicts_with(&window, proximity))
            .map(|a| (a.line, a.assigned_at))
            .collect();

        // The smallest free line is at most `conflicts.len()`
        let probe = (conflicts.len() as u64 + 1).min(max_lines as u64) as u32;
        let free = (0..probe).find(|line| !conflicts.iter().any(|(used, _)| used == line));

        let line = match free {
            Some(line) => line,
            None => {
                let victim = conflicts
                    .iter()
                    .filter(|(line, _)| *line < max_lines)
                    .min_by_key(|(_, assigned_at)| *assigned_at)
                    .map(|(line, _)| *line)
                    .unwrap_or(0);
                tracing::debug!(
                    entity = %entity,
                    line = victim,
                    max_lines,
                    "all lines occupied, reusing line of oldest conflicting assignment"
                );
                victim
            }
        };

        let assigned_at = self.next_sequence;
        self.next_sequence += 1;

        let key = self.assignments.insert(LineAssignment {
            entity: entity.clone(),
            line,
            window,
            assigned_at,
        });
        self.by_entity.insert(entity.clone(), key);
        line
    }

    /// Free the line held by `entity`
    pub fn release(&mut self, entity: &EntityId) -> Option<LineAssignment> {
        let key = self.by_entity.remove(entity)?;
        self.assignments.remove(key)
    }

    /// Drop assignments whose window ended more than the expiry threshold
    /// before `now`. Returns how many were dropped.
    pub fn expire(&mut self, now: ClockMs) -> usize {
        let threshold = self.expiry_threshold;
        let overdue: SmallVec<[AssignmentKey; 8]> = self
            .assignments
            .iter()
            .filter(|(_, a)| a.window.end + threshold < now)
            .map(|(key, _)| key)
            .collect();

        for key in &overdue {
            if let Some(assignment) = self.assignments.remove(*key) {
                tracing::trace!(
                    entity = %assignment.entity,
                    line = assignment.line,
                    "line expired"
                );
                self.by_entity.remove(&assignment.entity);
            }
        }
        overdue.len()
    }

    pub fn line_of(&self, entity: &EntityId) -> Option<u32> {
        self.assignment(entity).map(|a| a.line)
    }

    pub fn assignment(&self, entity: &EntityId) -> Option<&LineAssignment> {
        let key = self.by_entity.get(entity)?;
        self.assignments.get(*key)
    }

    /// Forget every assignment and restart the creation sequence
    pub fn reset(&mut self) {
        self.assignments.clear();
        self.by_entity.clear();
        self.next_sequence = 0;
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineAssignment> {
        self.assignments.values()
    }
}

impl Default for LineAllocator {
    fn default() -> Self {
        Self::new(0.0)
    }
}
