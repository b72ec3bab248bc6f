//! Per-resource serialization for a single scheduling pass.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::calendar::Direction;

/// Tracks, per resource, the boundary its most recent task was placed to.
///
/// A resource works one task at a time: in a forward pass the next task on a
/// resource cannot start before this instant, in a backward pass it cannot
/// finish after it. Tasks with an empty resource are unassigned and never
/// serialized against each other.
#[derive(Clone, Debug)]
pub struct ResourceSchedule {
    direction: Direction,
    next_available: FxHashMap<String, NaiveDateTime>,
}

impl ResourceSchedule {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            next_available: FxHashMap::default(),
        }
    }

    /// The instant the resource becomes free, if it has been used this pass.
    pub fn next_available(&self, resource: &str) -> Option<NaiveDateTime> {
        if resource.is_empty() {
            return None;
        }
        self.next_available.get(resource).copied()
    }

    /// Record that `resource` is busy up to `boundary` (down to it, backward).
    ///
    /// Keeps whichever instant is further along in the pass direction, so a
    /// task pinned by a fixed date never hands the resource back early.
    pub fn reserve(&mut self, resource: &str, boundary: NaiveDateTime) {
        if resource.is_empty() {
            return;
        }
        let direction = self.direction;
        self.next_available
            .entry(resource.to_string())
            .and_modify(|t| *t = direction.later(*t, boundary))
            .or_insert(boundary);
    }

    /// Number of resources used so far.
    pub fn len(&self) -> usize {
        self.next_available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_available.is_empty()
    }
}
