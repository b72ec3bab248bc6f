//! Graph normalization: make a task graph self-consistent before scheduling.
//!
//! Records from the issue tracker often reference tasks outside the current
//! working set, or carry only one side of a link. Those are repaired here
//! silently (apart from diagnostic logging). Only a cyclic hierarchy is an
//! error.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

use crate::calendar::Direction;
use crate::graph::{GraphError, TaskGraph, TaskId, NO_PARENT};
use crate::{log_checks, log_debug};

/// Each task's own id plus the ids of all its transitive children.
pub type Descendants = FxHashMap<TaskId, FxHashSet<TaskId>>;

/// Drop references to tasks that are not in the graph.
///
/// A missing parent becomes `NO_PARENT`; missing ids are removed from the
/// children, predecessor, and successor sets. Returns the number of
/// references dropped.
pub fn prune_links(graph: &mut TaskGraph, verbosity: u8) -> usize {
    let present: FxHashSet<TaskId> = graph.ids().iter().copied().collect();
    let mut pruned = 0;

    for id in graph.ids().to_vec() {
        let Some(task) = graph.get_mut(id) else {
            continue;
        };

        if task.parent != NO_PARENT && !present.contains(&task.parent) {
            log_checks!(verbosity, "  Task {}: dropping missing parent {}", id, task.parent);
            task.parent = NO_PARENT;
            pruned += 1;
        }

        let before = task.children.len() + task.predecessors.len() + task.successors.len();
        task.children.retain(|c| present.contains(c));
        task.predecessors.retain(|p| present.contains(p));
        task.successors.retain(|s| present.contains(s));
        let dropped =
            before - (task.children.len() + task.predecessors.len() + task.successors.len());
        if dropped > 0 {
            log_checks!(verbosity, "  Task {}: dropped {} links to missing tasks", id, dropped);
            pruned += dropped;
        }
    }

    pruned
}

/// Reconcile parent pointers with children lists.
///
/// A task's parent pointer is authoritative. A child listed by a task it does
/// not name as parent is adopted when it has no parent, and dropped from that
/// list otherwise.
pub fn link_hierarchy(graph: &mut TaskGraph, verbosity: u8) {
    let ids = graph.ids().to_vec();

    for &id in &ids {
        let parent = graph.get(id).map(|t| t.parent).unwrap_or(NO_PARENT);
        if parent == NO_PARENT {
            continue;
        }
        if let Some(parent_task) = graph.get_mut(parent) {
            if !parent_task.children.contains(&id) {
                parent_task.children.push(id);
            }
        }
    }

    for &id in &ids {
        let children = graph.children_of(id).to_vec();
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match graph.get(child).map(|t| t.parent) {
                Some(NO_PARENT) => {
                    if let Some(child_task) = graph.get_mut(child) {
                        child_task.parent = id;
                    }
                    kept.push(child);
                }
                Some(parent) if parent == id => kept.push(child),
                Some(parent) => {
                    log_checks!(
                        verbosity,
                        "  Task {} lists child {} whose parent is {}; ignoring the link",
                        id,
                        child,
                        parent
                    );
                }
                None => {}
            }
        }
        if let Some(task) = graph.get_mut(id) {
            task.children = kept;
        }
    }
}

/// Make predecessor and successor sets reciprocal.
pub fn mirror_dependencies(graph: &mut TaskGraph) {
    for id in graph.ids().to_vec() {
        let Some(task) = graph.get(id) else {
            continue;
        };
        let predecessors: Vec<TaskId> = task.predecessors.iter().copied().collect();
        let successors: Vec<TaskId> = task.successors.iter().copied().collect();

        for pred in predecessors {
            if let Some(pred_task) = graph.get_mut(pred) {
                pred_task.successors.insert(id);
            }
        }
        for succ in successors {
            if let Some(succ_task) = graph.get_mut(succ) {
                succ_task.predecessors.insert(id);
            }
        }
    }
}

/// Effort lives only on leaves; a group's timing is rolled up from descendants.
pub fn clear_group_effort(graph: &mut TaskGraph) {
    for id in graph.ids().to_vec() {
        if let Some(task) = graph.get_mut(id) {
            if !task.is_leaf() {
                task.worked_hours = 0.0;
                task.remaining_hours = 0.0;
            }
        }
    }
}

/// Every parent chain must end at a root.
pub fn check_hierarchy(graph: &TaskGraph) -> Result<(), GraphError> {
    for &id in graph.ids() {
        let mut seen: FxHashSet<TaskId> = FxHashSet::default();
        let mut current = id;
        while current != NO_PARENT {
            if !seen.insert(current) {
                return Err(GraphError::HierarchyCycle(current));
            }
            current = graph.get(current).map(|t| t.parent).unwrap_or(NO_PARENT);
        }
    }
    Ok(())
}

/// Run every normalization step, in order.
pub fn normalize(graph: &mut TaskGraph, verbosity: u8) -> Result<(), GraphError> {
    prune_links(graph, verbosity);
    link_hierarchy(graph, verbosity);
    mirror_dependencies(graph);
    clear_group_effort(graph);
    check_hierarchy(graph)
}

/// Compute the descendant set of every task reachable from a root.
pub fn build_descendants(graph: &TaskGraph) -> Descendants {
    let mut result: Descendants =
        FxHashMap::with_capacity_and_hasher(graph.len(), Default::default());

    // Reverse pre-order visits children before their parents.
    for id in graph.wbs_order(None).into_iter().rev() {
        let mut set: FxHashSet<TaskId> = FxHashSet::default();
        set.insert(id);
        for child in graph.children_of(id) {
            if let Some(child_set) = result.get(child) {
                set.extend(child_set.iter().copied());
            }
        }
        result.insert(id, set);
    }

    result
}

/// Per-pass copy of the dependency edges, extended by propagation.
///
/// The graph's own sets are never modified, so a graph can be scheduled
/// repeatedly without accumulating inherited edges.
#[derive(Clone, Debug, Default)]
pub struct LinkTable {
    predecessors: FxHashMap<TaskId, BTreeSet<TaskId>>,
    successors: FxHashMap<TaskId, BTreeSet<TaskId>>,
}

static EMPTY: BTreeSet<TaskId> = BTreeSet::new();

impl LinkTable {
    pub fn from_graph(graph: &TaskGraph) -> Self {
        let mut table = Self::default();
        for task in graph.iter() {
            table.predecessors.insert(task.id, task.predecessors.clone());
            table.successors.insert(task.id, task.successors.clone());
        }
        table
    }

    pub fn predecessors(&self, id: TaskId) -> &BTreeSet<TaskId> {
        self.predecessors.get(&id).unwrap_or(&EMPTY)
    }

    pub fn successors(&self, id: TaskId) -> &BTreeSet<TaskId> {
        self.successors.get(&id).unwrap_or(&EMPTY)
    }

    /// Tasks that must be placed before `id` in a pass running in `direction`.
    pub fn before(&self, id: TaskId, direction: Direction) -> &BTreeSet<TaskId> {
        match direction {
            Direction::Asap => self.predecessors(id),
            Direction::Alap => self.successors(id),
        }
    }

    /// Tasks released once `id` is placed in a pass running in `direction`.
    pub fn after(&self, id: TaskId, direction: Direction) -> &BTreeSet<TaskId> {
        self.before(id, direction.reverse())
    }

    /// Add the edge `from` -> `to` on both sides, read in `direction`:
    /// `from` comes before `to`.
    pub fn link(&mut self, from: TaskId, to: TaskId, direction: Direction) {
        let (pred, succ) = match direction {
            Direction::Asap => (from, to),
            Direction::Alap => (to, from),
        };
        self.successors.entry(pred).or_default().insert(succ);
        self.predecessors.entry(succ).or_default().insert(pred);
    }
}

/// Copy group-level dependencies down onto the group's members.
///
/// Parents are processed before their children, so inherited edges keep
/// flowing down to the leaves. On each axis (predecessors, successors) a child
/// inherits its parent's partners only when none of its own partners on that
/// axis lie inside the parent's subtree: a child already sequenced behind a
/// sibling or cousin is constrained through that sibling.
pub fn propagate_dependencies(
    graph: &TaskGraph,
    descendants: &Descendants,
    links: &mut LinkTable,
    verbosity: u8,
) {
    for parent_id in graph.wbs_order(None) {
        let Some(parent) = graph.get(parent_id) else {
            continue;
        };
        if parent.is_leaf() {
            continue;
        }
        let Some(subtree) = descendants.get(&parent_id) else {
            continue;
        };

        for &child in &parent.children {
            // Asap reads the predecessor axis, Alap the successor axis.
            for axis in [Direction::Asap, Direction::Alap] {
                let inherited: Vec<TaskId> = links
                    .before(parent_id, axis)
                    .iter()
                    .copied()
                    .filter(|&p| p != child)
                    .collect();
                if inherited.is_empty() {
                    continue;
                }

                let cousins: Vec<TaskId> = links
                    .before(child, axis)
                    .iter()
                    .copied()
                    .filter(|p| subtree.contains(p))
                    .collect();
                if !cousins.is_empty() {
                    log_debug!(
                        verbosity,
                        "  Task {} already sequenced within {} by {:?}; not inheriting",
                        child,
                        parent_id,
                        cousins
                    );
                    continue;
                }

                log_debug!(
                    verbosity,
                    "  Task {} inherits {:?} from {} ({})",
                    child,
                    inherited,
                    parent_id,
                    if axis == Direction::Asap { "predecessors" } else { "successors" }
                );
                for partner in inherited {
                    links.link(partner, child, axis);
                }
            }
        }
    }
}
