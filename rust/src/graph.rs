//! Task graph model: tasks keyed by id, their hierarchy, and dependency edges.

use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::log_checks;
use crate::models::TaskRecord;
use crate::sorting::{rank, OrderingPolicy, Rank};

/// Task identifier.
pub type TaskId = i64;

/// Parent value of root tasks. Never a valid task id.
pub const NO_PARENT: TaskId = 0;

/// Errors raised while building or normalizing a task graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Task id {0} is reserved for roots without a parent")]
    ReservedId(TaskId),
    #[error("Duplicate task id: {0}")]
    DuplicateId(TaskId),
    #[error("Parent/child hierarchy contains a cycle through task {0}")]
    HierarchyCycle(TaskId),
}

/// A work item. Effort lives only on leaves; groups summarize their descendants.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub resource: String,
    pub task_type: Rank,
    pub priority: Rank,
    pub parent: TaskId,
    /// Direct children, in sibling order
    pub children: Vec<TaskId>,
    pub predecessors: BTreeSet<TaskId>,
    pub successors: BTreeSet<TaskId>,
    pub worked_hours: f64,
    pub remaining_hours: f64,
    pub fixed_start: Option<NaiveDateTime>,
    pub fixed_finish: Option<NaiveDateTime>,
    pub done: bool,
}

impl Task {
    /// Build a task from a collaborator record, ranking its categorical fields.
    pub fn from_record(record: &TaskRecord, policy: &OrderingPolicy) -> Self {
        let mut children = Vec::with_capacity(record.children.len());
        for child in &record.children {
            if !children.contains(child) {
                children.push(*child);
            }
        }

        Self {
            id: record.id,
            name: record.name.clone(),
            resource: record.resource.clone(),
            task_type: rank(&policy.type_order, &record.task_type),
            priority: rank(&policy.priority_order, &record.priority),
            parent: record.parent,
            children,
            predecessors: record.predecessors.iter().copied().collect(),
            successors: record.successors.iter().copied().collect(),
            worked_hours: record.worked_hours,
            remaining_hours: record.remaining_hours,
            fixed_start: record.fixed_start,
            fixed_finish: record.fixed_finish,
            done: record.done,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent == NO_PARENT
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total effort: worked plus remaining hours.
    pub fn duration_hours(&self) -> f64 {
        self.worked_hours + self.remaining_hours
    }
}

/// Tasks keyed by id, remembering insertion order for deterministic traversal.
#[derive(Clone, Debug, Default)]
pub struct TaskGraph {
    tasks: FxHashMap<TaskId, Task>,
    order: Vec<TaskId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from collaborator records. Links are taken as given;
    /// run [`crate::normalize::normalize`] before scheduling.
    ///
    /// Type and priority values missing from the policy's lists rank last and
    /// are reported at CHECKS verbosity.
    pub fn from_records(
        records: &[TaskRecord],
        policy: &OrderingPolicy,
        verbosity: u8,
    ) -> Result<Self, GraphError> {
        let mut graph = Self {
            tasks: FxHashMap::with_capacity_and_hasher(records.len(), Default::default()),
            order: Vec::with_capacity(records.len()),
        };
        for record in records {
            let task = Task::from_record(record, policy);
            if !task.task_type.is_listed(&policy.type_order) {
                log_checks!(
                    verbosity,
                    "Task {}: type {:?} not in ordering list, ranked last",
                    task.id,
                    task.task_type.display
                );
            }
            if !task.priority.is_listed(&policy.priority_order) {
                log_checks!(
                    verbosity,
                    "Task {}: priority {:?} not in ordering list, ranked last",
                    task.id,
                    task.priority.display
                );
            }
            graph.insert(task)?;
        }
        Ok(graph)
    }

    /// Add a task.
    pub fn insert(&mut self, task: Task) -> Result<(), GraphError> {
        if task.id == NO_PARENT {
            return Err(GraphError::ReservedId(task.id));
        }
        if self.tasks.contains_key(&task.id) {
            return Err(GraphError::DuplicateId(task.id));
        }
        self.order.push(task.id);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    #[inline]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Task ids in insertion order.
    pub fn ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn is_root(&self, id: TaskId) -> bool {
        self.get(id).is_some_and(Task::is_root)
    }

    /// Roots in insertion order.
    pub fn roots(&self) -> Vec<TaskId> {
        self.iter().filter(|t| t.is_root()).map(|t| t.id).collect()
    }

    pub fn children_of(&self, id: TaskId) -> &[TaskId] {
        self.get(id).map(|t| t.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors of a task, nearest first. Stops at missing parents and
    /// never walks more steps than there are tasks.
    pub fn ancestors(&self, id: TaskId) -> Vec<TaskId> {
        let mut result = Vec::new();
        let mut current = self.get(id).map(|t| t.parent).unwrap_or(NO_PARENT);
        while current != NO_PARENT && result.len() < self.len() {
            let Some(task) = self.get(current) else {
                break;
            };
            result.push(current);
            current = task.parent;
        }
        result
    }

    /// Task ids in WBS order: depth-first, pre-order from the roots.
    ///
    /// Siblings keep insertion order (children-list order below a parent)
    /// unless `sibling_order` is given. Every task reachable from a root is
    /// listed exactly once and always after its parent.
    pub fn wbs_order(&self, sibling_order: Option<&dyn Fn(&Task, &Task) -> Ordering>) -> Vec<TaskId> {
        let sorted = |ids: Vec<TaskId>| -> Vec<TaskId> {
            let mut tasks: Vec<&Task> = ids.iter().filter_map(|id| self.get(*id)).collect();
            if let Some(cmp) = sibling_order {
                tasks.sort_by(|a, b| cmp(*a, *b));
            }
            tasks.into_iter().map(|t| t.id).collect()
        };

        let mut result = Vec::with_capacity(self.len());
        let mut visited: FxHashSet<TaskId> = FxHashSet::default();
        let mut stack: Vec<TaskId> = sorted(self.roots());
        stack.reverse();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            result.push(id);
            let children = sorted(self.children_of(id).to_vec());
            stack.extend(children.into_iter().rev());
        }

        result
    }

    /// Apply `visitor` to every task in WBS order.
    pub fn wbs_visit<F>(&self, sibling_order: Option<&dyn Fn(&Task, &Task) -> Ordering>, mut visitor: F)
    where
        F: FnMut(&Task),
    {
        for id in self.wbs_order(sibling_order) {
            if let Some(task) = self.get(id) {
                visitor(task);
            }
        }
    }
}
