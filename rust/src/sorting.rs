//! Priority and ordering policy for picking the next task to place.
//!
//! Categorical fields (type, priority) are turned into ordinal ranks from a
//! configured list. Ties among ready tasks are broken by, in order:
//! 1. type rank, ascending
//! 2. effective priority (ancestor ranks first), ascending
//! 3. total duration, descending
//! 4. task id, ascending

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::calendar::Window;
use crate::graph::{Task, TaskGraph, TaskId};

/// A categorical value with its position in the ordering list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub display: String,
    pub rank: usize,
}

impl Rank {
    /// Whether the value was found in `list` rather than defaulted to last.
    pub fn is_listed(&self, list: &[String]) -> bool {
        self.rank < list.len()
    }
}

/// Rank `value` by its position in `list`. Values not in the list rank after
/// every listed value.
pub fn rank(list: &[String], value: &str) -> Rank {
    let rank = list.iter().position(|v| v == value).unwrap_or(list.len());
    Rank {
        display: value.to_string(),
        rank,
    }
}

/// Ordering lists for the categorical fields. Earlier = scheduled first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingPolicy {
    pub type_order: Vec<String>,
    pub priority_order: Vec<String>,
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self {
            type_order: ["Bug", "Task"].iter().map(|s| s.to_string()).collect(),
            priority_order: ["Blocker", "Critical", "Major", "Normal", "Minor", "Trivial"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl OrderingPolicy {
    /// Replace the default lists where the caller supplied one.
    pub fn with_overrides(
        type_order: Option<Vec<String>>,
        priority_order: Option<Vec<String>>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            type_order: type_order.unwrap_or(defaults.type_order),
            priority_order: priority_order.unwrap_or(defaults.priority_order),
        }
    }
}

/// Compute every task's effective priority: the priority ranks of its
/// ancestors, root-most first, followed by its own.
///
/// Compared lexicographically, so a leaf below a "Blocker" group outranks any
/// leaf below a "Minor" group whatever their own priorities.
pub fn effective_priorities(graph: &TaskGraph) -> FxHashMap<TaskId, Vec<usize>> {
    let mut result: FxHashMap<TaskId, Vec<usize>> =
        FxHashMap::with_capacity_and_hasher(graph.len(), Default::default());

    // Pre-order guarantees the parent's entry exists before its children.
    for id in graph.wbs_order(None) {
        let Some(task) = graph.get(id) else {
            continue;
        };
        let mut priority = result.get(&task.parent).cloned().unwrap_or_default();
        priority.push(task.priority.rank);
        result.insert(id, priority);
    }

    result
}

/// A ready task as seen by a comparator.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub task: &'a Task,
    pub effective_priority: &'a [usize],
}

/// Total order over ready tasks. `Less` means "schedule first" in a forward pass.
pub trait TaskComparator {
    fn compare(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering;
}

impl<F> TaskComparator for F
where
    F: Fn(&Candidate<'_>, &Candidate<'_>) -> Ordering,
{
    fn compare(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        self(a, b)
    }
}

/// The business ordering: type, effective priority, longer first, then id.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultComparator;

impl TaskComparator for DefaultComparator {
    fn compare(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        compare_tasks(a, b)
    }
}

/// Compare f64 values for sorting, treating NaN as equal to everything.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Default comparison of two ready tasks. Borrows both candidates; runs once
/// per ready task on every selection.
pub fn compare_tasks(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.task
        .task_type
        .rank
        .cmp(&b.task.task_type.rank)
        .then_with(|| a.effective_priority.cmp(b.effective_priority))
        // Bigger jobs first among equals
        .then_with(|| cmp_f64(b.task.duration_hours(), a.task.duration_hours()))
        .then_with(|| a.task.id.cmp(&b.task.id))
}

/// Sibling order for presenting a schedule: earlier start first, id breaks ties.
/// Tasks without a window sort last.
pub fn compare_start(windows: &FxHashMap<TaskId, Window>, a: &Task, b: &Task) -> Ordering {
    let start_a = windows.get(&a.id).map(|w| w.start);
    let start_b = windows.get(&b.id).map(|w| w.start);
    match (start_a, start_b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskRecord;
    use chrono::NaiveDate;

    fn make_task(id: TaskId, task_type: &str, priority: &str, worked: f64, remaining: f64) -> Task {
        let record = TaskRecord {
            task_type: task_type.to_string(),
            priority: priority.to_string(),
            worked_hours: worked,
            remaining_hours: remaining,
            ..TaskRecord::new(id, format!("task {id}"))
        };
        Task::from_record(&record, &OrderingPolicy::default())
    }

    fn candidate<'a>(task: &'a Task, priority: &'a [usize]) -> Candidate<'a> {
        Candidate {
            task,
            effective_priority: priority,
        }
    }

    #[test]
    fn test_rank_known_and_unknown() {
        let list: Vec<String> = vec!["Bug".into(), "Task".into()];
        assert_eq!(rank(&list, "Bug").rank, 0);
        assert_eq!(rank(&list, "Task").rank, 1);

        let unknown = rank(&list, "Epic");
        assert_eq!(unknown.rank, 2);
        assert_eq!(unknown.display, "Epic");
    }

    #[test]
    fn test_type_dominates_priority() {
        let bug = make_task(2, "Bug", "Trivial", 0.0, 1.0);
        let chore = make_task(1, "Task", "Blocker", 0.0, 1.0);
        let order = compare_tasks(&candidate(&bug, &[5]), &candidate(&chore, &[0]));
        assert_eq!(order, Ordering::Less);
    }

    #[test]
    fn test_longer_task_first_among_equals() {
        let short = make_task(1, "Bug", "Major", 1.0, 2.0);
        let long = make_task(2, "Bug", "Major", 10.0, 20.0);
        let order = compare_tasks(&candidate(&long, &[2]), &candidate(&short, &[2]));
        assert_eq!(order, Ordering::Less);
    }

    #[test]
    fn test_id_breaks_final_tie() {
        let a = make_task(31, "Bug", "Major", 10.0, 20.0);
        let b = make_task(32, "Bug", "Major", 10.0, 20.0);
        assert_eq!(compare_tasks(&candidate(&a, &[2]), &candidate(&b, &[2])), Ordering::Less);
        assert_eq!(compare_tasks(&candidate(&b, &[2]), &candidate(&a, &[2])), Ordering::Greater);
    }

    #[test]
    fn test_key_order_when_sorting() {
        let tasks = vec![
            make_task(6, "Task", "Blocker", 0.0, 1.0),
            make_task(5, "Bug", "Major", 0.0, 1.0),
            make_task(4, "Bug", "Major", 0.0, 8.0),
            make_task(3, "Bug", "Blocker", 0.0, 1.0),
            make_task(2, "Bug", "Major", 0.0, 1.0),
        ];
        let priorities: Vec<Vec<usize>> = tasks.iter().map(|t| vec![t.priority.rank]).collect();
        let mut candidates: Vec<Candidate<'_>> = tasks
            .iter()
            .zip(&priorities)
            .map(|(task, priority)| candidate(task, priority))
            .collect();
        candidates.sort_by(compare_tasks);

        let ids: Vec<TaskId> = candidates.iter().map(|c| c.task.id).collect();
        assert_eq!(ids, vec![3, 4, 2, 5, 6]);
    }

    #[test]
    fn test_rank_is_listed() {
        let list: Vec<String> = vec!["Bug".into(), "Task".into()];
        assert!(rank(&list, "Task").is_listed(&list));
        assert!(!rank(&list, "Epic").is_listed(&list));
        assert!(!rank(&[], "Bug").is_listed(&[]));
    }

    #[test]
    fn test_effective_priority_inherits_ancestors() {
        let records = vec![
            TaskRecord {
                priority: "Major".into(),
                children: vec![51, 53],
                ..TaskRecord::new(50, "root")
            },
            TaskRecord {
                priority: "Minor".into(),
                parent: 50,
                children: vec![52],
                ..TaskRecord::new(51, "low group")
            },
            TaskRecord {
                priority: "Blocker".into(),
                parent: 51,
                ..TaskRecord::new(52, "urgent leaf in low group")
            },
            TaskRecord {
                priority: "Blocker".into(),
                parent: 50,
                children: vec![54],
                ..TaskRecord::new(53, "high group")
            },
            TaskRecord {
                priority: "Trivial".into(),
                parent: 53,
                ..TaskRecord::new(54, "minor leaf in high group")
            },
        ];
        let graph = TaskGraph::from_records(&records, &OrderingPolicy::default(), 0).unwrap();
        let priorities = effective_priorities(&graph);

        assert_eq!(priorities[&50], vec![2]);
        assert_eq!(priorities[&52], vec![2, 4, 0]);
        assert_eq!(priorities[&54], vec![2, 0, 5]);
        assert!(priorities[&54] < priorities[&52]);
    }

    fn reverse_id(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        b.task.id.cmp(&a.task.id)
    }

    #[test]
    fn test_function_comparator() {
        let a = make_task(1, "Bug", "Major", 0.0, 1.0);
        let b = make_task(2, "Bug", "Major", 0.0, 1.0);
        assert_eq!(
            reverse_id.compare(&candidate(&a, &[2]), &candidate(&b, &[2])),
            Ordering::Greater
        );
        assert_eq!(
            DefaultComparator.compare(&candidate(&a, &[2]), &candidate(&b, &[2])),
            Ordering::Less
        );
    }

    #[test]
    fn test_compare_start_orders_by_window() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2019, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let a = make_task(1, "Bug", "Major", 0.0, 1.0);
        let b = make_task(2, "Bug", "Major", 0.0, 1.0);
        let c = make_task(3, "Bug", "Major", 0.0, 1.0);
        let mut windows = FxHashMap::default();
        windows.insert(1, Window::new(day(9), day(10)));
        windows.insert(2, Window::new(day(7), day(8)));

        assert_eq!(compare_start(&windows, &a, &b), Ordering::Greater);
        assert_eq!(compare_start(&windows, &a, &c), Ordering::Less);
    }

    #[test]
    fn test_policy_overrides() {
        let policy = OrderingPolicy::with_overrides(Some(vec!["Story".into()]), None);
        assert_eq!(policy.type_order, vec!["Story".to_string()]);
        assert_eq!(policy.priority_order.len(), 6);
    }
}
