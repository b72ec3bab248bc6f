//! Transient state of one scheduling pass.
//!
//! Kept in a side table keyed by task id and discarded (or turned into a
//! [`PassResult`]) when the pass ends. The task graph itself is never touched.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::calendar::{DateSource, Direction, Window};
use crate::graph::{TaskGraph, TaskId, NO_PARENT};
use crate::normalize::LinkTable;

use super::core::PassResult;

pub struct PassState {
    direction: Direction,
    /// Unplaced partners before the task in this direction, plus unplaced children
    blocking: FxHashMap<TaskId, usize>,
    /// Tasks whose blocking count reached zero and that are not yet placed
    ready: Vec<TaskId>,
    scheduled: FxHashSet<TaskId>,
    windows: FxHashMap<TaskId, Window>,
    sources: FxHashMap<TaskId, DateSource>,
    order: Vec<TaskId>,
}

impl PassState {
    pub fn new(graph: &TaskGraph, links: &LinkTable, direction: Direction) -> Self {
        let mut blocking = FxHashMap::with_capacity_and_hasher(graph.len(), Default::default());
        let mut ready = Vec::new();

        for task in graph.iter() {
            let count = links.before(task.id, direction).len() + task.children.len();
            if count == 0 {
                ready.push(task.id);
            }
            blocking.insert(task.id, count);
        }

        Self {
            direction,
            blocking,
            ready,
            scheduled: FxHashSet::default(),
            windows: FxHashMap::default(),
            sources: FxHashMap::default(),
            order: Vec::with_capacity(graph.len()),
        }
    }

    pub fn ready(&self) -> &[TaskId] {
        &self.ready
    }

    /// Remove and return the ready task at `index`.
    pub fn take(&mut self, index: usize) -> TaskId {
        self.ready.swap_remove(index)
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.scheduled.contains(&id)
    }

    pub fn window(&self, id: TaskId) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// Record a leaf's placement.
    pub fn place(&mut self, id: TaskId, window: Window, source: DateSource) {
        self.windows.insert(id, window);
        self.sources.insert(id, source);
    }

    /// Widen every ancestor's window to cover a newly placed leaf.
    pub fn roll_up(&mut self, ancestors: &[TaskId], window: Window) {
        for ancestor in ancestors {
            self.windows
                .entry(*ancestor)
                .and_modify(|w| w.cover(&window))
                .or_insert(window);
        }
    }

    /// Mark a task scheduled and release the tasks it was blocking: its
    /// partners after it in this direction and its parent.
    pub fn complete(&mut self, graph: &TaskGraph, links: &LinkTable, id: TaskId) {
        if self.is_scheduled(id) {
            return;
        }
        self.scheduled.insert(id);
        self.order.push(id);

        for next in links.after(id, self.direction) {
            self.release(*next);
        }
        let parent = graph.get(id).map(|t| t.parent).unwrap_or(NO_PARENT);
        if parent != NO_PARENT {
            self.release(parent);
        }
    }

    fn release(&mut self, id: TaskId) {
        let Some(count) = self.blocking.get_mut(&id) else {
            return;
        };
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 && !self.is_scheduled(id) {
            self.ready.push(id);
        }
    }

    /// Tasks never scheduled, sorted by id.
    pub fn unscheduled(&self, graph: &TaskGraph) -> Vec<TaskId> {
        let mut stuck: Vec<TaskId> = graph
            .ids()
            .iter()
            .copied()
            .filter(|id| !self.is_scheduled(*id))
            .collect();
        stuck.sort_unstable();
        stuck
    }

    pub fn into_result(self) -> PassResult {
        PassResult {
            direction: self.direction,
            windows: self.windows,
            sources: self.sources,
            order: self.order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskRecord;
    use crate::normalize::normalize;
    use crate::sorting::OrderingPolicy;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    // Group 1 holds leaves 2 and 3; 2 blocks 3.
    fn make_graph() -> TaskGraph {
        let records = vec![
            TaskRecord {
                children: vec![2, 3],
                ..TaskRecord::new(1, "group")
            },
            TaskRecord {
                parent: 1,
                successors: vec![3],
                ..TaskRecord::new(2, "first")
            },
            TaskRecord {
                parent: 1,
                ..TaskRecord::new(3, "second")
            },
        ];
        let mut graph = TaskGraph::from_records(&records, &OrderingPolicy::default(), 0).unwrap();
        normalize(&mut graph, 0).unwrap();
        graph
    }

    #[test]
    fn test_initial_ready_set_per_direction() {
        let graph = make_graph();
        let links = LinkTable::from_graph(&graph);

        assert_eq!(PassState::new(&graph, &links, Direction::Asap).ready(), &[2]);
        assert_eq!(PassState::new(&graph, &links, Direction::Alap).ready(), &[3]);
    }

    #[test]
    fn test_group_ready_after_all_children() {
        let graph = make_graph();
        let links = LinkTable::from_graph(&graph);
        let mut state = PassState::new(&graph, &links, Direction::Asap);

        let first = state.take(0);
        state.complete(&graph, &links, first);
        assert_eq!(state.ready(), &[3]);

        let second = state.take(0);
        state.complete(&graph, &links, second);
        assert_eq!(state.ready(), &[1]);

        let group = state.take(0);
        state.complete(&graph, &links, group);
        assert!(state.ready().is_empty());
        assert!(state.unscheduled(&graph).is_empty());
        assert!(state.is_scheduled(1));
    }

    #[test]
    fn test_repeat_completion_is_ignored() {
        let graph = make_graph();
        let links = LinkTable::from_graph(&graph);
        let mut state = PassState::new(&graph, &links, Direction::Asap);

        let first = state.take(0);
        state.complete(&graph, &links, first);
        state.complete(&graph, &links, first);

        // The group still waits on leaf 3
        assert_eq!(state.ready(), &[3]);
        assert!(state.is_scheduled(2));
        assert!(!state.is_scheduled(1));
        assert_eq!(state.unscheduled(&graph), vec![1, 3]);
    }

    #[test]
    fn test_roll_up_covers_children() {
        let graph = make_graph();
        let links = LinkTable::from_graph(&graph);
        let mut state = PassState::new(&graph, &links, Direction::Asap);

        let a = Window::new(day(7), day(9));
        let b = Window::new(day(9), day(14));
        state.place(2, a, DateSource::Project);
        state.roll_up(&[1], a);
        state.place(3, b, DateSource::Dependency);
        state.roll_up(&[1], b);

        assert_eq!(state.window(1), Some(&Window::new(day(7), day(14))));

        let result = state.into_result();
        assert_eq!(result.sources[&3], DateSource::Dependency);
        assert!(!result.sources.contains_key(&1));
    }

    #[test]
    fn test_unscheduled_lists_stuck_ids() {
        let graph = make_graph();
        let links = LinkTable::from_graph(&graph);
        let state = PassState::new(&graph, &links, Direction::Asap);

        assert_eq!(state.unscheduled(&graph), vec![1, 2, 3]);
    }
}
