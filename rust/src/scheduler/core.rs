//! Core list scheduler: one direction-parameterized pass over a WBS graph.

use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

use crate::calendar::{Boundary, Calendar, DateSource, Direction, Window, HOURS_EPSILON};
use crate::config::ScheduleConfig;
use crate::critical_path::find_critical_tasks;
use crate::graph::{GraphError, Task, TaskGraph, TaskId};
use crate::models::{ScheduleResult, ScheduledTask};
use crate::normalize::{build_descendants, normalize, propagate_dependencies, Descendants, LinkTable};
use crate::sorting::{compare_start, effective_priorities, Candidate, DefaultComparator, TaskComparator};
use crate::{log_changes, log_checks, log_debug};

use super::resource_schedule::ResourceSchedule;
use super::state::PassState;

/// Errors that can occur during scheduling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Dependency cycle: tasks {stuck:?} never became ready")]
    Cycle { stuck: Vec<TaskId> },
    #[error("Task {task} has no {boundary} anchor; set a project {boundary} or a today fallback")]
    MissingAnchor { task: TaskId, boundary: Boundary },
    #[error("Date arithmetic out of range while placing task {0}")]
    CalendarOverflow(TaskId),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Boundaries computed by one pass.
#[derive(Clone, Debug)]
pub struct PassResult {
    pub direction: Direction,
    /// Every task's window; groups carry the roll-up of their leaves
    pub windows: FxHashMap<TaskId, Window>,
    /// Where each leaf's anchored boundary came from
    pub sources: FxHashMap<TaskId, DateSource>,
    /// Tasks in the order they were scheduled
    pub order: Vec<TaskId>,
}

impl PassResult {
    pub fn window(&self, id: TaskId) -> Option<&Window> {
        self.windows.get(&id)
    }

    /// Earliest start and latest finish over all tasks.
    pub fn span(&self) -> Option<Window> {
        self.windows.values().copied().reduce(|mut span, w| {
            span.cover(&w);
            span
        })
    }
}

/// Schedules a normalized task graph.
///
/// The graph is normalized once on construction and not modified afterwards,
/// so passes can be run repeatedly (the critical path analyzer runs two).
pub struct Scheduler {
    graph: TaskGraph,
    config: ScheduleConfig,
    direction: Direction,
    calendar: Calendar,
    comparator: Box<dyn TaskComparator>,

    // Pre-computed per graph
    priorities: FxHashMap<TaskId, Vec<usize>>,
    descendants: Descendants,
}

impl Scheduler {
    /// Validate the configuration and normalize the graph.
    pub fn new(mut graph: TaskGraph, config: ScheduleConfig) -> Result<Self, SchedulerError> {
        let direction: Direction = config
            .direction
            .parse()
            .map_err(SchedulerError::InvalidConfig)?;

        if !(config.hours_per_day > 0.0 && config.hours_per_day <= 24.0) {
            return Err(SchedulerError::InvalidConfig(format!(
                "hours_per_day must be in (0, 24], got {}",
                config.hours_per_day
            )));
        }
        if let Some(pad) = config.open_task_pad_hours {
            if !(pad.is_finite() && pad >= 0.0) {
                return Err(SchedulerError::InvalidConfig(format!(
                    "open_task_pad_hours must be a non-negative number, got {}",
                    pad
                )));
            }
        }

        normalize(&mut graph, config.verbosity)?;
        let priorities = effective_priorities(&graph);
        let descendants = build_descendants(&graph);

        Ok(Self {
            graph,
            calendar: Calendar::new(config.hours_per_day),
            config,
            direction,
            comparator: Box::new(DefaultComparator),
            priorities,
            descendants,
        })
    }

    /// Replace the default ready-set ordering.
    pub fn with_comparator<C>(mut self, comparator: C) -> Self
    where
        C: TaskComparator + 'static,
    {
        self.comparator = Box::new(comparator);
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Direction of the primary pass.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Run the primary pass and, if configured, the critical path analyzer.
    pub fn schedule(&self) -> Result<ScheduleResult, SchedulerError> {
        let primary = self.run_pass(self.direction, None)?;

        let critical = if self.config.compute_critical_path {
            Some(find_critical_tasks(self, &primary)?)
        } else {
            None
        };

        Ok(self.build_result(&primary, critical.as_ref()))
    }

    /// Run one pass in `direction`.
    ///
    /// `project_anchor` overrides the configured project start (forward) or
    /// finish (backward) for tasks with no other anchor.
    pub fn run_pass(
        &self,
        direction: Direction,
        project_anchor: Option<NaiveDateTime>,
    ) -> Result<PassResult, SchedulerError> {
        let verbosity = self.config.verbosity;

        let mut links = LinkTable::from_graph(&self.graph);
        propagate_dependencies(&self.graph, &self.descendants, &mut links, verbosity);

        let mut state = PassState::new(&self.graph, &links, direction);
        let mut resources = ResourceSchedule::new(direction);

        log_changes!(
            verbosity,
            "=== {} pass over {} tasks ===",
            direction,
            self.graph.len()
        );

        while let Some(id) = self.select(&mut state, direction) {
            if let Some(task) = self.graph.get(id) {
                if task.is_leaf() {
                    self.place_leaf(task, direction, project_anchor, &links, &mut state, &mut resources)?;
                } else {
                    if task.fixed_start.is_some() || task.fixed_finish.is_some() {
                        log_checks!(verbosity, "  Ignoring fixed dates on group {}", id);
                    }
                    if let Some(window) = state.window(id) {
                        log_changes!(
                            verbosity,
                            "  Group {} spans {} - {}",
                            id,
                            window.start,
                            window.finish
                        );
                    }
                }
            }
            state.complete(&self.graph, &links, id);
        }

        let stuck = state.unscheduled(&self.graph);
        if !stuck.is_empty() {
            log_changes!(verbosity, "  Unschedulable tasks: {:?}", stuck);
            return Err(SchedulerError::Cycle { stuck });
        }

        log_changes!(
            verbosity,
            "=== {} pass complete: {} resources used ===",
            direction,
            resources.len()
        );
        Ok(state.into_result())
    }

    /// Pick the next ready task: the comparator's minimum going forward,
    /// its maximum going backward.
    fn select(&self, state: &mut PassState, direction: Direction) -> Option<TaskId> {
        let candidates = state.ready().iter().enumerate().filter_map(|(index, id)| {
            self.graph.get(*id).map(|task| {
                let candidate = Candidate {
                    task,
                    effective_priority: self.priorities.get(id).map(Vec::as_slice).unwrap_or(&[]),
                };
                (index, candidate)
            })
        });

        let picked = match direction {
            Direction::Asap => candidates.min_by(|a, b| self.comparator.compare(&a.1, &b.1)),
            Direction::Alap => candidates.max_by(|a, b| self.comparator.compare(&a.1, &b.1)),
        };
        let (index, candidate) = picked?;

        log_checks!(
            self.config.verbosity,
            "  Selected task {} from {} ready (type={}, priority={:?})",
            candidate.task.id,
            state.ready().len(),
            candidate.task.task_type.display,
            candidate.effective_priority
        );
        Some(state.take(index))
    }

    /// Effort to place for a leaf.
    fn effort_hours(&self, task: &Task) -> f64 {
        if !task.done && task.remaining_hours.abs() <= HOURS_EPSILON {
            if let Some(pad) = self.config.open_task_pad_hours {
                return pad;
            }
        }
        task.remaining_hours.max(0.0)
    }

    /// Later-of (in `direction`) the resource's next free instant and the
    /// derived boundaries of the task's partners before it.
    fn dependency_anchor(
        &self,
        task: &Task,
        direction: Direction,
        links: &LinkTable,
        state: &PassState,
        resources: &ResourceSchedule,
    ) -> Option<NaiveDateTime> {
        let mut anchor = resources.next_available(&task.resource);
        for partner in links.before(task.id, direction) {
            if let Some(window) = state.window(*partner) {
                let boundary = window.get(direction.to_boundary());
                anchor = Some(anchor.map_or(boundary, |a| direction.later(a, boundary)));
            }
        }
        anchor
    }

    /// Project-level anchor, then the same-day fallback.
    fn default_anchor(
        &self,
        direction: Direction,
        project_anchor: Option<NaiveDateTime>,
    ) -> Option<(NaiveDateTime, DateSource)> {
        let configured = match direction {
            Direction::Asap => self.config.project_start,
            Direction::Alap => self.config.project_finish,
        };
        if let Some(anchor) = project_anchor.or(configured) {
            return Some((anchor, DateSource::Project));
        }
        self.config.today.map(|today| {
            (
                self.calendar.day_boundary(today, direction.from_boundary()),
                DateSource::Today,
            )
        })
    }

    fn place_leaf(
        &self,
        task: &Task,
        direction: Direction,
        project_anchor: Option<NaiveDateTime>,
        links: &LinkTable,
        state: &mut PassState,
        resources: &mut ResourceSchedule,
    ) -> Result<(), SchedulerError> {
        let verbosity = self.config.verbosity;
        let hours = self.effort_hours(task);
        let overflow = || SchedulerError::CalendarOverflow(task.id);

        let (fixed_from, fixed_to) = match direction {
            Direction::Asap => (task.fixed_start, task.fixed_finish),
            Direction::Alap => (task.fixed_finish, task.fixed_start),
        };

        let (from, to, source) = match (fixed_from, fixed_to) {
            (Some(from), Some(to)) => (from, to, DateSource::Task),
            // A single fixed boundary is aligned onto working time like any anchor
            (Some(fixed), None) => {
                let (from, to) = self.calendar.place(fixed, hours, direction).ok_or_else(overflow)?;
                (from, to, DateSource::Task)
            }
            (None, Some(fixed)) => {
                let (to, from) = self
                    .calendar
                    .place(fixed, hours, direction.reverse())
                    .ok_or_else(overflow)?;
                (from, to, DateSource::Task)
            }
            (None, None) => {
                let (anchor, source) =
                    match self.dependency_anchor(task, direction, links, state, resources) {
                        Some(anchor) => (anchor, DateSource::Dependency),
                        None => self.default_anchor(direction, project_anchor).ok_or(
                            SchedulerError::MissingAnchor {
                                task: task.id,
                                boundary: direction.from_boundary(),
                            },
                        )?,
                    };
                log_debug!(
                    verbosity,
                    "  Task {} anchored at {} ({:?}), {} h",
                    task.id,
                    anchor,
                    source,
                    hours
                );
                let (from, to) = self.calendar.place(anchor, hours, direction).ok_or_else(overflow)?;
                (from, to, source)
            }
        };

        let window = Window::oriented(direction, from, to);
        resources.reserve(&task.resource, to);
        state.place(task.id, window, source);
        state.roll_up(&self.graph.ancestors(task.id), window);

        log_changes!(
            verbosity,
            "  Placed task {} on {:?} from {} to {} ({:?})",
            task.id,
            task.resource,
            window.start,
            window.finish,
            source
        );
        Ok(())
    }

    /// Assemble the caller-facing result from the primary pass.
    fn build_result(
        &self,
        primary: &PassResult,
        critical: Option<&FxHashSet<TaskId>>,
    ) -> ScheduleResult {
        let by_start: &dyn Fn(&Task, &Task) -> Ordering =
            &|a, b| compare_start(&primary.windows, a, b);

        let mut scheduled_tasks = Vec::with_capacity(self.graph.len());
        for id in self.graph.wbs_order(Some(by_start)) {
            let (Some(task), Some(window)) = (self.graph.get(id), primary.window(id)) else {
                continue;
            };
            scheduled_tasks.push(ScheduledTask {
                task_id: id,
                name: task.name.clone(),
                resource: task.resource.clone(),
                parent: task.parent,
                is_group: !task.is_leaf(),
                start: window.start,
                finish: window.finish,
                worked_hours: task.worked_hours,
                remaining_hours: task.remaining_hours,
                critical_path: critical.map(|set| set.contains(&id)),
            });
        }

        let mut metadata = HashMap::new();
        metadata.insert("direction".to_string(), self.direction.to_string());
        metadata.insert(
            "hours_per_day".to_string(),
            self.config.hours_per_day.to_string(),
        );
        if let Some(critical) = critical {
            metadata.insert("critical_tasks".to_string(), critical.len().to_string());
        }

        ScheduleResult {
            scheduled_tasks,
            algorithm_metadata: metadata,
        }
    }
}
