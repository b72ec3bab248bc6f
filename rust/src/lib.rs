//! Work-breakdown-structure scheduling with critical path analysis.
//!
//! Takes a hierarchy of tasks (groups and leaf work items) with dependency
//! links, effort estimates, and one resource per leaf, and places every leaf
//! on a weekday working calendar. Groups take the span of their leaves.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

pub mod calendar;
mod config;
pub mod critical_path;
pub mod graph;
pub mod logging;
mod models;
pub mod normalize;
pub mod scheduler;
pub mod sorting;

pub use calendar::{Boundary, Calendar, DateSource, Direction, Window};
pub use config::ScheduleConfig;
pub use critical_path::find_critical_tasks;
pub use graph::{GraphError, Task, TaskGraph, TaskId, NO_PARENT};
pub use models::{ScheduleResult, ScheduledTask, TaskRecord};
pub use scheduler::{PassResult, Scheduler, SchedulerError};
pub use sorting::{Candidate, DefaultComparator, OrderingPolicy, TaskComparator};

/// Build, normalize, and schedule a task graph from collaborator records.
pub fn schedule(
    records: &[TaskRecord],
    policy: &OrderingPolicy,
    config: &ScheduleConfig,
) -> Result<ScheduleResult, SchedulerError> {
    let graph = TaskGraph::from_records(records, policy, config.verbosity)?;
    Scheduler::new(graph, config.clone())?.schedule()
}

/// Schedule tasks and optionally mark the critical path.
///
/// # Arguments
/// * `records` - Normalized task records
/// * `config` - Scheduling configuration
/// * `type_order` - Ordering list for the `type` field (default: Bug, Task)
/// * `priority_order` - Ordering list for the `priority` field
///   (default: Blocker, Critical, Major, Normal, Minor, Trivial)
///
/// # Returns
/// * ScheduleResult with tasks in WBS order
///
/// # Raises
/// * ValueError on invalid configuration, a dependency cycle, or a task with
///   no anchor date
#[pyfunction]
#[pyo3(signature = (records, config, type_order=None, priority_order=None))]
fn schedule_tasks(
    records: Vec<TaskRecord>,
    config: ScheduleConfig,
    type_order: Option<Vec<String>>,
    priority_order: Option<Vec<String>>,
) -> PyResult<ScheduleResult> {
    let policy = OrderingPolicy::with_overrides(type_order, priority_order);
    schedule(&records, &policy, &config)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// The wbs_sched Python module.
#[pymodule]
fn wbs_sched(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Data types
    m.add_class::<TaskRecord>()?;
    m.add_class::<ScheduledTask>()?;
    m.add_class::<ScheduleResult>()?;

    // Config types
    m.add_class::<ScheduleConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(schedule_tasks, m)?)?;

    Ok(())
}
