//! Critical path analysis by comparing a pass against its mirror pass.
//!
//! The primary pass fixes every task's window. A second pass runs in the
//! opposite direction, anchored at the far end of the primary schedule. A leaf
//! whose anchored boundary comes out the same in both passes has no float:
//! moving it would move the project's end. Groups containing such a leaf are
//! critical too. The second pass's windows are only compared, never returned.

use rustc_hash::FxHashSet;

use crate::graph::TaskId;
use crate::log_changes;
use crate::scheduler::{PassResult, Scheduler, SchedulerError};

/// Ids of the critical tasks for a primary pass produced by `scheduler`.
pub fn find_critical_tasks(
    scheduler: &Scheduler,
    primary: &PassResult,
) -> Result<FxHashSet<TaskId>, SchedulerError> {
    let mut critical: FxHashSet<TaskId> = FxHashSet::default();
    let Some(span) = primary.span() else {
        return Ok(critical);
    };

    let direction = primary.direction;
    // Finish of a forward schedule, start of a backward one
    let anchor = span.get(direction.to_boundary());
    let secondary = scheduler.run_pass(direction.reverse(), Some(anchor))?;

    let graph = scheduler.graph();
    let calendar = scheduler.calendar();
    let boundary = direction.from_boundary();

    for task in graph.iter().filter(|t| t.is_leaf()) {
        let (Some(first), Some(second)) = (primary.window(task.id), secondary.window(task.id))
        else {
            continue;
        };
        if calendar.same_working_instant(first.get(boundary), second.get(boundary)) {
            critical.insert(task.id);
            critical.extend(graph.ancestors(task.id));
        }
    }

    log_changes!(
        scheduler.config().verbosity,
        "Critical path: {} of {} tasks",
        critical.len(),
        graph.len()
    );
    Ok(critical)
}
