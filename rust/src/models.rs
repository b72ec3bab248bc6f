//! Records exchanged with the caller: normalized task input and scheduled output.

use chrono::NaiveDateTime;
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::{TaskId, NO_PARENT};

fn no_parent() -> TaskId {
    NO_PARENT
}

/// A normalized task record, as produced by the issue-tracker collaborator.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[pyo3(get, set)]
    pub id: TaskId,
    #[pyo3(get, set)]
    #[serde(default)]
    pub name: String,
    #[pyo3(get, set)]
    #[serde(default)]
    pub resource: String,
    #[pyo3(get, set)]
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[pyo3(get, set)]
    #[serde(default)]
    pub priority: String,
    #[pyo3(get, set)]
    #[serde(default = "no_parent")]
    pub parent: TaskId,
    #[pyo3(get, set)]
    #[serde(default)]
    pub children: Vec<TaskId>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub predecessors: Vec<TaskId>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub successors: Vec<TaskId>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub worked_hours: f64,
    #[pyo3(get, set)]
    #[serde(default)]
    pub remaining_hours: f64,
    #[pyo3(get, set)]
    #[serde(default)]
    pub fixed_start: Option<NaiveDateTime>,
    #[pyo3(get, set)]
    #[serde(default)]
    pub fixed_finish: Option<NaiveDateTime>,
    /// Work on the task is complete (no padding applies)
    #[pyo3(get, set)]
    #[serde(default)]
    pub done: bool,
}

impl TaskRecord {
    /// A root leaf with no links and no effort.
    pub fn new(id: TaskId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            resource: String::new(),
            task_type: String::new(),
            priority: String::new(),
            parent: NO_PARENT,
            children: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            worked_hours: 0.0,
            remaining_hours: 0.0,
            fixed_start: None,
            fixed_finish: None,
            done: false,
        }
    }
}

#[pymethods]
impl TaskRecord {
    #[new]
    #[pyo3(signature = (
        id,
        name,
        resource=String::new(),
        task_type=String::new(),
        priority=String::new(),
        parent=NO_PARENT,
        children=Vec::new(),
        predecessors=Vec::new(),
        successors=Vec::new(),
        worked_hours=0.0,
        remaining_hours=0.0,
        fixed_start=None,
        fixed_finish=None,
        done=false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        id: TaskId,
        name: String,
        resource: String,
        task_type: String,
        priority: String,
        parent: TaskId,
        children: Vec<TaskId>,
        predecessors: Vec<TaskId>,
        successors: Vec<TaskId>,
        worked_hours: f64,
        remaining_hours: f64,
        fixed_start: Option<NaiveDateTime>,
        fixed_finish: Option<NaiveDateTime>,
        done: bool,
    ) -> Self {
        Self {
            id,
            name,
            resource,
            task_type,
            priority,
            parent,
            children,
            predecessors,
            successors,
            worked_hours,
            remaining_hours,
            fixed_start,
            fixed_finish,
            done,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TaskRecord(id={}, name={:?}, resource={:?}, children={})",
            self.id,
            self.name,
            self.resource,
            self.children.len()
        )
    }
}

/// A task with its computed schedule.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[pyo3(get, set)]
    pub task_id: TaskId,
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub resource: String,
    #[pyo3(get, set)]
    pub parent: TaskId,
    #[pyo3(get, set)]
    pub is_group: bool,
    #[pyo3(get, set)]
    pub start: NaiveDateTime,
    #[pyo3(get, set)]
    pub finish: NaiveDateTime,
    #[pyo3(get, set)]
    pub worked_hours: f64,
    #[pyo3(get, set)]
    pub remaining_hours: f64,
    /// Only set when critical path analysis was requested
    #[pyo3(get, set)]
    pub critical_path: Option<bool>,
}

#[pymethods]
impl ScheduledTask {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(task_id={}, start={}, finish={}, critical_path={:?})",
            self.task_id, self.start, self.finish, self.critical_path
        )
    }
}

/// Result of a scheduling run.
#[pyclass]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Tasks in WBS order, siblings ordered by start
    #[pyo3(get, set)]
    pub scheduled_tasks: Vec<ScheduledTask>,
    #[pyo3(get, set)]
    pub algorithm_metadata: HashMap<String, String>,
}

impl ScheduleResult {
    /// Look up a task's schedule by id.
    pub fn get(&self, task_id: TaskId) -> Option<&ScheduledTask> {
        self.scheduled_tasks.iter().find(|t| t.task_id == task_id)
    }
}

#[pymethods]
impl ScheduleResult {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(scheduled_tasks={}, metadata_keys={})",
            self.scheduled_tasks.len(),
            self.algorithm_metadata.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_minimal_json() {
        let record: TaskRecord =
            serde_json::from_str(r#"{"id": 7, "type": "Bug", "remaining_hours": 3.5}"#).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.task_type, "Bug");
        assert_eq!(record.parent, NO_PARENT);
        assert!(record.children.is_empty());
        assert!((record.remaining_hours - 3.5).abs() < 1e-9);
        assert!(!record.done);
    }

    #[test]
    fn test_record_fixed_dates_from_json() {
        let record: TaskRecord = serde_json::from_str(
            r#"{"id": 3, "fixed_start": "2019-01-07T00:00:00", "parent": 1}"#,
        )
        .unwrap();
        assert_eq!(record.parent, 1);
        assert_eq!(
            record.fixed_start.map(|d| d.to_string()),
            Some("2019-01-07 00:00:00".to_string())
        );
        assert!(record.fixed_finish.is_none());
    }
}
