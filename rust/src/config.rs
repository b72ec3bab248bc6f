//! Configuration types for a scheduling run.

use chrono::{Local, NaiveDate, NaiveDateTime};
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration accepted by a scheduling invocation.
///
/// Threaded explicitly through every calendar and scheduling call.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Effort hours available per resource per working day
    #[pyo3(get, set)]
    pub hours_per_day: f64,
    /// Scheduling direction: "asap" or "alap"
    #[pyo3(get, set)]
    pub direction: String,
    /// Project-level start anchor (used by ASAP)
    #[pyo3(get, set)]
    pub project_start: Option<NaiveDateTime>,
    /// Project-level finish anchor (used by ALAP)
    #[pyo3(get, set)]
    pub project_finish: Option<NaiveDateTime>,
    /// Lowest-precedence fallback anchor
    #[pyo3(get, set)]
    pub today: Option<NaiveDate>,
    /// Whether to run the critical path analyzer after the primary pass
    #[pyo3(get, set)]
    pub compute_critical_path: bool,
    /// Effort assumed for an open leaf whose remaining estimate is exactly zero
    #[pyo3(get, set)]
    pub open_task_pad_hours: Option<f64>,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hours_per_day: 8.0,
            direction: "asap".to_string(),
            project_start: None,
            project_finish: None,
            today: None,
            compute_critical_path: false,
            open_task_pad_hours: None,
            verbosity: 0,
        }
    }
}

impl ScheduleConfig {
    /// Fill the fallback anchor from the local clock.
    pub fn with_today(mut self) -> Self {
        self.today = Some(Local::now().date_naive());
        self
    }
}

#[pymethods]
impl ScheduleConfig {
    #[new]
    #[pyo3(signature = (
        hours_per_day=None,
        direction=None,
        project_start=None,
        project_finish=None,
        today=None,
        compute_critical_path=false,
        open_task_pad_hours=None,
        verbosity=0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        hours_per_day: Option<f64>,
        direction: Option<String>,
        project_start: Option<NaiveDateTime>,
        project_finish: Option<NaiveDateTime>,
        today: Option<NaiveDate>,
        compute_critical_path: bool,
        open_task_pad_hours: Option<f64>,
        verbosity: u8,
    ) -> Self {
        let defaults = Self::default();
        Self {
            hours_per_day: hours_per_day.unwrap_or(defaults.hours_per_day),
            direction: direction.unwrap_or(defaults.direction),
            project_start,
            project_finish,
            today,
            compute_critical_path,
            open_task_pad_hours,
            verbosity,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleConfig(hours_per_day={}, direction={:?}, compute_critical_path={})",
            self.hours_per_day, self.direction, self.compute_critical_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScheduleConfig::default();
        assert!((config.hours_per_day - 8.0).abs() < 1e-9);
        assert_eq!(config.direction, "asap");
        assert!(!config.compute_critical_path);
        assert!(config.today.is_none());
    }

    #[test]
    fn test_with_today_sets_fallback() {
        let config = ScheduleConfig::default().with_today();
        assert!(config.today.is_some());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ScheduleConfig =
            serde_json::from_str(r#"{"hours_per_day": 5.0, "direction": "alap"}"#).unwrap();
        assert!((config.hours_per_day - 5.0).abs() < 1e-9);
        assert_eq!(config.direction, "alap");
        assert_eq!(config.verbosity, 0);
        assert!(config.project_start.is_none());
    }
}
