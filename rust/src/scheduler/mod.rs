//! Scheduling engine: places leaves on the working calendar one at a time,
//! serializing each resource and rolling timing up to the groups.
//!
//! A pass runs in one [`Direction`](crate::calendar::Direction): forward from
//! the project start (ASAP) or backward from the project finish (ALAP).

mod core;
mod resource_schedule;
mod state;

pub use self::core::{PassResult, Scheduler, SchedulerError};
pub use resource_schedule::ResourceSchedule;
pub use state::PassState;
