mod markers;
mod task;
mod task_utils;
mod timeout_map;

pub use markers::RecurringFn;
pub use markers::TimeoutKeyRequirements;
pub use task::ScheduledTask;
pub use task::Scheduler;
pub use task::TokioScheduledTask;
pub use task::TokioScheduler;
pub use task_utils::task_elements::TaskConfig;
pub use task_utils::task_elements::TaskError;
pub use timeout_map::Deadline;
pub use timeout_map::TimeoutMap;
pub use timeout_map::TimeoutMapError;
