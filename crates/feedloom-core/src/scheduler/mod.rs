mod service;

pub use service::{SchedulerEvent, SchedulerService};
