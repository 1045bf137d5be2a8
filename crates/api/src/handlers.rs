pub mod presence;
pub mod queue;
pub mod schedule;
