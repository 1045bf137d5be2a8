pub mod health;
pub mod presence;
pub mod queue;
pub mod realtime;
pub mod schedule;
