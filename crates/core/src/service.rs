pub mod presence;
pub mod queue;
pub mod schedule;

pub use presence::PresenceService;
pub use queue::QueueService;
pub use schedule::ScheduleService;
