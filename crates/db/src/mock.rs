//! mockall doubles of the store traits, for exercising error paths without a database.

pub mod repositories;

pub use repositories::{MockPresenceRepo, MockQueueRepo, MockScheduleRepo};
