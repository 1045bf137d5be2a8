//! # Office Hours Core
//!
//! Domain types and services for the office-hours live queue.
//!
//! - **Models**: queue entries, schedules, presence records and the acting user
//! - **Events**: the realtime channel wire format and the [`events::EventPublisher`] seam
//! - **Store**: storage traits plus an in-memory implementation
//! - **Service**: the queue state machine, schedule management and presence tracking

/// Error taxonomy shared by every layer
pub mod errors;
/// Realtime channel events and client frames
pub mod events;
/// Per-instructor mutation locks
pub mod locks;
/// Domain models
pub mod models;
/// Queue, schedule and presence services
pub mod service;
/// Storage traits and the in-memory store
pub mod store;
