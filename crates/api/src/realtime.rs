//! Realtime channel: one broadcast hub shared by every WebSocket session.
//! Each session keeps its own room set and forwards only the events scoped
//! to a room it joined, plus global events.

pub mod hub;
pub mod socket;

pub use hub::BroadcastHub;
