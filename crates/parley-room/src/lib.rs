//! Room membership for Parley.
//!
//! This crate owns the canonical room records and answers the one
//! question everything else keeps asking: *is this user a member of that
//! room?* That check is the sole authorization gate for sending into a
//! room, reading its history, and attaching to its live channel.
//!
//! [`RoomService`] wraps the durable store with the membership rules:
//! who may create, who may add members, and what happens when the
//! creator walks out. It deliberately knows nothing about live sessions —
//! notifying members is the presence layer's job; this crate just reports
//! what changed via [`LeaveOutcome`] and the returned records.

mod error;
mod service;

pub use error::RoomError;
pub use service::{LeaveOutcome, RoomService};
