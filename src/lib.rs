//! Schedule conflict checking and cross-collection synchronization for an
//! academic administration system.
//!
//! The `teachers` collection holds each instructor's authoritative
//! schedule list; `subjects` and `sections` hold denormalized copies for
//! fast reads. This crate validates candidate schedules, rejects
//! instructor time conflicts before anything is written, and keeps the
//! copies converged with the authoritative list afterwards.

pub mod config;
pub mod conflict;
pub mod schedule;
pub mod server;
pub mod store;
pub mod sync;
pub mod types;
