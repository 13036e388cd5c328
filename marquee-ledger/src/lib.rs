//! Booking rules and the in-process store.
//!
//! `policy` holds the pure reservation and cancellation decisions shared by
//! every store, `catalog` validates event and profile input, and `memory`
//! is a complete store used by tests and local runs without Postgres.

pub mod catalog;
pub mod memory;
pub mod policy;

pub use memory::MemoryStore;
pub use policy::{CancelCapability, REFUND_NOTE};
