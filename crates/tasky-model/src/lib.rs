//! Plain data shared by the tasky crates.
//!
//! Nothing in here owns a runtime: the types describe *what* should run
//! (schedules, slots, capabilities) and *how it went* (statuses, outcomes).
mod domain;
pub use domain::*;
