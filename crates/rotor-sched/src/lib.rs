//! Event queue and scheduler for the Rotor simulation kernel.
//!
//! [`EventQueue`] is a min-heap keyed by `(time, insertion order)`.
//! [`Scheduler`] wraps it with id allocation, a past-time guard and
//! cancellation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod queue;
pub mod scheduler;

pub use queue::EventQueue;
pub use scheduler::{ScheduleError, Scheduler};
