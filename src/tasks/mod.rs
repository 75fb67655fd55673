//! Background tasks
//!
//! Long-running tokio tasks spawned at startup: the scheduled rank-check
//! pass and periodic maintenance (expired sessions, rate limiter state).

pub mod scheduler;

pub use scheduler::Scheduler;
