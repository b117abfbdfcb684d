//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a store.
//!
//! # Tasks
//! - Janitor: Reaps expired entries and purges unpopular ones under capacity pressure

mod janitor;

pub use janitor::{run_janitor_pass, spawn_janitor_task, JanitorPolicy, JanitorReport};
