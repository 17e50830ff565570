//! In-memory adapters for the task hierarchy.

mod task;

pub use task::InMemoryTaskRepository;
