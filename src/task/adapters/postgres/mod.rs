//! `PostgreSQL` adapters for task hierarchy persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresTaskRepository, TaskPgPool};
