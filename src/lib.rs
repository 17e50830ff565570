//! Tasktree: hierarchical task management with generated task codes.
//!
//! This crate stores tasks as a forest at most five levels deep. Each task
//! carries a unique `AA-00-xxxx` code issued by the service, and the service
//! enforces depth, cycle-freedom, and child-before-parent deletion around
//! every create, update, and delete.
//!
//! # Architecture
//!
//! Tasktree follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`task`]: Task codes, hierarchy rules, storage, and orchestration
//! - [`worker`]: Helpers for the `pg_worker` binary that runs embedded
//!   `PostgreSQL` for integration tests

pub mod task;
pub mod worker;
