//! Task hierarchy management.
//!
//! Tasks carry a generated unique code and form a forest through an optional
//! parent code. The module enforces a maximum depth, rejects reparenting that
//! would create a cycle, and refuses to delete tasks that still have
//! children. It follows hexagonal architecture:
//!
//! - Domain types and hierarchy rules in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
