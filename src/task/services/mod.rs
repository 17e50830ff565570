//! Application services for task hierarchy orchestration.

mod code_generator;
mod config;
mod error;
mod manager;
mod requests;
mod view;

pub use code_generator::{
    CodeGenerationError, CodeGenerator, CodeReservation, MAX_GENERATION_ATTEMPTS,
};
pub use config::{DEFAULT_PAGE_SIZE, TaskManagerConfig};
pub use error::{TaskErrorKind, TaskManagerError, TaskManagerResult};
pub use manager::TaskManager;
pub use requests::{ListTasksRequest, TaskRequest};
pub use view::TaskView;
