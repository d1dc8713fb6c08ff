//! Simulator process supervision module.
//!
//! This module launches one device simulator per generated config file,
//! tracks the resulting processes and coordinates their shutdown.

pub mod command;
pub mod supervisor;
pub mod types;

// Re-export commonly used types for convenience
pub use command::SimulatorCommand;
pub use supervisor::Supervisor;
pub use types::{
    DeviceRange, ExitRecord, ProcessHandle, RunOutcome, RunReport, SupervisorError,
    SupervisorState, INTERRUPTED_EXIT_CODE,
};
