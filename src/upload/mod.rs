//! Upload session orchestration: state machine, phases and runner.

pub mod coordinator;
pub mod runner;
pub mod state;
pub mod validation;

#[cfg(test)]
pub(crate) mod mock;

pub use coordinator::{transfer_files, TransferJob};
pub use runner::Orchestrator;
pub use state::{
    transition, Effect, TransitionError, UploadAction, UploadFailure, UploadState, UploadStatus,
};
pub use validation::validate_files;
