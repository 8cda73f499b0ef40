pub mod config;
pub mod config_commands;
pub mod errors;
pub mod progress;
pub mod selection;
pub mod types;

pub use config::{AppConfig, Operation, RetryPolicy, TransferSettings};
pub use errors::{ErrorKind, SelectionError, TransportFailure, UploadError};
pub use progress::{ProgressAggregator, TransferProgress};
pub use selection::FilesSelection;
pub use types::{
    AddFileResult, BeginResult, Credentials, FileDescriptor, FileSource, FinalizeResult,
    StructureSelection, SubmitResult, UploadSessionId, ValidationRecord, ValidationResult,
};
