pub mod common;
pub mod output;
pub mod protocol;
pub mod transport;
pub mod upload;
pub mod utils;

pub use common::{AppConfig, Credentials, FilesSelection, StructureSelection, UploadError};
pub use protocol::{HttpUploadClient, UploadBackend};
pub use upload::{Orchestrator, UploadState, UploadStatus};
