use async_trait::async_trait;

use crate::common::{
    AddFileResult, BeginResult, Credentials, FileDescriptor, FinalizeResult, StructureSelection,
    SubmitResult, UploadError, UploadSessionId, ValidationRecord,
};

/// The five remote operations of an upload session.
///
/// Implemented over HTTP by [`super::HttpUploadClient`]; tests drive the
/// orchestrator through in-memory implementations.
#[async_trait]
pub trait UploadBackend: Send + Sync + 'static {
    /// Open a session. Not deduplicated by the service, so a retried call may
    /// leave an orphaned session behind.
    async fn begin(
        &self,
        credentials: &Credentials,
        structure: &StructureSelection,
    ) -> Result<BeginResult, UploadError>;

    /// Read-only check of one file against the destination.
    async fn validate_file(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> Result<ValidationRecord, UploadError>;

    /// Transfer one file. Repeating it may store the content twice.
    async fn add_file(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> Result<AddFileResult, UploadError>;

    /// Close the session for further additions.
    async fn finalize(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
    ) -> Result<FinalizeResult, UploadError>;

    /// Trigger downstream processing of everything that was added.
    async fn submit(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
    ) -> Result<SubmitResult, UploadError>;
}
