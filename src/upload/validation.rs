//! Sequential pre-check of every selected file.

use tracing::{debug, warn};

use crate::common::{
    Credentials, FileDescriptor, StructureSelection, UploadError, UploadSessionId,
    ValidationResult,
};
use crate::protocol::UploadBackend;

/// Call `validate_file` once per file, in selection order, and collect the
/// files that already exist or are empty. The first failure aborts the pass.
pub async fn validate_files<B: UploadBackend + ?Sized>(
    backend: &B,
    credentials: &Credentials,
    session_id: UploadSessionId,
    structure: &StructureSelection,
    files: &[FileDescriptor],
) -> Result<ValidationResult, UploadError> {
    let mut result = ValidationResult {
        validated_files: Vec::with_capacity(files.len()),
        ..Default::default()
    };

    for file in files {
        let record = backend
            .validate_file(credentials, session_id, structure, file)
            .await
            .inspect_err(|err| warn!("Validation of {} failed: {}", file.name, err))?;

        if record.file_exists {
            result.existing_files.push(file.name.clone());
        }
        if record.file_is_empty {
            result.empty_files.push(file.name.clone());
        }
        result.validated_files.push(record);
    }

    debug!(
        "Validated {} file(s): {} existing, {} empty",
        result.validated_files.len(),
        result.existing_files.len(),
        result.empty_files.len()
    );
    Ok(result)
}
