//! Session, structure and file models plus the typed replies of the service.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::errors::{SelectionError, UploadError};
use crate::utils::security;

/// Server-assigned handle of an upload session.
pub type UploadSessionId = i64;

/// Username/password pair used to sign every request of one session.
///
/// Built once from the login input and shared by reference; the password is
/// never serialized or printed.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Destination of an upload: project, subject, session and data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSelection {
    project_number: String,
    subject_label: String,
    session_label: String,
    data_type: String,
}

impl StructureSelection {
    /// Validates every label and builds the selection.
    pub fn new(
        project_number: impl Into<String>,
        subject_label: impl Into<String>,
        session_label: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Result<Self, SelectionError> {
        let selection = Self {
            project_number: project_number.into(),
            subject_label: subject_label.into(),
            session_label: session_label.into(),
            data_type: data_type.into(),
        };

        security::validate_project_number(&selection.project_number)?;
        security::validate_label("subject label", &selection.subject_label)?;
        security::validate_label("session label", &selection.session_label)?;
        security::validate_data_type(&selection.data_type)?;

        Ok(selection)
    }

    pub fn project_number(&self) -> &str {
        &self.project_number
    }

    pub fn subject_label(&self) -> &str {
        &self.subject_label
    }

    pub fn session_label(&self) -> &str {
        &self.session_label
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Where the service will store the files under `project_root`.
    pub fn project_storage_path(&self, project_root: &Path) -> PathBuf {
        project_root
            .join(&self.project_number)
            .join("raw")
            .join(format!("sub-{}", self.subject_label))
            .join(format!("ses-{}", self.session_label))
            .join(&self.data_type)
    }
}

/// Where the bytes of a selected file come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Bytes),
}

/// One selected file.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    pub uid: String,
    pub source: FileSource,
}

impl FileDescriptor {
    /// Describe a file on disk. Directories are refused.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| UploadError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();

        if !metadata.is_file() {
            return Err(SelectionError::NotAFile(name).into());
        }

        Ok(Self {
            name,
            size: metadata.len(),
            uid: Uuid::new_v4().to_string(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Describe a buffer already held in memory.
    pub fn in_memory(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            uid: Uuid::new_v4().to_string(),
            source: FileSource::Memory(data),
        }
    }
}

/// Per-file result of the validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRecord {
    pub filename: String,
    pub file_exists: bool,
    pub file_is_empty: bool,
}

/// Consolidated outcome of validating the whole selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub existing_files: Vec<String>,
    pub empty_files: Vec<String>,
    pub validated_files: Vec<ValidationRecord>,
}

impl ValidationResult {
    /// True when the user must decide before anything is transferred.
    pub fn has_conflicts(&self) -> bool {
        !self.existing_files.is_empty() || !self.empty_files.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginResult {
    pub upload_session_id: UploadSessionId,
    pub username: String,
    #[serde(default)]
    pub ip_address: String,
    pub project_number: String,
    pub subject_label: String,
    pub session_label: String,
    pub data_type: String,
    pub start_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFileResult {
    pub upload_file_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResult {
    pub upload_session_id: UploadSessionId,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub upload_session_id: UploadSessionId,
    pub file_names: Vec<String>,
}
