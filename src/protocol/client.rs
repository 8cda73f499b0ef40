//! HTTP implementation of the upload session protocol.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::backend::UploadBackend;
use crate::common::config::{AppConfig, Operation, RetryPolicy};
use crate::common::{
    AddFileResult, BeginResult, Credentials, FileDescriptor, FinalizeResult, StructureSelection,
    SubmitResult, UploadError, UploadSessionId, ValidationRecord,
};
use crate::transport::{MultipartSpec, RequestSpec, RetryingTransport};

/// Retry budget of each remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPolicies {
    pub begin: RetryPolicy,
    pub validate_file: RetryPolicy,
    pub add_file: RetryPolicy,
    pub finalize: RetryPolicy,
    pub submit: RetryPolicy,
}

impl OperationPolicies {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            begin: config.retry_policy(Operation::Begin),
            validate_file: config.retry_policy(Operation::ValidateFile),
            add_file: config.retry_policy(Operation::AddFile),
            finalize: config.retry_policy(Operation::Finalize),
            submit: config.retry_policy(Operation::Submit),
        }
    }
}

/// Talks to `{base_url}/upload/*` with basic auth and JSON envelopes.
#[derive(Debug, Clone)]
pub struct HttpUploadClient {
    transport: RetryingTransport,
    base_url: String,
    policies: OperationPolicies,
}

impl HttpUploadClient {
    pub fn new(base_url: &str, policies: OperationPolicies) -> Self {
        Self::with_transport(RetryingTransport::default(), base_url, policies)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.server_url, OperationPolicies::from_config(config))
    }

    pub fn with_transport(
        transport: RetryingTransport,
        base_url: &str,
        policies: OperationPolicies,
    ) -> Self {
        Self {
            transport,
            // Ensure base URL doesn't have trailing slash
            base_url: base_url.trim_end_matches('/').to_string(),
            policies,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, operation: Operation) -> String {
        format!("{}/upload/{}", self.base_url, operation.label())
    }

    fn session_body(session_id: UploadSessionId, structure: &StructureSelection) -> serde_json::Value {
        json!({
            "uploadSessionId": session_id,
            "projectNumber": structure.project_number(),
            "subjectLabel": structure.subject_label(),
            "sessionLabel": structure.session_label(),
            "dataType": structure.data_type(),
        })
    }

    fn file_form(
        file_field: &'static str,
        session_id: UploadSessionId,
        structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> MultipartSpec {
        MultipartSpec {
            fields: vec![
                ("uploadSessionId", session_id.to_string()),
                ("projectNumber", structure.project_number().to_string()),
                ("subjectLabel", structure.subject_label().to_string()),
                ("sessionLabel", structure.session_label().to_string()),
                ("dataType", structure.data_type().to_string()),
                ("filename", file.name.clone()),
                ("fileSizeBytes", file.size.to_string()),
            ],
            file_field,
            file_name: file.name.clone(),
            file_size: file.size,
            source: file.source.clone(),
        }
    }
}

#[async_trait]
impl UploadBackend for HttpUploadClient {
    async fn begin(
        &self,
        credentials: &Credentials,
        structure: &StructureSelection,
    ) -> Result<BeginResult, UploadError> {
        let body = serde_json::to_value(structure)
            .map_err(|e| UploadError::Protocol(format!("cannot encode structure: {e}")))?;
        let spec = RequestSpec::post_json(self.url(Operation::Begin), body)
            .with_credentials(credentials);

        let result: BeginResult = self
            .transport
            .execute(Operation::Begin.label(), &spec, &self.policies.begin)
            .await?;

        if result.upload_session_id < 0 {
            return Err(UploadError::Protocol(format!(
                "service returned invalid upload session id {}",
                result.upload_session_id
            )));
        }

        info!(
            "Upload session {} started for {}",
            result.upload_session_id, result.username
        );
        Ok(result)
    }

    async fn validate_file(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> Result<ValidationRecord, UploadError> {
        let form = Self::file_form("validatefile", session_id, structure, file);
        let spec = RequestSpec::post_multipart(self.url(Operation::ValidateFile), form)
            .with_credentials(credentials);

        let record: ValidationRecord = self
            .transport
            .execute(
                Operation::ValidateFile.label(),
                &spec,
                &self.policies.validate_file,
            )
            .await?;

        debug!(
            "Validated {}: exists={} empty={}",
            file.name, record.file_exists, record.file_is_empty
        );
        Ok(record)
    }

    async fn add_file(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> Result<AddFileResult, UploadError> {
        let form = Self::file_form("addfile", session_id, structure, file);
        let spec = RequestSpec::post_multipart(self.url(Operation::AddFile), form)
            .with_credentials(credentials);

        let result: AddFileResult = self
            .transport
            .execute(Operation::AddFile.label(), &spec, &self.policies.add_file)
            .await?;

        debug!("Added {} as file {}", file.name, result.upload_file_id);
        Ok(result)
    }

    async fn finalize(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
    ) -> Result<FinalizeResult, UploadError> {
        let spec = RequestSpec::post_json(
            self.url(Operation::Finalize),
            Self::session_body(session_id, structure),
        )
        .with_credentials(credentials);

        self.transport
            .execute(Operation::Finalize.label(), &spec, &self.policies.finalize)
            .await
    }

    async fn submit(
        &self,
        credentials: &Credentials,
        session_id: UploadSessionId,
        structure: &StructureSelection,
    ) -> Result<SubmitResult, UploadError> {
        let spec = RequestSpec::post_json(
            self.url(Operation::Submit),
            Self::session_body(session_id, structure),
        )
        .with_credentials(credentials);

        let result: SubmitResult = self
            .transport
            .execute(Operation::Submit.label(), &spec, &self.policies.submit)
            .await?;

        info!(
            "Session {} submitted with {} file(s)",
            session_id,
            result.file_names.len()
        );
        Ok(result)
    }
}
