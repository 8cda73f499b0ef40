//! Scripted backend for unit tests of the upload phases.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::common::{
    AddFileResult, BeginResult, Credentials, FileDescriptor, FinalizeResult, StructureSelection,
    SubmitResult, TransportFailure, UploadError, UploadSessionId, ValidationRecord,
};
use crate::protocol::UploadBackend;

#[derive(Default)]
pub(crate) struct MockBackend {
    pub existing: HashSet<String>,
    pub empty: HashSet<String>,
    pub begin_times_out: bool,
    /// Session id handed out by `begin`, 42 when unset
    pub session_id: Option<UploadSessionId>,
    pub failing_validation: Option<String>,
    pub failing_transfer: Option<String>,
    pub transfer_delay: Duration,
    pub failing_finalize: bool,
    pub failing_submit: bool,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) added: Mutex<Vec<String>>,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UploadBackend for MockBackend {
    async fn begin(
        &self,
        credentials: &Credentials,
        structure: &StructureSelection,
    ) -> Result<BeginResult, UploadError> {
        self.record("begin".to_string());
        if self.begin_times_out {
            return Err(UploadError::RetryExhausted {
                operation: "begin",
                attempts: 2,
                source: TransportFailure::Timeout(Duration::from_secs(2)),
            });
        }
        Ok(BeginResult {
            upload_session_id: self.session_id.unwrap_or(42),
            username: credentials.username().to_string(),
            ip_address: "127.0.0.1".to_string(),
            project_number: structure.project_number().to_string(),
            subject_label: structure.subject_label().to_string(),
            session_label: structure.session_label().to_string(),
            data_type: structure.data_type().to_string(),
            start_time: "2026-10-18T09:00:00Z".to_string(),
        })
    }

    async fn validate_file(
        &self,
        _credentials: &Credentials,
        _session_id: UploadSessionId,
        _structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> Result<ValidationRecord, UploadError> {
        self.record(format!("validatefile:{}", file.name));
        if self.failing_validation.as_deref() == Some(file.name.as_str()) {
            return Err(UploadError::Application("validation rejected".to_string()));
        }
        Ok(ValidationRecord {
            filename: file.name.clone(),
            file_exists: self.existing.contains(&file.name),
            file_is_empty: self.empty.contains(&file.name),
        })
    }

    async fn add_file(
        &self,
        _credentials: &Credentials,
        _session_id: UploadSessionId,
        _structure: &StructureSelection,
        file: &FileDescriptor,
    ) -> Result<AddFileResult, UploadError> {
        self.record(format!("addfile:{}", file.name));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.transfer_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_transfer.as_deref() == Some(file.name.as_str()) {
            return Err(UploadError::Application("disk quota exceeded".to_string()));
        }
        let mut added = self.added.lock().unwrap();
        added.push(file.name.clone());
        Ok(AddFileResult {
            upload_file_id: added.len() as i64,
        })
    }

    async fn finalize(
        &self,
        _credentials: &Credentials,
        session_id: UploadSessionId,
        _structure: &StructureSelection,
    ) -> Result<FinalizeResult, UploadError> {
        self.record("finalize".to_string());
        if self.failing_finalize {
            return Err(UploadError::Application("session not found".to_string()));
        }
        Ok(FinalizeResult {
            upload_session_id: session_id,
            end_time: "2026-10-18T09:05:00Z".to_string(),
        })
    }

    async fn submit(
        &self,
        _credentials: &Credentials,
        session_id: UploadSessionId,
        _structure: &StructureSelection,
    ) -> Result<SubmitResult, UploadError> {
        self.record("submit".to_string());
        if self.failing_submit {
            return Err(UploadError::empty_data());
        }
        Ok(SubmitResult {
            upload_session_id: session_id,
            file_names: self.added(),
        })
    }
}

pub(crate) fn structure() -> StructureSelection {
    StructureSelection::new("3010000.01", "S01", "01", "eeg").unwrap()
}

pub(crate) fn credentials() -> Arc<Credentials> {
    Arc::new(Credentials::new("jdoe", "secret"))
}

pub(crate) fn files(specs: &[(&str, usize)]) -> Vec<FileDescriptor> {
    specs
        .iter()
        .map(|(name, size)| FileDescriptor::in_memory(*name, vec![1u8; *size]))
        .collect()
}
