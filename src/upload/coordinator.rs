//! Concurrent `add_file` fan-out with single-consumer progress aggregation.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::common::{
    Credentials, FileDescriptor, ProgressAggregator, StructureSelection, TransferProgress,
    UploadError, UploadSessionId,
};
use crate::protocol::UploadBackend;

/// Session-wide inputs shared by every transfer task.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub credentials: Arc<Credentials>,
    pub session_id: UploadSessionId,
    pub structure: Arc<StructureSelection>,
    pub concurrency: usize,
}

enum TaskOutcome {
    Done(u64),
    Failed(String, UploadError),
    /// Never started because the phase had already failed
    Skipped(String),
}

/// Transfer every file with at most `job.concurrency` in flight.
///
/// Completions are folded into one [`ProgressAggregator`] by this function
/// alone and each new snapshot is handed to `on_progress`. The first failure
/// closes the pool: tasks still waiting for a permit are skipped, tasks in
/// flight run to completion and their results are discarded.
pub async fn transfer_files<B, F>(
    backend: Arc<B>,
    job: TransferJob,
    files: Vec<FileDescriptor>,
    mut on_progress: F,
) -> Result<TransferProgress, UploadError>
where
    B: UploadBackend,
    F: FnMut(TransferProgress),
{
    let total_size_bytes: u64 = files.iter().map(|f| f.size).sum();
    let mut aggregator = ProgressAggregator::new(total_size_bytes, files.len());
    let permits = Arc::new(Semaphore::new(job.concurrency.max(1)));

    info!(
        "Transferring {} file(s), {} bytes, {} at a time",
        files.len(),
        total_size_bytes,
        job.concurrency.max(1)
    );

    let mut tasks = JoinSet::new();
    for file in files {
        let backend = Arc::clone(&backend);
        let permits = Arc::clone(&permits);
        let job = job.clone();

        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return TaskOutcome::Skipped(file.name);
            };

            match backend
                .add_file(&job.credentials, job.session_id, &job.structure, &file)
                .await
            {
                Ok(_) => TaskOutcome::Done(file.size),
                Err(err) => TaskOutcome::Failed(file.name, err),
            }
        });
    }

    let mut failure: Option<UploadError> = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(join_err) => {
                warn!("Transfer task aborted: {}", join_err);
                if failure.is_none() {
                    permits.close();
                    failure = Some(UploadError::TaskAborted(join_err.to_string()));
                }
                continue;
            }
        };

        match outcome {
            TaskOutcome::Done(size) if failure.is_none() => {
                on_progress(aggregator.file_completed(size));
            }
            TaskOutcome::Done(_) => {}
            TaskOutcome::Failed(filename, err) => {
                warn!("Transfer of {} failed: {}", filename, err);
                if failure.is_none() {
                    permits.close();
                    failure = Some(UploadError::FileTransfer {
                        filename,
                        source: Box::new(err),
                    });
                }
            }
            TaskOutcome::Skipped(filename) => debug!("Skipped {} after failure", filename),
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(aggregator.snapshot()),
    }
}
