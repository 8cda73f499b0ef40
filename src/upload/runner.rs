//! Executes the effects emitted by [`transition`] against an upload backend.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::coordinator::{transfer_files, TransferJob};
use super::state::{
    transition, Effect, TransitionError, UploadAction, UploadFailure, UploadState, UploadStatus,
};
use super::validation::validate_files;
use crate::common::{
    Credentials, FilesSelection, StructureSelection, TransferSettings, UploadError,
    UploadSessionId,
};
use crate::protocol::UploadBackend;

/// Owns one upload session at a time and drives it through its phases.
///
/// The orchestrator is the only writer of [`UploadState`]. Every change is
/// published on a watch channel so a UI can render it.
pub struct Orchestrator<B: UploadBackend> {
    backend: Arc<B>,
    credentials: Arc<Credentials>,
    transfer: TransferSettings,
    state: UploadState,
    updates: watch::Sender<UploadState>,
}

impl<B: UploadBackend> Orchestrator<B> {
    pub fn new(backend: Arc<B>, credentials: Arc<Credentials>, transfer: TransferSettings) -> Self {
        let (updates, _) = watch::channel(UploadState::default());
        Self {
            backend,
            credentials,
            transfer,
            state: UploadState::default(),
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn status(&self) -> UploadStatus {
        self.state.status
    }

    /// True once the session sits in `Finished` or `Error`.
    pub fn is_done(&self) -> bool {
        self.state.status.is_terminal()
    }

    /// Start a session and run it until it finishes, fails, or needs the
    /// user to confirm existing or empty files.
    pub async fn start(
        &mut self,
        structure: StructureSelection,
        files: FilesSelection,
    ) -> Result<&UploadState, TransitionError> {
        let effect = self.dispatch(UploadAction::Submit { structure, files })?;
        self.drive(effect).await?;
        Ok(&self.state)
    }

    /// Accept overwriting the reported conflicts and continue the upload.
    pub async fn confirm(&mut self) -> Result<&UploadState, TransitionError> {
        let effect = self.dispatch(UploadAction::Confirm)?;
        self.drive(effect).await?;
        Ok(&self.state)
    }

    /// Abandon a paused session. The selections are kept for another try.
    pub fn cancel(&mut self) -> Result<&UploadState, TransitionError> {
        self.dispatch(UploadAction::Cancel)?;
        Ok(&self.state)
    }

    /// Leave a finished or failed session.
    pub fn reset(&mut self) -> Result<&UploadState, TransitionError> {
        self.dispatch(UploadAction::Reset)?;
        Ok(&self.state)
    }

    fn dispatch(&mut self, action: UploadAction) -> Result<Option<Effect>, TransitionError> {
        let action_name = action.name();
        let (next, effect) = transition(&self.state, action)?;

        if next.status != self.state.status {
            debug!(
                "Upload status {} -> {} on {}",
                self.state.status, next.status, action_name
            );
        }

        self.state = next;
        self.updates.send_replace(self.state.clone());
        Ok(effect)
    }

    async fn drive(&mut self, mut effect: Option<Effect>) -> Result<(), TransitionError> {
        loop {
            match effect {
                None => return Ok(()),
                Some(Effect::AwaitDecision) => {
                    info!("Waiting for confirmation of existing or empty files");
                    return Ok(());
                }
                Some(current) => {
                    let phase = self.state.status;
                    let action = self.run_effect(current).await;
                    effect = match self.dispatch(action) {
                        Ok(next) => next,
                        Err(err) => {
                            warn!("Upload {} produced an unusable result: {}", phase, err);
                            let failure = UploadFailure::rejected(phase, &err);
                            self.dispatch(UploadAction::Fail(failure))?
                        }
                    };
                }
            }
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> UploadAction {
        let phase = self.state.status;
        let outcome = match effect {
            Effect::Begin => self.begin().await,
            Effect::Validate => self.validate().await,
            // The transition refuses to proceed past unconfirmed conflicts
            Effect::AutoConfirm | Effect::AwaitDecision => Ok(UploadAction::Proceed),
            Effect::Transfer => self.transfer().await,
            Effect::Finalize => self.finalize().await,
            Effect::Submit => self.submit().await,
        };

        outcome.unwrap_or_else(|err| {
            warn!("Upload {} failed: {}", phase, err);
            UploadAction::Fail(UploadFailure::new(phase, &err))
        })
    }

    fn session(&self) -> Result<(UploadSessionId, &StructureSelection), UploadError> {
        match (self.state.upload_session_id, &self.state.structure_selection) {
            (Some(id), Some(structure)) => Ok((id, structure)),
            _ => Err(UploadError::Protocol(
                "no active upload session".to_string(),
            )),
        }
    }

    async fn begin(&self) -> Result<UploadAction, UploadError> {
        let structure = self.state.structure_selection.as_ref().ok_or_else(|| {
            UploadError::Protocol("no structure selected".to_string())
        })?;
        let result = self.backend.begin(&self.credentials, structure).await?;
        Ok(UploadAction::Initiated {
            session_id: result.upload_session_id,
            start_time: result.start_time,
        })
    }

    async fn validate(&self) -> Result<UploadAction, UploadError> {
        let (session_id, structure) = self.session()?;
        let result = validate_files(
            self.backend.as_ref(),
            &self.credentials,
            session_id,
            structure,
            self.state.files_selection.files(),
        )
        .await?;
        Ok(UploadAction::Validated(result))
    }

    async fn transfer(&mut self) -> Result<UploadAction, UploadError> {
        let (session_id, structure) = self.session()?;
        let job = TransferJob {
            credentials: Arc::clone(&self.credentials),
            session_id,
            structure: Arc::new(structure.clone()),
            concurrency: self.transfer.concurrency,
        };
        let files = self.state.files_selection.files().to_vec();
        let backend = Arc::clone(&self.backend);

        transfer_files(backend, job, files, |progress| {
            if let Err(err) = self.dispatch(UploadAction::Progress(progress)) {
                warn!("Dropped progress update: {}", err);
            }
        })
        .await?;

        Ok(UploadAction::Uploaded)
    }

    async fn finalize(&self) -> Result<UploadAction, UploadError> {
        let (session_id, structure) = self.session()?;
        let result = self
            .backend
            .finalize(&self.credentials, session_id, structure)
            .await?;
        Ok(UploadAction::Finalized {
            end_time: result.end_time,
        })
    }

    async fn submit(&self) -> Result<UploadAction, UploadError> {
        let (session_id, structure) = self.session()?;
        let result = self
            .backend
            .submit(&self.credentials, session_id, structure)
            .await?;
        Ok(UploadAction::Submitted {
            file_names: result.file_names,
        })
    }
}
