//! Upload session status and its pure transition function.
//!
//! `transition` never performs I/O. It returns the next state together with
//! the effect the runner has to execute, and the runner reports the outcome
//! of that effect back as another action.

use std::fmt;
use thiserror::Error;

use crate::common::{
    ErrorKind, FilesSelection, StructureSelection, TransferProgress, UploadError,
    UploadSessionId, ValidationResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Initiating,
    Validating,
    Confirming,
    Uploading,
    Finalizing,
    Submitting,
    Finished,
    Error,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Finished | UploadStatus::Error)
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::Initiating => "initiating",
            UploadStatus::Validating => "validating",
            UploadStatus::Confirming => "confirming",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Finalizing => "finalizing",
            UploadStatus::Submitting => "submitting",
            UploadStatus::Finished => "finished",
            UploadStatus::Error => "error",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cloneable record of why a session ended in `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    /// Phase that was active when the failure happened
    pub phase: UploadStatus,
    pub kind: ErrorKind,
    pub message: String,
}

impl UploadFailure {
    pub fn new(phase: UploadStatus, err: &UploadError) -> Self {
        Self {
            phase,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// The service answered, but its reply cannot move the session forward.
    pub fn rejected(phase: UploadStatus, err: &TransitionError) -> Self {
        Self {
            phase,
            kind: ErrorKind::Protocol,
            message: err.to_string(),
        }
    }

    /// Files already reached the service before this failure.
    pub fn files_transferred(&self) -> bool {
        matches!(
            self.phase,
            UploadStatus::Finalizing | UploadStatus::Submitting
        )
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.message)
    }
}

/// Everything the UI needs to render one upload session.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub status: UploadStatus,
    pub structure_selection: Option<StructureSelection>,
    pub files_selection: FilesSelection,
    /// `None` until `begin` succeeds
    pub upload_session_id: Option<UploadSessionId>,
    pub progress: TransferProgress,
    pub validation: Option<ValidationResult>,
    pub overwrite_accepted: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub uploaded_files: Vec<String>,
    pub error: Option<UploadFailure>,
}

impl UploadState {
    pub fn total_size_bytes(&self) -> u64 {
        self.files_selection.total_size_bytes()
    }

    /// Conflicts reported by the validation pass, if it ran.
    pub fn has_conflicts(&self) -> bool {
        self.validation
            .as_ref()
            .is_some_and(ValidationResult::has_conflicts)
    }
}

/// Events fed into [`transition`].
#[derive(Debug, Clone)]
pub enum UploadAction {
    /// User submitted the structure and file selections
    Submit {
        structure: StructureSelection,
        files: FilesSelection,
    },
    Initiated {
        session_id: UploadSessionId,
        start_time: String,
    },
    Validated(ValidationResult),
    /// Automatic continuation when validation found nothing to confirm
    Proceed,
    /// User accepted overwriting existing or empty files
    Confirm,
    Cancel,
    Progress(TransferProgress),
    Uploaded,
    Finalized {
        end_time: String,
    },
    Submitted {
        file_names: Vec<String>,
    },
    Fail(UploadFailure),
    Reset,
}

impl UploadAction {
    pub fn name(&self) -> &'static str {
        match self {
            UploadAction::Submit { .. } => "submit",
            UploadAction::Initiated { .. } => "initiated",
            UploadAction::Validated(_) => "validated",
            UploadAction::Proceed => "proceed",
            UploadAction::Confirm => "confirm",
            UploadAction::Cancel => "cancel",
            UploadAction::Progress(_) => "progress",
            UploadAction::Uploaded => "uploaded",
            UploadAction::Finalized { .. } => "finalized",
            UploadAction::Submitted { .. } => "submitted",
            UploadAction::Fail(_) => "fail",
            UploadAction::Reset => "reset",
        }
    }
}

/// Side effect the runner must execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Begin,
    Validate,
    /// Validation found no conflicts; continue without asking
    AutoConfirm,
    /// Pause until the user confirms or cancels
    AwaitDecision,
    Transfer,
    Finalize,
    Submit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("action '{action}' is not allowed while {status}")]
    NotAllowed {
        status: UploadStatus,
        action: &'static str,
    },
    #[error("no files selected")]
    EmptySelection,
    #[error("service assigned invalid upload session id {0}")]
    InvalidSessionId(UploadSessionId),
    #[error("validation returned {got} record(s) for {expected} file(s)")]
    IncompleteValidation { expected: usize, got: usize },
    #[error("existing or empty files must be confirmed before uploading")]
    ConfirmationRequired,
}

/// Compute the state that follows `action`. On error `state` stays valid and
/// untouched.
pub fn transition(
    state: &UploadState,
    action: UploadAction,
) -> Result<(UploadState, Option<Effect>), TransitionError> {
    use UploadStatus as S;

    let not_allowed = |action: &UploadAction| TransitionError::NotAllowed {
        status: state.status,
        action: action.name(),
    };

    let mut next = state.clone();
    let effect = match (state.status, action) {
        (S::Idle, UploadAction::Submit { structure, files }) => {
            if files.is_empty() {
                return Err(TransitionError::EmptySelection);
            }
            next = UploadState {
                status: S::Initiating,
                progress: TransferProgress::starting(files.len()),
                structure_selection: Some(structure),
                files_selection: files,
                ..UploadState::default()
            };
            Some(Effect::Begin)
        }

        (S::Initiating, UploadAction::Initiated {
            session_id,
            start_time,
        }) => {
            if session_id < 0 {
                return Err(TransitionError::InvalidSessionId(session_id));
            }
            next.status = S::Validating;
            next.upload_session_id = Some(session_id);
            next.start_time = Some(start_time);
            Some(Effect::Validate)
        }

        (S::Validating, UploadAction::Validated(result)) => {
            let expected = state.files_selection.len();
            let got = result.validated_files.len();
            if got != expected {
                return Err(TransitionError::IncompleteValidation { expected, got });
            }
            let conflicts = result.has_conflicts();
            next.status = S::Confirming;
            next.validation = Some(result);
            Some(if conflicts {
                Effect::AwaitDecision
            } else {
                Effect::AutoConfirm
            })
        }

        (S::Confirming, UploadAction::Proceed) => {
            if state.has_conflicts() {
                return Err(TransitionError::ConfirmationRequired);
            }
            next.status = S::Uploading;
            Some(Effect::Transfer)
        }

        (S::Confirming, UploadAction::Confirm) => {
            next.status = S::Uploading;
            next.overwrite_accepted = state.has_conflicts();
            Some(Effect::Transfer)
        }

        (S::Confirming, UploadAction::Cancel) => {
            next.status = S::Idle;
            next.upload_session_id = None;
            next.validation = None;
            next.start_time = None;
            next.overwrite_accepted = false;
            next.progress = TransferProgress::starting(state.files_selection.len());
            None
        }

        (S::Uploading, UploadAction::Progress(progress)) => {
            next.progress = state.progress.merge(progress);
            None
        }

        (S::Uploading, UploadAction::Uploaded) => {
            next.status = S::Finalizing;
            next.progress = TransferProgress::complete();
            Some(Effect::Finalize)
        }

        (S::Finalizing, UploadAction::Finalized { end_time }) => {
            next.status = S::Submitting;
            next.end_time = Some(end_time);
            Some(Effect::Submit)
        }

        (S::Submitting, UploadAction::Submitted { file_names }) => {
            next.status = S::Finished;
            next.uploaded_files = file_names;
            None
        }

        (status, UploadAction::Fail(failure)) if !status.is_terminal() => {
            next.status = S::Error;
            next.error = Some(failure);
            None
        }

        (status, UploadAction::Reset) if status.is_terminal() => {
            next = UploadState::default();
            None
        }

        (_, action) => return Err(not_allowed(&action)),
    };

    Ok((next, effect))
}
