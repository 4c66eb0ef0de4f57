use crate::auth::{AuthSession, Project};
use crate::error::{ErrorReporter, UploaderError};
use crate::files::FileEntry;
use crate::selection::LabelField;
use crate::upload::{BatchUploadState, UploadEvent};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::error;

#[derive(Debug, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    LoggingIn,
    LoadingProjects(AuthSession),
    Ready(AuthSession),
}

impl AuthState {
    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            AuthState::LoadingProjects(session) | AuthState::Ready(session) => Some(session),
            AuthState::LoggedOut | AuthState::LoggingIn => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }
}

/// Results handed back from worker threads.
#[derive(Debug)]
pub enum WorkerMessage {
    LoginFinished(AuthSession, Result<(), UploaderError>),
    ProjectsLoaded(Result<Vec<Project>, UploaderError>),
    /// The worker could not even start its runtime.
    WorkerFailed(String),
}

#[derive(Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct LabelInput {
    pub text: String,
    pub error: Option<String>,
}

impl LabelInput {
    pub fn clear(&mut self) {
        self.text.clear();
        self.error = None;
    }
}

/// Raw text of the three label fields plus their inline messages.
#[derive(Default)]
pub struct LabelInputs {
    pub subject: LabelInput,
    pub session: LabelInput,
    pub data_type_other: LabelInput,
}

impl LabelInputs {
    pub fn get(&self, field: LabelField) -> &LabelInput {
        match field {
            LabelField::Subject => &self.subject,
            LabelField::Session => &self.session,
            LabelField::DataTypeOther => &self.data_type_other,
        }
    }

    pub fn get_mut(&mut self, field: LabelField) -> &mut LabelInput {
        match field {
            LabelField::Subject => &mut self.subject,
            LabelField::Session => &mut self.session,
            LabelField::DataTypeOther => &mut self.data_type_other,
        }
    }

    /// Clears every field after `field` in wizard order.
    pub fn clear_after(&mut self, field: LabelField) {
        match field {
            LabelField::Subject => {
                self.session.clear();
                self.data_type_other.clear();
            }
            LabelField::Session => self.data_type_other.clear(),
            LabelField::DataTypeOther => {}
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Dismissible error modal. Dismissing leaves the rest of the app as it was.
#[derive(Default)]
pub struct ErrorModal {
    message: Option<String>,
}

impl ErrorModal {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn dismiss(&mut self) {
        self.message = None;
    }
}

impl ErrorReporter for ErrorModal {
    fn report(&mut self, err: &UploaderError) {
        error!("{}", err);
        self.message = Some(err.to_string());
    }
}

/// The batch currently shown in the upload modal.
#[derive(Default)]
pub struct UploadState {
    pub batch: Option<BatchUploadState>,
    pub show_details: bool,
    pub status_receiver: Option<Receiver<UploadEvent>>,
}

impl UploadState {
    /// Creates the progress state for `files` and the channel the
    /// orchestrator reports on.
    pub fn begin(&mut self, files: &[FileEntry]) -> Sender<UploadEvent> {
        let (sender, receiver) = mpsc::channel();
        self.batch = Some(BatchUploadState::new(files));
        self.status_receiver = Some(receiver);
        self.show_details = false;
        sender
    }

    /// Applies pending events. Returns true once the batch has fully settled
    /// during this call.
    pub fn drain(&mut self) -> bool {
        let (Some(receiver), Some(batch)) = (&self.status_receiver, &mut self.batch) else {
            return false;
        };
        let mut finished = false;
        while let Ok(event) = receiver.try_recv() {
            finished |= matches!(event, UploadEvent::BatchSettled(_));
            batch.apply(event);
        }
        if finished {
            self.status_receiver = None;
        }
        finished
    }

    pub fn is_uploading(&self) -> bool {
        self.batch.as_ref().is_some_and(|batch| batch.outcome().is_none())
    }

    pub fn is_finished(&self) -> bool {
        self.batch.as_ref().is_some_and(|batch| batch.outcome().is_some())
    }

    pub fn progress_fraction(&self) -> f32 {
        self.batch
            .as_ref()
            .map(|batch| f32::from(batch.percent()) / 100.0)
            .unwrap_or(0.0)
    }

    pub fn status_text(&self) -> String {
        let Some(batch) = &self.batch else {
            return String::new();
        };
        let total = batch.jobs().len();
        match batch.outcome() {
            Some(outcome) => format!(
                "Final Status: {}/{} files | ✅ Success: {} | ❌ Failed: {}",
                total,
                total,
                outcome.succeeded(),
                outcome.failed()
            ),
            None => format!("Progress: {}/{} files settled", batch.settled(), total),
        }
    }

    pub fn clear(&mut self) {
        *self = UploadState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{BatchOutcome, JobResult};

    #[test]
    fn test_upload_state_drains_until_batch_settles() {
        let files = vec![
            FileEntry::new("a", 1, "/tmp/a"),
            FileEntry::new("b", 1, "/tmp/b"),
        ];
        let mut state = UploadState::default();
        let sender = state.begin(&files);
        assert!(state.is_uploading());

        let result = |file: &FileEntry| JobResult {
            uid: file.uid.clone(),
            name: file.name.clone(),
            outcome: Ok(()),
        };
        sender.send(UploadEvent::JobSettled(result(&files[0]))).unwrap();
        assert!(!state.drain());
        assert_eq!(state.progress_fraction(), 0.5);
        assert_eq!(state.status_text(), "Progress: 1/2 files settled");

        sender.send(UploadEvent::JobSettled(result(&files[1]))).unwrap();
        sender
            .send(UploadEvent::BatchSettled(BatchOutcome {
                results: files.iter().map(result).collect(),
            }))
            .unwrap();
        assert!(state.drain());
        assert!(state.is_finished());
        assert!(!state.is_uploading());
        assert_eq!(state.progress_fraction(), 1.0);
        assert!(state.status_text().starts_with("Final Status: 2/2 files"));
    }

    #[test]
    fn test_error_modal_keeps_message_until_dismissed() {
        let mut modal = ErrorModal::default();
        modal.report(&UploaderError::Transport("Network Error".into()));
        assert_eq!(modal.message(), Some("Network Error"));
        modal.dismiss();
        assert_eq!(modal.message(), None);
    }

    #[test]
    fn test_clearing_subject_clears_downstream_inputs() {
        let mut inputs = LabelInputs::default();
        inputs.subject.text = "sub01".into();
        inputs.session.text = "ses01".into();
        inputs.data_type_other.text = "eye".into();

        inputs.clear_after(LabelField::Subject);
        assert_eq!(inputs.get(LabelField::Subject).text, "sub01");
        assert!(inputs.session.text.is_empty());
        assert!(inputs.data_type_other.text.is_empty());
    }
}
