mod state;
mod ui;

use crate::auth::{AuthSession, Project};
use crate::config::Config;
use crate::error::{ErrorReporter, UploaderError};
use crate::files::{FileEntry, FileRegistry};
use crate::selection::{LabelField, SelectionEvent, SelectionMachine};
use crate::upload::{UploadOrchestrator, UploadTransport};
use eframe::{egui, App};
use state::LoginForm;
pub use state::{AuthState, ErrorModal, LabelInputs, UploadState, WorkerMessage};
use std::future::Future;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct StreamerUploader {
    config: Config,
    transport: Arc<dyn UploadTransport>,
    auth: AuthState,
    login_form: LoginForm,
    projects: Vec<Project>,
    selection: SelectionMachine,
    inputs: LabelInputs,
    registry: FileRegistry,
    upload: UploadState,
    errors: ErrorModal,
    worker_sender: Sender<WorkerMessage>,
    worker_receiver: Receiver<WorkerMessage>,
}

/// Runs `task` on its own thread with a single-threaded tokio runtime, so
/// every job of a batch is interleaved on one event loop and the UI thread
/// never blocks.
fn spawn_worker<F, Fut>(sender: Sender<WorkerMessage>, task: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    std::thread::spawn(move || {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(task()),
            Err(e) => {
                error!("Failed to start async runtime: {}", e);
                sender
                    .send(WorkerMessage::WorkerFailed(e.to_string()))
                    .unwrap_or_default();
            }
        }
    });
}

impl StreamerUploader {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: Config,
        transport: Arc<dyn UploadTransport>,
    ) -> Self {
        Self::with_transport(config, transport)
    }

    fn with_transport(config: Config, transport: Arc<dyn UploadTransport>) -> Self {
        info!("Initializing Research Data Uploader ({})", config.server_url);
        let (worker_sender, worker_receiver) = mpsc::channel();
        Self {
            registry: FileRegistry::with_max_size(config.max_file_size),
            config,
            transport,
            auth: AuthState::default(),
            login_form: LoginForm::default(),
            projects: Vec::new(),
            selection: SelectionMachine::new(),
            inputs: LabelInputs::default(),
            upload: UploadState::default(),
            errors: ErrorModal::default(),
            worker_sender,
            worker_receiver,
        }
    }

    pub fn start_login(&mut self) {
        if !matches!(self.auth, AuthState::LoggedOut) {
            return;
        }
        if self.login_form.username.is_empty() {
            self.login_form.error = Some("Please input your username".to_string());
            return;
        }
        if self.login_form.password.is_empty() {
            self.login_form.error = Some("Please input your password".to_string());
            return;
        }
        self.login_form.error = None;

        let session = AuthSession::new(
            self.login_form.username.clone(),
            self.login_form.password.clone(),
        );
        info!("Logging in as {}", session.username());
        self.auth = AuthState::LoggingIn;

        let transport = self.transport.clone();
        let sender = self.worker_sender.clone();
        spawn_worker(self.worker_sender.clone(), move || async move {
            let result = transport.login(&session).await;
            sender
                .send(WorkerMessage::LoginFinished(session, result))
                .unwrap_or_default();
        });
    }

    fn start_project_fetch(&mut self, session: AuthSession) {
        let transport = self.transport.clone();
        let sender = self.worker_sender.clone();
        let fetch_session = session.clone();
        self.auth = AuthState::LoadingProjects(session);

        spawn_worker(self.worker_sender.clone(), move || async move {
            let result = transport.fetch_projects(&fetch_session).await;
            sender
                .send(WorkerMessage::ProjectsLoaded(result))
                .unwrap_or_default();
        });
    }

    /// Drops the session and everything selected under it.
    pub fn log_out(&mut self) {
        if self.upload.is_uploading() {
            return;
        }
        info!("Logging out");
        self.auth = AuthState::LoggedOut;
        self.login_form.password.clear();
        self.login_form.error = None;
        self.projects.clear();
        self.selection.reset();
        self.inputs.clear();
        self.registry.clear();
        self.upload.clear();
    }

    fn handle_worker_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::LoginFinished(session, result) => {
                if !matches!(self.auth, AuthState::LoggingIn) {
                    return;
                }
                match result {
                    Ok(()) => {
                        info!("Logged in as {}", session.username());
                        self.start_project_fetch(session);
                    }
                    Err(e) => {
                        warn!("Login failed for {}", session.username());
                        self.auth = AuthState::LoggedOut;
                        self.login_form.password.clear();
                        self.errors.report(&e);
                    }
                }
            }
            WorkerMessage::ProjectsLoaded(result) => {
                let AuthState::LoadingProjects(session) = &self.auth else {
                    return;
                };
                let session = session.clone();
                match result {
                    Ok(projects) => {
                        info!("{} projects available to {}", projects.len(), session.username());
                        self.projects = projects;
                    }
                    Err(e) => {
                        self.projects.clear();
                        self.errors.report(&e);
                    }
                }
                self.auth = AuthState::Ready(session);
            }
            WorkerMessage::WorkerFailed(reason) => {
                let next = match &self.auth {
                    AuthState::LoggingIn => Some(AuthState::LoggedOut),
                    AuthState::LoadingProjects(session) => Some(AuthState::Ready(session.clone())),
                    _ => None,
                };
                if let Some(next) = next {
                    self.auth = next;
                }
                if self.upload.is_uploading() {
                    self.upload.clear();
                }
                self.errors.report(&UploaderError::Transport(reason));
            }
        }
    }

    pub fn select_project(&mut self, number: String) {
        if let Err(e) = self.selection.apply(SelectionEvent::SelectProject(number)) {
            warn!("Project selection rejected: {}", e);
        }
        self.inputs.clear();
    }

    /// Feeds the edited text of `field` to the selection machine. A rejected
    /// edit shows the inline message and falls back to the value the machine
    /// kept.
    pub fn change_label(&mut self, field: LabelField) {
        let text = self.inputs.get(field).text.clone();
        let event = match field {
            LabelField::Subject => SelectionEvent::SubjectChanged(text),
            LabelField::Session => SelectionEvent::SessionChanged(text),
            LabelField::DataTypeOther => SelectionEvent::DataTypeOtherChanged(text),
        };
        let result = self.selection.apply(event);
        let input = self.inputs.get_mut(field);
        match result {
            Ok(()) => input.error = None,
            Err(e) => {
                input.text = self.selection.label_value(field).to_string();
                input.error = Some(e.to_string());
            }
        }
        self.inputs.clear_after(field);
    }

    pub fn select_data_type(&mut self, value: &str) {
        if let Err(e) = self
            .selection
            .apply(SelectionEvent::DataTypeSelected(value.to_string()))
        {
            warn!("Data type selection rejected: {}", e);
        }
        self.inputs.data_type_other.clear();
    }

    pub fn add_batch(&mut self, batch: Vec<FileEntry>) {
        if batch.is_empty() || self.upload.batch.is_some() {
            return;
        }
        if let Err(rejection) = self.registry.submit_batch(batch) {
            self.errors.report(&UploaderError::from(rejection));
        }
    }

    pub fn remove_file(&mut self, uid: &str, name: &str, size: u64) {
        if self.upload.batch.is_none() {
            self.registry.remove(uid, name, size);
        }
    }

    pub fn clear_files(&mut self) {
        if self.upload.batch.is_none() {
            self.registry.clear();
        }
    }

    pub fn can_upload(&self) -> bool {
        self.auth.is_authenticated()
            && self.upload.batch.is_none()
            && self.selection.upload_permitted(self.registry.len())
    }

    pub fn start_upload(&mut self) {
        if !self.can_upload() {
            return;
        }
        let (Some(destination), Some(session)) =
            (self.selection.destination(), self.auth.session().cloned())
        else {
            return;
        };

        let files = self.registry.snapshot();
        info!("Starting upload of {} files", files.len());
        let events = self.upload.begin(&files);
        let orchestrator = UploadOrchestrator::new(self.transport.clone(), self.config.upload_timeout);

        spawn_worker(self.worker_sender.clone(), move || async move {
            orchestrator
                .dispatch(files, destination, &session, &events)
                .await;
        });
    }

    /// Acknowledges a finished batch: the file list is emptied, the
    /// destination is kept.
    pub fn upload_another_batch(&mut self) {
        if !self.upload.is_finished() {
            return;
        }
        self.upload.clear();
        self.registry.clear();
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        let mut had_updates = false;

        while let Ok(message) = self.worker_receiver.try_recv() {
            had_updates = true;
            self.handle_worker_message(message);
        }

        if self.upload.drain() {
            had_updates = true;
            let failure = self
                .upload
                .batch
                .as_ref()
                .and_then(|batch| batch.outcome())
                .and_then(|outcome| outcome.to_error());
            if let Some(e) = failure {
                self.errors.report(&e);
            }
        }

        let busy = self.upload.is_uploading()
            || matches!(
                self.auth,
                AuthState::LoggingIn | AuthState::LoadingProjects(_)
            );
        if had_updates || busy {
            ctx.request_repaint();
        }
    }
}

impl App for StreamerUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
