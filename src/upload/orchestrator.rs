use super::transport::UploadTransport;
use super::types::{BatchOutcome, JobResult, UploadEvent, UploadJob};
use crate::auth::AuthSession;
use crate::error::{Result, UploaderError};
use crate::files::FileEntry;
use crate::selection::Destination;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tracing::{info, warn};

/// Turns a file snapshot and a destination into concurrent upload jobs.
pub struct UploadOrchestrator<T: UploadTransport + ?Sized> {
    transport: Arc<T>,
    timeout: Duration,
}

impl<T: UploadTransport + ?Sized> UploadOrchestrator<T> {
    pub fn new(transport: Arc<T>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Starts one job per file at once, with no cap, and waits until every
    /// job has settled. A failing job never stops its siblings; failures
    /// are only visible in the returned outcome and the events.
    pub async fn dispatch(
        &self,
        files: Vec<FileEntry>,
        destination: Destination,
        session: &AuthSession,
        events: &Sender<UploadEvent>,
    ) -> BatchOutcome {
        info!(
            "Dispatching {} uploads to {}/{}/{}/{}",
            files.len(),
            destination.project_number,
            destination.subject_label,
            destination.session_label,
            destination.data_type
        );

        let mut in_flight: FuturesUnordered<_> = files
            .into_iter()
            .map(|file| {
                events
                    .send(UploadEvent::JobStarted {
                        uid: file.uid.clone(),
                    })
                    .unwrap_or_default();
                let job = UploadJob {
                    destination: destination.clone(),
                    file,
                };
                self.run_job(job, session)
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        while let Some(result) = in_flight.next().await {
            match &result.outcome {
                Ok(()) => info!("Uploaded '{}'", result.name),
                Err(e) => warn!("Upload of '{}' failed: {}", result.name, e),
            }
            events
                .send(UploadEvent::JobSettled(result.clone()))
                .unwrap_or_default();
            outcome.results.push(result);
        }

        info!(
            "Batch settled: {} succeeded, {} failed",
            outcome.succeeded(),
            outcome.failed()
        );
        events
            .send(UploadEvent::BatchSettled(outcome.clone()))
            .unwrap_or_default();
        outcome
    }

    async fn run_job(&self, job: UploadJob, session: &AuthSession) -> JobResult {
        let outcome = match tokio::time::timeout(self.timeout, self.upload(&job, session)).await {
            Ok(result) => result,
            Err(_) => Err(UploaderError::Transport(format!(
                "timeout of {}ms exceeded",
                self.timeout.as_millis()
            ))),
        };
        JobResult {
            uid: job.file.uid,
            name: job.file.name,
            outcome,
        }
    }

    /// Opens the file for the transport to stream; nothing is buffered here.
    async fn upload(&self, job: &UploadJob, session: &AuthSession) -> Result<()> {
        let file = File::open(&job.file.path).await?;
        self.transport.upload(session, job, file).await
    }
}
