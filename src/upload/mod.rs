mod orchestrator;
mod transport;
mod types;

pub use orchestrator::UploadOrchestrator;
pub use transport::{DryRunTransport, HttpTransport, UploadTransport};
pub use types::{
    BatchOutcome, BatchUploadState, JobResult, JobState, JobStatus, UploadEvent, UploadJob,
};
