use crate::error::UploaderError;
use crate::files::FileEntry;
use crate::selection::Destination;

/// Everything one upload request carries except the file bytes, which are
/// read only when the job runs.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub destination: Destination,
    pub file: FileEntry,
}

impl UploadJob {
    /// Text fields of the multipart form, in wire order. The file bytes go
    /// last under `files`.
    pub fn form_fields(&self) -> [(&'static str, String); 7] {
        [
            ("projectNumber", self.destination.project_number.clone()),
            ("subjectLabel", self.destination.subject_label.clone()),
            ("sessionLabel", self.destination.session_label.clone()),
            ("dataType", self.destination.data_type.clone()),
            ("filename", self.file.name.clone()),
            ("filesize", self.file.size.to_string()),
            ("uid", self.file.uid.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InFlight,
    Done,
    Failed(String),
}

impl JobStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct JobState {
    pub uid: String,
    pub name: String,
    pub status: JobStatus,
}

/// Settled result of one job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub uid: String,
    pub name: String,
    pub outcome: Result<(), UploaderError>,
}

/// Typed result of a whole batch. Dispatch always produces one; failures
/// live inside.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<JobResult>,
}

impl BatchOutcome {
    pub fn overall_failed(&self) -> bool {
        self.results.iter().any(|result| result.outcome.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &UploaderError)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.name.as_str(), e)))
    }

    /// The single error reported once the batch has settled, if any job failed.
    pub fn to_error(&self) -> Option<UploaderError> {
        let failures: Vec<(String, String)> = self
            .failures()
            .map(|(name, err)| (name.to_string(), err.to_string()))
            .collect();
        if failures.is_empty() {
            None
        } else {
            Some(UploaderError::JobFailures(failures))
        }
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    JobStarted { uid: String },
    JobSettled(JobResult),
    BatchSettled(BatchOutcome),
}

/// Progress of one dispatched batch as seen by the UI.
///
/// The percentage advances by `floor(100 / n)` per settled job, whatever
/// order they settle in, and snaps to 100 once every job has settled.
#[derive(Debug, Clone)]
pub struct BatchUploadState {
    jobs: Vec<JobState>,
    settled: usize,
    percent: u8,
    overall_failed: bool,
    outcome: Option<BatchOutcome>,
}

impl BatchUploadState {
    pub fn new(files: &[FileEntry]) -> Self {
        Self {
            jobs: files
                .iter()
                .map(|file| JobState {
                    uid: file.uid.clone(),
                    name: file.name.clone(),
                    status: JobStatus::Pending,
                })
                .collect(),
            settled: 0,
            percent: 0,
            overall_failed: false,
            outcome: None,
        }
    }

    pub fn jobs(&self) -> &[JobState] {
        &self.jobs
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn overall_failed(&self) -> bool {
        self.overall_failed
    }

    pub fn settled(&self) -> usize {
        self.settled
    }

    /// Every job has settled, successfully or not.
    pub fn is_complete(&self) -> bool {
        self.settled == self.jobs.len()
    }

    pub fn outcome(&self) -> Option<&BatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn apply(&mut self, event: UploadEvent) {
        match event {
            UploadEvent::JobStarted { uid } => {
                if let Some(job) = self.job_mut(&uid) {
                    if job.status == JobStatus::Pending {
                        job.status = JobStatus::InFlight;
                    }
                }
            }
            UploadEvent::JobSettled(result) => self.settle(result),
            UploadEvent::BatchSettled(outcome) => {
                for result in outcome.results.iter().cloned() {
                    self.settle(result);
                }
                self.outcome = Some(outcome);
            }
        }
    }

    fn settle(&mut self, result: JobResult) {
        let Some(job) = self.job_mut(&result.uid) else {
            return;
        };
        // A job observed twice counts once.
        if job.status.is_settled() {
            return;
        }
        job.status = match &result.outcome {
            Ok(()) => JobStatus::Done,
            Err(e) => JobStatus::Failed(e.to_string()),
        };
        if result.outcome.is_err() {
            self.overall_failed = true;
        }

        self.settled += 1;
        let total = self.jobs.len();
        self.percent = if self.settled == total {
            100
        } else {
            let step = 100 / total;
            (self.settled * step).min(100) as u8
        };
    }

    fn job_mut(&mut self, uid: &str) -> Option<&mut JobState> {
        self.jobs.iter_mut().find(|job| job.uid == uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<FileEntry> {
        (0..n)
            .map(|i| FileEntry::new(format!("f{}.dat", i), 10, format!("/tmp/f{}.dat", i)))
            .collect()
    }

    fn settled(file: &FileEntry, ok: bool) -> UploadEvent {
        UploadEvent::JobSettled(JobResult {
            uid: file.uid.clone(),
            name: file.name.clone(),
            outcome: if ok {
                Ok(())
            } else {
                Err(UploaderError::Transport("Network Error".into()))
            },
        })
    }

    #[test]
    fn test_seven_jobs_snap_to_hundred() {
        let files = files(7);
        let mut state = BatchUploadState::new(&files);
        let mut last = 0;
        for (i, file) in files.iter().enumerate() {
            state.apply(settled(file, true));
            assert!(state.percent() >= last);
            last = state.percent();
            if i < 6 {
                assert_eq!(state.percent() as usize, (i + 1) * 14);
            }
        }
        assert!(state.is_complete());
        assert_eq!(state.percent(), 100);
        assert!(!state.overall_failed());
    }

    #[test]
    fn test_failed_job_counts_as_settled() {
        let files = files(3);
        let mut state = BatchUploadState::new(&files);
        state.apply(settled(&files[2], false));
        state.apply(settled(&files[0], true));
        assert!(!state.is_complete());
        assert_eq!(state.percent(), 66);
        state.apply(settled(&files[1], true));

        assert!(state.is_complete());
        assert!(state.overall_failed());
        assert_eq!(state.percent(), 100);
        assert_eq!(
            state.jobs()[2].status,
            JobStatus::Failed("Network Error".into())
        );
    }

    #[test]
    fn test_duplicate_settlement_is_ignored() {
        let files = files(2);
        let mut state = BatchUploadState::new(&files);
        state.apply(settled(&files[0], true));
        state.apply(settled(&files[0], true));
        assert_eq!(state.settled(), 1);
        assert_eq!(state.percent(), 50);
    }

    #[test]
    fn test_started_marks_job_in_flight() {
        let files = files(1);
        let mut state = BatchUploadState::new(&files);
        state.apply(UploadEvent::JobStarted {
            uid: files[0].uid.clone(),
        });
        assert_eq!(state.jobs()[0].status, JobStatus::InFlight);
        assert_eq!(state.percent(), 0);
    }

    #[test]
    fn test_batch_settled_fills_in_missed_jobs() {
        let files = files(2);
        let mut state = BatchUploadState::new(&files);
        state.apply(settled(&files[0], true));

        let outcome = BatchOutcome {
            results: vec![
                JobResult {
                    uid: files[0].uid.clone(),
                    name: files[0].name.clone(),
                    outcome: Ok(()),
                },
                JobResult {
                    uid: files[1].uid.clone(),
                    name: files[1].name.clone(),
                    outcome: Err(UploaderError::Transport("timeout".into())),
                },
            ],
        };
        state.apply(UploadEvent::BatchSettled(outcome));

        assert!(state.is_complete());
        assert_eq!(state.percent(), 100);
        assert!(state.overall_failed());
        assert_eq!(state.outcome().map(BatchOutcome::failed), Some(1));
        assert_eq!(
            state.outcome().and_then(BatchOutcome::to_error).map(|e| e.to_string()),
            Some("Upload of 1 file failed:\nf1.dat: timeout".to_string())
        );
    }

    #[test]
    fn test_form_fields_order() {
        let file = FileEntry::new("scan.nii", 42, "/data/scan.nii");
        let job = UploadJob {
            destination: Destination {
                project_number: "3010000.01".into(),
                subject_label: "sub01".into(),
                session_label: "ses01".into(),
                data_type: "mri".into(),
            },
            file: file.clone(),
        };
        let names: Vec<_> = job.form_fields().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "projectNumber",
                "subjectLabel",
                "sessionLabel",
                "dataType",
                "filename",
                "filesize",
                "uid"
            ]
        );
        assert_eq!(job.form_fields()[5].1, "42");
        assert_eq!(job.form_fields()[6].1, file.uid);
    }
}
