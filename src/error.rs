//! Error types shared by the uploader.
//!
//! Every failure the user can see goes through [`UploaderError`]; its
//! `Display` output is exactly the text shown in the error modal.

use crate::files::BatchRejection;
use crate::selection::LabelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploaderError {
    /// Label or format violation, recovered locally and never sent anywhere.
    #[error(transparent)]
    Validation(#[from] LabelError),

    /// A selected batch of files was dropped as a whole.
    #[error(transparent)]
    Rejected(#[from] BatchRejection),

    /// The login endpoint answered with an application-level `error` field.
    #[error("{0}")]
    Auth(String),

    /// A response arrived, but with a non-success status.
    #[error("{body}")]
    Http { status: u16, body: String },

    /// No response at all: connection refused, DNS, timeout, ...
    #[error("{0}")]
    Transport(String),

    #[error("Failed to read file: {0}")]
    Io(String),

    /// One or more jobs of a settled batch failed; `(file name, reason)`.
    #[error("{}", describe_job_failures(.0))]
    JobFailures(Vec<(String, String)>),
}

fn describe_job_failures(failures: &[(String, String)]) -> String {
    let mut text = if failures.len() == 1 {
        "Upload of 1 file failed:".to_string()
    } else {
        format!("Upload of {} files failed:", failures.len())
    };
    for (name, reason) in failures {
        text.push_str(&format!("\n{}: {}", name, reason));
    }
    text
}

pub type Result<T> = std::result::Result<T, UploaderError>;

impl UploaderError {
    /// Builds the error for a response-bearing failure. JSON bodies are
    /// pretty-printed for display, anything else is shown verbatim.
    pub fn from_response(status: u16, body: &str) -> Self {
        let body = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
            Err(_) if body.trim().is_empty() => format!("Request failed with status code {}", status),
            Err(_) => body.to_string(),
        };
        Self::Http { status, body }
    }
}

impl From<reqwest::Error> for UploaderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Transport(format!("Request timed out: {}", err));
        }
        Self::Transport(err.to_string())
    }
}

impl From<std::io::Error> for UploaderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Surfaces a failure to the user. The UI implements this with a
/// dismissible modal; tests collect the messages.
pub trait ErrorReporter {
    fn report(&mut self, error: &UploaderError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_body_is_pretty_printed() {
        let err = UploaderError::from_response(500, r#"{"error":"disk full","code":7}"#);
        let text = err.to_string();
        assert!(text.contains("\"error\": \"disk full\""));
        assert!(text.contains('\n'));
        assert!(matches!(err, UploaderError::Http { status: 500, .. }));
    }

    #[test]
    fn test_plain_response_body_is_shown_verbatim() {
        let err = UploaderError::from_response(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Bad Gateway");
    }

    #[test]
    fn test_empty_response_body_falls_back_to_status() {
        let err = UploaderError::from_response(404, "");
        assert_eq!(err.to_string(), "Request failed with status code 404");
    }

    #[test]
    fn test_job_failures_list_every_file() {
        let err = UploaderError::JobFailures(vec![
            ("a.dat".into(), "Network Error".into()),
            ("b.dat".into(), "timeout of 300000ms exceeded".into()),
        ]);
        assert_eq!(
            err.to_string(),
            "Upload of 2 files failed:\na.dat: Network Error\nb.dat: timeout of 300000ms exceeded"
        );
    }

    #[test]
    fn test_auth_error_displays_server_message() {
        let err = UploaderError::Auth("Invalid credentials".to_string());
        assert_eq!(err.to_string(), "Invalid credentials");
    }
}
