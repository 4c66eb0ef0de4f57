use super::types::UploadJob;
use crate::auth::{check_login_response, AuthSession, LoginRequest, Project};
use crate::config::Config;
use crate::error::{Result, UploaderError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Response};
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// The three server calls the uploader makes.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn login(&self, session: &AuthSession) -> Result<()>;

    async fn fetch_projects(&self, session: &AuthSession) -> Result<Vec<Project>>;

    /// One request per file. The open `file` is streamed, never read whole.
    async fn upload(&self, session: &AuthSession, job: &UploadJob, file: File) -> Result<()>;
}

/// Talks to the streamer UI server over HTTP with basic auth. Cookies set by
/// the server are kept for later requests.
pub struct HttpTransport {
    client: reqwest::Client,
    config: Config,
}

impl HttpTransport {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { client, config })
    }

    /// Turns a non-success status into an error carrying the response body.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(UploaderError::from_response(status.as_u16(), &body))
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn login(&self, session: &AuthSession) -> Result<()> {
        let url = self.config.endpoint("/login");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(session.username(), Some(session.password()))
            .json(&LoginRequest::from(session))
            .timeout(self.config.login_timeout)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body = response.text().await?;
        check_login_response(&body)
    }

    async fn fetch_projects(&self, session: &AuthSession) -> Result<Vec<Project>> {
        let url = self.config.endpoint("/projects");
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(session.username(), Some(session.password()))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<Vec<Project>>().await?)
    }

    async fn upload(&self, session: &AuthSession, job: &UploadJob, file: File) -> Result<()> {
        let url = self.config.endpoint("/upload");
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));

        let mut form = Form::new();
        for (name, value) in job.form_fields() {
            form = form.text(name, value);
        }
        form = form.part(
            "files",
            Part::stream_with_length(body, length).file_name(job.file.name.clone()),
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(session.username(), Some(session.password()))
            .multipart(form)
            .timeout(self.config.upload_timeout)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        debug!("Upload of '{}' answered {}", job.file.name, response.status());
        Ok(())
    }
}

/// Stand-in server: accepts any login, lists a fixed set of projects and
/// acknowledges every upload after a short delay.
pub struct DryRunTransport {
    delay: Duration,
    projects: Vec<Project>,
}

impl Default for DryRunTransport {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(10),
            projects: ["3010000.01", "3010000.02", "3055000.01"]
                .into_iter()
                .map(|number| Project {
                    number: number.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl UploadTransport for DryRunTransport {
    async fn login(&self, session: &AuthSession) -> Result<()> {
        info!("Dry run: accepting login for {}", session.username());
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn fetch_projects(&self, _session: &AuthSession) -> Result<Vec<Project>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.projects.clone())
    }

    async fn upload(&self, _session: &AuthSession, job: &UploadJob, file: File) -> Result<()> {
        debug!(
            "Dry run: pretending to upload '{}' ({} bytes) to {:?}",
            job.file.name,
            file.metadata().await?.len(),
            job.destination
        );
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileEntry;
    use crate::selection::Destination;
    use std::path::Path;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers exactly one request with `status` and `body` and hands back
    /// the raw request as received.
    async fn serve_once(status: &'static str, body: &'static str) -> (Config, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config {
            server_url: format!("http://{}", listener.local_addr().unwrap()),
            ..Config::default()
        };

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap_or_default();
            String::from_utf8_lossy(&request).into_owned()
        });
        (config, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
        let body_len = request.len() - header_end - 4;
        match headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
        {
            Some(length) => body_len >= length.trim().parse::<usize>().unwrap_or(0),
            None if headers.contains("transfer-encoding: chunked") => {
                request.ends_with(b"0\r\n\r\n")
            }
            None => true,
        }
    }

    fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
        request
            .split("\r\n\r\n")
            .next()?
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim())
    }

    fn job_for(path: &Path) -> UploadJob {
        UploadJob {
            destination: Destination {
                project_number: "3010000.01".into(),
                subject_label: "sub01".into(),
                session_label: "ses01".into(),
                data_type: "beh".into(),
            },
            file: FileEntry::from_path(path).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_dry_run_accepts_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"abc").unwrap();

        let transport = DryRunTransport::default();
        let session = AuthSession::new("user", "pw");

        transport.login(&session).await.unwrap();
        let projects = transport.fetch_projects(&session).await.unwrap();
        assert_eq!(projects.len(), 3);

        let file = File::open(&path).await.unwrap();
        transport
            .upload(&session, &job_for(&path), file)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let config = Config {
            // Port 9 (discard) on localhost is practically never listening.
            server_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let transport = HttpTransport::new(config).unwrap();
        let err = transport
            .login(&AuthSession::new("user", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploaderError::Transport(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_login_posts_credentials_with_basic_auth() {
        let (config, server) = serve_once("200 OK", r#"{"data":"Login successful"}"#).await;
        let transport = HttpTransport::new(config).unwrap();

        transport
            .login(&AuthSession::new("user", "pw"))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /login HTTP/1.1"), "{}", request);
        assert_eq!(header(&request, "authorization"), Some("Basic dXNlcjpwdw=="));
        assert_eq!(header(&request, "content-type"), Some("application/json"));
        assert!(request.ends_with(r#"{"username":"user","password":"pw"}"#));
    }

    #[tokio::test]
    async fn test_login_error_field_is_refusal() {
        let (config, server) =
            serve_once("200 OK", r#"{"error":"Invalid username or password"}"#).await;
        let transport = HttpTransport::new(config).unwrap();

        let err = transport
            .login(&AuthSession::new("user", "wrong"))
            .await
            .unwrap_err();
        server.await.unwrap();
        assert_eq!(err, UploaderError::Auth("Invalid username or password".into()));
    }

    #[tokio::test]
    async fn test_login_without_response_data_is_refused() {
        for body in ["", "<html>proxy login page</html>"] {
            let (config, server) = serve_once("200 OK", body).await;
            let transport = HttpTransport::new(config).unwrap();

            let result = transport.login(&AuthSession::new("user", "pw")).await;
            server.await.unwrap();
            assert!(
                matches!(&result, Err(UploaderError::Auth(_))),
                "{:?} -> {:?}",
                body,
                result
            );
        }
    }

    #[tokio::test]
    async fn test_login_rejected_status_shows_body() {
        let (config, server) = serve_once("401 Unauthorized", "Unauthorized").await;
        let transport = HttpTransport::new(config).unwrap();

        let err = transport
            .login(&AuthSession::new("user", "pw"))
            .await
            .unwrap_err();
        server.await.unwrap();
        assert_eq!(
            err,
            UploaderError::Http {
                status: 401,
                body: "Unauthorized".into()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_projects_parses_list() {
        let (config, server) =
            serve_once("200 OK", r#"[{"number":"3010000.01"},{"number":"3055000.01"}]"#).await;
        let transport = HttpTransport::new(config).unwrap();

        let projects = transport
            .fetch_projects(&AuthSession::new("user", "pw"))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /projects HTTP/1.1"), "{}", request);
        assert_eq!(header(&request, "authorization"), Some("Basic dXNlcjpwdw=="));
        let numbers: Vec<_> = projects.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["3010000.01", "3055000.01"]);
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"abc").unwrap();
        let job = job_for(&path);

        let (config, server) = serve_once("200 OK", "").await;
        let transport = HttpTransport::new(config).unwrap();
        let file = File::open(&path).await.unwrap();
        transport
            .upload(&AuthSession::new("u", "p"), &job, file)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /upload HTTP/1.1"), "{}", request);
        assert_eq!(header(&request, "authorization"), Some("Basic dTpw"));
        assert!(header(&request, "content-type")
            .is_some_and(|value| value.starts_with("multipart/form-data; boundary=")));

        // Text fields in wire order, then the file part.
        let mut cursor = 0;
        for (name, value) in job.form_fields() {
            let field = format!("name=\"{}\"\r\n\r\n{}\r\n", name, value);
            let at = request[cursor..]
                .find(&field)
                .unwrap_or_else(|| panic!("missing {} in {}", name, request));
            cursor += at + field.len();
        }
        let files_part = request[cursor..]
            .find("name=\"files\"; filename=\"a.txt\"")
            .expect("files part after the text fields");
        assert!(request[cursor + files_part..].contains("\r\n\r\nabc\r\n"));
    }

    #[tokio::test]
    async fn test_upload_failure_status_carries_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"abc").unwrap();

        let (config, server) =
            serve_once("500 Internal Server Error", r#"{"error":"disk full"}"#).await;
        let transport = HttpTransport::new(config).unwrap();
        let file = File::open(&path).await.unwrap();
        let err = transport
            .upload(&AuthSession::new("u", "p"), &job_for(&path), file)
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            UploaderError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "{\n  \"error\": \"disk full\"\n}");
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }
}
