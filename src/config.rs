//! Command-line arguments and runtime configuration.

use crate::files::MAX_FILE_SIZE_BYTES;
use clap::Parser;
use std::time::Duration;

/// 5 minutes per uploaded file.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_millis(300_000);
pub const LOGIN_TIMEOUT: Duration = Duration::from_millis(1_000);

#[derive(Parser, Debug)]
#[command(name = "streamer-uploader")]
#[command(about = "Upload research data files to project storage")]
#[command(version)]
pub struct Args {
    /// Base URL of the data streamer UI server
    #[arg(
        long,
        default_value = "http://localhost:9000",
        env = "STREAMER_UPLOADER_SERVER_URL"
    )]
    pub server_url: String,

    /// Simulate login, project listing and uploads without a server
    #[arg(long, env = "STREAMER_UPLOADER_DRY_RUN")]
    pub dry_run: bool,

    /// Page opened from the footer link
    #[arg(
        long,
        default_value = "https://github.com/Donders-Institute/data-streamer",
        env = "STREAMER_UPLOADER_HELP_URL"
    )]
    pub help_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: String,
    pub dry_run: bool,
    pub help_url: String,
    pub max_file_size: u64,
    pub upload_timeout: Duration,
    pub login_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9000".to_string(),
            dry_run: false,
            help_url: "https://github.com/Donders-Institute/data-streamer".to_string(),
            max_file_size: MAX_FILE_SIZE_BYTES,
            upload_timeout: UPLOAD_TIMEOUT,
            login_timeout: LOGIN_TIMEOUT,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            server_url: args.server_url.trim_end_matches('/').to_string(),
            dry_run: args.dry_run,
            help_url: args.help_url,
            ..Self::default()
        }
    }
}

impl Config {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path.trim_start_matches('/'))
    }
}
