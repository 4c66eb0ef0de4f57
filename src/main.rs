use clap::Parser;
use std::sync::Arc;
use streamer_uploader::app::StreamerUploader;
use streamer_uploader::config::{Args, Config};
use streamer_uploader::upload::{DryRunTransport, HttpTransport, UploadTransport};
use tracing::{error, info};

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("streamer_uploader=info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn main() {
    configure_logging();
    let config = Config::from(Args::parse());

    let transport: Arc<dyn UploadTransport> = if config.dry_run {
        info!("Dry run: no requests are sent to {}", config.server_url);
        Arc::new(DryRunTransport::default())
    } else {
        match HttpTransport::new(config.clone()) {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                error!("Failed to create HTTP client: {}", e);
                std::process::exit(1);
            }
        }
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "Research Data Uploader",
        options,
        Box::new(move |cc| Box::new(StreamerUploader::new(cc, config, transport))),
    ) {
        error!("Application error: {}", e);
    }
}
