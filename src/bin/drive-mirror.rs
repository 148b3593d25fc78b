//! `drive-mirror <job-id> <name>`
//!
//! Mirrors `$DOWNLOAD_DIR/<job-id>/<name>` into Google Drive, prints the
//! shareable link and removes the job directory.

use std::sync::Arc;

use anyhow::{bail, Context};
use drive_mirror::mirror::UploadListener;
use drive_mirror::runtime::{config::MirrorConfig, logging::init_logging};
use drive_mirror::service::{bootstrap_desktop, ConsoleConsentHandler};

struct ConsoleListener;

impl UploadListener for ConsoleListener {
    fn on_upload_started(&self, name: &str) {
        eprintln!("Uploading {}...", name);
    }

    fn on_upload_complete(&self, link: &str, name: &str) {
        eprintln!("Uploaded {}", name);
        println!("{}", link);
    }

    fn on_upload_error(&self, message: &str) {
        eprintln!("Upload failed: {}", message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(job_id), Some(name)) = (args.next(), args.next()) else {
        bail!("usage: drive-mirror <job-id> <name>");
    };

    let config = MirrorConfig::from_env().context("invalid configuration")?;
    init_logging(config.logging.clone()).context("failed to initialize logging")?;

    let service = bootstrap_desktop(config, Arc::new(ConsoleConsentHandler::new()))?;
    let request = service.request(job_id, name)?;
    service
        .upload(&request, &ConsoleListener)
        .await
        .with_context(|| format!("job {} failed", request.job_id))?;

    Ok(())
}
