mod cli;
mod logging;
mod progress;
mod prompt;
mod report;

use clap::Parser;
use exn::ResultExt;
use futures::StreamExt;
use indicatif::MultiProgress;
use reel_config::Config;
use reel_library::error::{ErrorKind, Result};
use reel_library::{Context, ExponentialBackoff, RetryPolicy, RunEvent, UploadSettings, run, scan};
use reel_remote::{CredentialProvider, ServiceHandle, StaticCredential, YouTubeService};
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::progress::UploadBars;
use crate::report::Reporter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let bars = MultiProgress::new();

    let config = Config::from_figment(cli.figment());
    let debug = cli.debug || config.as_ref().is_ok_and(|config| config.debug);
    logging::init(debug, bars.clone());
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:?}");
            return ExitCode::from(2);
        },
    };

    // Preview changes nothing, so there is nothing to confirm.
    let ask = !cli.preview && !cli.yes && prompt::interactive();
    match upload(&config, cli.preview, ask, bars).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::from(2)
        },
    }
}

/// Runs the whole pipeline once. `Ok(false)` means the run finished but not
/// everything went through.
async fn upload(config: &Config, preview: bool, ask: bool, bars: MultiProgress) -> Result<bool> {
    let root = config.recordings_path().or_raise(|| ErrorKind::Config)?;

    let credentials = Arc::new(StaticCredential::new(config.service.access_token.clone()));
    // Fail before scanning rather than on the first request.
    credentials.credential().await.or_raise(|| ErrorKind::Auth)?;
    let service: ServiceHandle = Arc::new(
        YouTubeService::new(credentials)
            .or_raise(|| ErrorKind::Config)?
            .with_language(config.service.language.clone()),
    );

    let cancel = CancellationToken::new();
    let upload = &config.upload;
    let mut ctx = Context::new(root, service)?
        .with_settings(UploadSettings {
            chunk_size: upload.chunk_size,
            visibility: config.visibility,
            category_id: config.service.category_id.clone(),
            language: config.service.language.clone(),
        })
        .with_policy(RetryPolicy::new(
            upload.max_attempts,
            upload.chunk_timeout(),
            ExponentialBackoff {
                base: upload.backoff_base(),
                max: upload.backoff_max(),
            },
        ))
        .with_main_folders(config.main_folders.clone())
        .with_workers(upload.workers)
        .with_progress(Arc::new(UploadBars::new(bars.clone())))
        .with_cancel(cancel.clone());
    if let Some(label) = &config.root_label {
        ctx = ctx.with_label(label.clone());
    }
    if preview {
        ctx = ctx.preview();
    }

    if ask && !confirm(&ctx, config, &bars).await {
        println!("Nothing was uploaded");
        return Ok(true);
    }
    // Installed after the prompt so that Ctrl-C still quits while it waits.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current chunk");
            cancel.cancel();
        }
    });

    let reporter = Reporter::new(bars);
    let mut success = false;
    let mut events = pin!(run(&ctx));
    while let Some(event) = events.next().await {
        match event {
            Ok(RunEvent::Started) => tracing::info!(root = %root.display(), preview, "Scanning for recordings"),
            Ok(RunEvent::Discovered(candidate)) => {
                tracing::debug!(source = %candidate.source.display(), status = %candidate.status, "Found")
            },
            Ok(RunEvent::Processed(report)) => reporter.candidate(&report),
            Ok(RunEvent::Halted(kind)) => reporter.halted(kind),
            Ok(RunEvent::Complete(summary)) => {
                reporter.summary(&summary, preview);
                success = summary.is_success();
            },
            Err(e) => tracing::warn!("{e:?}"),
        }
    }
    Ok(success)
}

/// Counts what a run would pick up and asks before uploading any of it.
async fn confirm(ctx: &Context, config: &Config, bars: &MultiProgress) -> bool {
    let found = scan(&ctx.store, &ctx.main_folders)
        .filter_map(|candidate| async move { candidate.ok() })
        .count()
        .await;
    if found == 0 {
        return true;
    }
    let question = format!(
        "Upload {found} recordings as {} and rename them to uploaded_...?",
        config.visibility
    );
    bars.suspend(|| prompt::confirm(&question)).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Unable to read an answer, not uploading");
        false
    })
}
