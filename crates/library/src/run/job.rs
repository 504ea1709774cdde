use exn::ResultExt;
use reel_extract::models::{CollectionChain, MetadataRecord};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::Context;
use crate::error::{ErrorKind, Result};
use crate::lifecycle::commit;
use crate::run::{CandidateReport, Delivery, FileOutcome, FileReport, Preview};
use crate::scan::{CandidateKind, UploadCandidate, expand_batch};
use crate::transfer::Transfer;

/// Works through one candidate from start to finish.
///
/// Files of a batch go one after the other. The batch folder is only marked
/// as uploaded once every file in it has been uploaded and marked itself.
pub(crate) async fn process(
    ctx: &Context,
    transfer: &Transfer,
    halt: &CancellationToken,
    candidate: UploadCandidate,
) -> CandidateReport {
    let files = match candidate.kind {
        CandidateKind::SingleFile => vec![candidate.source.clone()],
        CandidateKind::FolderBatch => match expand_batch(&ctx.store, &candidate.source).await {
            Ok(files) => files,
            Err(e) => {
                return CandidateReport {
                    candidate,
                    files: Vec::new(),
                    folder: Some(Err(e)),
                };
            },
        },
    };

    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        let outcome = if halt.is_cancelled() {
            FileOutcome::Skipped
        } else {
            process_file(ctx, transfer, &path).await
        };
        // Stop this batch and every other worker before the next file.
        if let Some(kind) = outcome.halt() {
            tracing::error!(path = %path.display(), error = %kind, "Halting run");
            halt.cancel();
        }
        reports.push(FileReport { path, outcome });
    }

    let folder = match candidate.kind {
        CandidateKind::FolderBatch if !ctx.preview && !reports.is_empty() && reports.iter().all(committed) => {
            Some(commit(&ctx.store, &candidate.source).await)
        },
        _ => None,
    };
    CandidateReport {
        candidate,
        files: reports,
        folder,
    }
}

fn committed(report: &FileReport) -> bool {
    matches!(&report.outcome, FileOutcome::Uploaded(delivery) if delivery.renamed.is_ok())
}

/// Metadata and collection chain of `path`. Extraction reads file metadata
/// from disk, so it runs on the blocking pool.
async fn extract(ctx: &Context, path: &Path) -> Result<(MetadataRecord, CollectionChain)> {
    let extractor = ctx.extractor.clone();
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> reel_extract::error::Result<_> {
        Ok((extractor.metadata(&path)?, extractor.chain(&path)?))
    })
    .await
    .or_raise(|| ErrorKind::Extraction)?
    .or_raise(|| ErrorKind::Extraction)
}

#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
async fn process_file(ctx: &Context, transfer: &Transfer, path: &Path) -> FileOutcome {
    let (record, chain) = match extract(ctx, path).await {
        Ok(extracted) => extracted,
        Err(e) => return FileOutcome::Failed(e),
    };
    let collections = match ctx.resolver.resolve(&chain).await {
        Ok(collections) => collections,
        Err(e) => return FileOutcome::Failed(e),
    };

    if ctx.preview {
        return FileOutcome::Previewed(Box::new(Preview { record, collections }));
    }

    let uploaded = match transfer.upload(&ctx.store, &record, &collections).await {
        Ok(uploaded) => uploaded,
        Err(e) => return FileOutcome::Failed(e),
    };
    let renamed: Result<PathBuf> = commit(&ctx.store, path).await;
    if let Err(e) = &renamed {
        tracing::error!(video = %uploaded.video, error = %**e, "Uploaded, but unable to mark the source as uploaded");
    }
    FileOutcome::Uploaded(Box::new(Delivery {
        record,
        collections,
        uploaded,
        renamed,
    }))
}
