use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::pin::pin;

use crate::Context;
use crate::error::Result as LibraryResult;
use crate::run::job::process;
use crate::run::{RunEvent, RunSummary};
use crate::scan::scan;
use crate::transfer::Transfer;

/// Streams [`RunEvent`]s while every candidate below the recordings root is
/// uploaded according to `ctx`.
///
/// Candidates are pulled from the scan lazily and processed by up to
/// `ctx.workers` workers at a time; each worker sees its candidate through
/// before taking the next one. An authentication or quota failure halts the
/// run: no new candidates are dispatched and uploads in flight stop at their
/// next chunk boundary. Cancelling `ctx.cancel` does the same.
pub fn run(ctx: &Context) -> impl Stream<Item = LibraryResult<RunEvent>> + '_ {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(RunEvent::Started);

        // Child token: halting the run must not cancel the caller's token.
        let halt = ctx.cancel.child_token();
        let transfer = Transfer::new(ctx.service.clone())
            .with_settings(ctx.settings.clone())
            .with_policy(ctx.policy.clone())
            .with_progress(ctx.progress.clone())
            .with_cancel(halt.clone());
        let mut summary = RunSummary::default();
        let mut candidates = pin!(scan(&ctx.store, &ctx.main_folders));
        let mut exhausted = false;
        let mut processing = FuturesUnordered::new();

        loop {
            while !exhausted && !halt.is_cancelled() && processing.len() < ctx.workers {
                match candidates.next().await {
                    Some(Ok(candidate)) => {
                        summary.discovered(&candidate);
                        yield Ok(RunEvent::Discovered(candidate.clone()));
                        processing.push(process(ctx, &transfer, &halt, candidate));
                    },
                    Some(Err(e)) => {
                        summary.discovery_errors += 1;
                        yield Err(e);
                    },
                    None => exhausted = true,
                }
            }

            let Some(report) = processing.next().await else {
                break;
            };
            match (report.halt(), summary.halted) {
                (Some(kind), None) => {
                    summary.halted = Some(kind);
                    halt.cancel();
                    yield Ok(RunEvent::Halted(kind));
                },
                _ => {},
            }
            summary.record(&report);
            yield Ok(RunEvent::Processed(report));
        }

        summary.quota.lookups = ctx.resolver.lookups();
        summary.cancelled = ctx.cancel.is_cancelled();
        if summary.cancelled {
            tracing::warn!("Run cancelled");
        }
        yield Ok(RunEvent::Complete(summary));
    })
}
