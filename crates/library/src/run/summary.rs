use reel_extract::models::StatusTag;
use std::collections::BTreeMap;

use crate::collections::{Origin, Resolution};
use crate::error::ErrorKind;
use crate::run::{CandidateReport, FileOutcome};
use crate::scan::UploadCandidate;

/// Rough service quota cost, in the units the YouTube Data API bills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaEstimate {
    pub uploads: u64,
    pub lookups: u64,
    pub creates: u64,
    pub attachments: u64,
}
impl QuotaEstimate {
    pub const UPLOAD: u64 = 1600;
    pub const CREATE: u64 = 50;
    pub const ATTACH: u64 = 50;
    pub const LIST: u64 = 1;

    /// Adds one upload into the collections of `resolution`. Lookups are
    /// counted by the resolver, not per upload.
    pub fn add(&mut self, resolution: &Resolution) {
        self.uploads += 1;
        self.creates += resolution
            .resolved
            .iter()
            .filter(|c| c.origin == Origin::Created)
            .count() as u64;
        self.attachments += resolution.resolved.len() as u64;
    }

    pub fn units(&self) -> u64 {
        self.uploads * Self::UPLOAD
            + self.lookups * Self::LIST
            + self.creates * Self::CREATE
            + self.attachments * Self::ATTACH
    }
}

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates dispatched, batches counted once.
    pub discovered: usize,
    pub per_status: BTreeMap<StatusTag, usize>,
    /// Files, not candidates, from here on.
    pub uploaded: usize,
    pub previewed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Uploaded, but the source could not be marked as done.
    pub rename_failed: usize,
    /// Uploaded, but not attached to every collection.
    pub partial_attachments: usize,
    /// Batch folders marked as done.
    pub folders_committed: usize,
    pub discovery_errors: usize,
    pub halted: Option<ErrorKind>,
    pub cancelled: bool,
    pub quota: QuotaEstimate,
}
impl RunSummary {
    pub(crate) fn discovered(&mut self, candidate: &UploadCandidate) {
        self.discovered += 1;
        *self.per_status.entry(candidate.status).or_default() += 1;
    }

    pub(crate) fn record(&mut self, report: &CandidateReport) {
        for file in &report.files {
            match &file.outcome {
                FileOutcome::Uploaded(delivery) => {
                    self.uploaded += 1;
                    if delivery.renamed.is_err() {
                        self.rename_failed += 1;
                    }
                    if !delivery.uploaded.attachments.is_complete() || !delivery.collections.is_complete() {
                        self.partial_attachments += 1;
                    }
                },
                FileOutcome::Previewed(preview) => {
                    self.previewed += 1;
                    self.quota.add(&preview.collections);
                },
                FileOutcome::Failed(_) => self.failed += 1,
                FileOutcome::Skipped => self.skipped += 1,
            }
        }
        match &report.folder {
            Some(Ok(_)) => self.folders_committed += 1,
            Some(Err(e)) if **e == ErrorKind::Rename => self.rename_failed += 1,
            Some(Err(_)) => self.failed += 1,
            None => {},
        }
    }

    /// Whether the run did everything it set out to do. Missing collection
    /// attachments do not count against it.
    pub fn is_success(&self) -> bool {
        self.failed == 0
            && self.rename_failed == 0
            && self.discovery_errors == 0
            && self.halted.is_none()
            && !self.cancelled
    }
}
