use indicatif::MultiProgress;
use reel_library::error::ErrorKind;
use reel_library::{CandidateReport, FileOutcome, Origin, Resolution, RunSummary};

/// Prints results to stdout, above the progress bars.
pub struct Reporter {
    bars: MultiProgress,
}
impl Reporter {
    pub fn new(bars: MultiProgress) -> Self {
        Self { bars }
    }

    fn print(&self, lines: &[String]) {
        self.bars.suspend(|| {
            for line in lines {
                println!("{line}");
            }
        });
    }

    pub fn candidate(&self, report: &CandidateReport) {
        self.print(&candidate_lines(report));
    }

    pub fn halted(&self, kind: ErrorKind) {
        self.print(&[format!("!! {kind}, no further recordings will be uploaded")]);
    }

    pub fn summary(&self, summary: &RunSummary, preview: bool) {
        self.print(&summary_lines(summary, preview));
    }
}

fn collections_line(collections: &Resolution) -> String {
    let mut names: Vec<String> = collections
        .resolved
        .iter()
        .map(|c| match c.origin {
            Origin::Created => format!("{} (new)", c.name),
            Origin::Found | Origin::Cached => c.name.clone(),
        })
        .collect();
    names.extend(collections.dropped.iter().map(|name| format!("{name} (unresolved)")));
    names.join(" > ")
}

fn candidate_lines(report: &CandidateReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.candidate.is_batch() {
        lines.push(format!(
            "[{}] folder {} ({} files)",
            report.candidate.status,
            report.candidate.source.display(),
            report.files.len()
        ));
    }
    for file in &report.files {
        let path = file.path.display();
        match &file.outcome {
            FileOutcome::Uploaded(delivery) => {
                lines.push(format!("OK   {path} -> {}", delivery.uploaded.video));
                let attachments = &delivery.uploaded.attachments;
                if !attachments.is_complete() || !delivery.collections.is_complete() {
                    let wanted = delivery.collections.resolved.len() + delivery.collections.dropped.len();
                    lines.push(format!("     added to {} of {wanted} playlists", attachments.attached.len()));
                }
                if let Err(e) = &delivery.renamed {
                    lines.push(format!("     {e}: rename it by hand to avoid uploading it twice"));
                }
            },
            FileOutcome::Previewed(preview) => {
                let record = &preview.record;
                lines.push(format!("NEW  {path}"));
                lines.push(format!("     title:     {}", record.title));
                lines.push(format!("     game:      {} / {}", record.game, record.category));
                lines.push(format!("     status:    {}", record.status.describe()));
                lines.push(format!("     recorded:  {}", record.captured_at_display()));
                lines.push(format!("     playlists: {}", collections_line(&preview.collections)));
            },
            FileOutcome::Failed(e) => lines.push(format!("FAIL {path}: {e}")),
            FileOutcome::Skipped => lines.push(format!("SKIP {path}")),
        }
    }
    match &report.folder {
        Some(Ok(renamed)) => lines.push(format!("OK   folder -> {}", renamed.display())),
        Some(Err(e)) => lines.push(format!("FAIL folder {}: {e}", report.candidate.source.display())),
        None => {},
    }
    lines
}

fn summary_lines(summary: &RunSummary, preview: bool) -> Vec<String> {
    let per_status: Vec<String> = summary
        .per_status
        .iter()
        .map(|(status, count)| format!("{status}: {count}"))
        .collect();
    let mut lines = vec![String::new(), format!("Found {} recordings", summary.discovered)];
    if !per_status.is_empty() {
        lines[1].push_str(&format!(" ({})", per_status.join(", ")));
    }
    if preview {
        let quota = &summary.quota;
        lines.push(format!("Would upload {} files", summary.previewed));
        lines.push(format!(
            "Estimated quota: {} units ({} uploads, {} playlist lookups, {} new playlists, {} playlist additions)",
            quota.units(),
            quota.uploads,
            quota.lookups,
            quota.creates,
            quota.attachments
        ));
    } else {
        lines.push(format!(
            "Uploaded {}, failed {}, skipped {}",
            summary.uploaded, summary.failed, summary.skipped
        ));
    }
    if summary.partial_attachments > 0 {
        lines.push(format!("{} uploads are missing from some playlists", summary.partial_attachments));
    }
    if summary.rename_failed > 0 {
        lines.push(format!("{} uploads could not be renamed", summary.rename_failed));
    }
    if summary.discovery_errors > 0 {
        lines.push(format!("{} folders could not be read", summary.discovery_errors));
    }
    if let Some(kind) = summary.halted {
        lines.push(format!("Stopped early: {kind}"));
    }
    if summary.cancelled {
        lines.push("Cancelled".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_extract::models::StatusTag;

    #[test]
    fn test_summary_lines() {
        let mut summary = RunSummary::default();
        summary.discovered = 3;
        summary.per_status.insert(StatusTag::Merged, 2);
        summary.per_status.insert(StatusTag::OnlyMic, 1);
        summary.uploaded = 2;
        summary.failed = 1;
        summary.halted = Some(ErrorKind::QuotaExceeded);

        let lines = summary_lines(&summary, false);
        assert_eq!(lines[1], "Found 3 recordings (merged: 2, onlymic: 1)");
        assert_eq!(lines[2], "Uploaded 2, failed 1, skipped 0");
        assert_eq!(lines.last().unwrap(), "Stopped early: upload quota exceeded");
    }

    #[test]
    fn test_preview_summary_shows_quota() {
        let mut summary = RunSummary::default();
        summary.previewed = 2;
        summary.quota.uploads = 2;
        let lines = summary_lines(&summary, true);
        assert!(lines.iter().any(|l| l.starts_with("Estimated quota: 3200 units")));
    }
}
