use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reel_extract::models::MetadataRecord;
use reel_library::ProgressObserver;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const TEMPLATE: &str = "{spinner:.cyan} {msg:40!} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// One progress bar per upload in flight, redrawn in place.
pub struct UploadBars {
    bars: MultiProgress,
    style: ProgressStyle,
    active: Mutex<HashMap<PathBuf, ProgressBar>>,
}
impl UploadBars {
    pub fn new(bars: MultiProgress) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .map(|style| style.progress_chars("━╸─"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        Self {
            bars,
            style,
            active: Mutex::new(HashMap::new()),
        }
    }
}
impl ProgressObserver for UploadBars {
    fn started(&self, record: &MetadataRecord, total: u64) {
        let bar = self.bars.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_message(record.title.clone());
        self.active.lock().unwrap_or_else(PoisonError::into_inner).insert(record.path.clone(), bar);
    }

    fn progress(&self, path: &Path, sent: u64, _total: u64) {
        if let Some(bar) = self.active.lock().unwrap_or_else(PoisonError::into_inner).get(path) {
            bar.set_position(sent);
        }
    }

    fn finished(&self, path: &Path) {
        if let Some(bar) = self.active.lock().unwrap_or_else(PoisonError::into_inner).remove(path) {
            bar.finish_and_clear();
            self.bars.remove(&bar);
        }
    }
}
