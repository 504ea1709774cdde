pub mod collections;
pub mod error;
pub mod lifecycle;
pub mod run;
pub mod scan;
pub mod transfer;

use exn::ResultExt;
use reel_extract::Extractor;
use reel_remote::{ReadOnlyService, ServiceHandle};
use reel_storage::LocalStore;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use crate::collections::{CollectionResolver, Origin, ResolvedCollection, Resolution};
use crate::error::{ErrorKind, Result};
pub use crate::run::{CandidateReport, Delivery, FileOutcome, FileReport, Preview, RunEvent, RunSummary, run};
pub use crate::scan::{CandidateKind, UploadCandidate, expand_batch, scan};
pub use crate::transfer::{
    AttachmentReport, Backoff, ExponentialBackoff, NoProgress, ProgressObserver, RetryPolicy, Transfer, UploadSettings,
    Uploaded,
};

/// Everything a run needs, shared by reference between all workers.
pub struct Context {
    pub store: LocalStore,
    pub extractor: Extractor,
    pub service: ServiceHandle,
    pub resolver: CollectionResolver,
    pub settings: UploadSettings,
    pub policy: RetryPolicy,
    /// Only these top-level folders are scanned; empty scans everything.
    pub main_folders: Vec<String>,
    /// Candidates processed at the same time.
    pub workers: usize,
    /// Nothing is uploaded, created or renamed.
    pub preview: bool,
    pub cancel: CancellationToken,
    pub progress: Arc<dyn ProgressObserver>,
}
impl Context {
    /// `root` must be an existing, absolute folder.
    pub fn new(root: &Path, service: ServiceHandle) -> Result<Self> {
        let store = LocalStore::new(root).or_raise(|| ErrorKind::Config)?;
        Ok(Self {
            extractor: Extractor::new(store.root()),
            store,
            resolver: CollectionResolver::new(service.clone()),
            service,
            settings: UploadSettings::default(),
            policy: RetryPolicy::default(),
            main_folders: Vec::new(),
            workers: 1,
            preview: false,
            cancel: CancellationToken::new(),
            progress: Arc::new(NoProgress),
        })
    }

    /// Label for game, category and collection when the folders run out.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.extractor = self.extractor.with_label(label);
        self
    }

    pub fn with_settings(mut self, settings: UploadSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_main_folders(mut self, main_folders: Vec<String>) -> Self {
        self.main_folders = main_folders;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Switches to preview mode: the service only answers reads, and the
    /// run reports what it would do instead of doing it.
    pub fn preview(mut self) -> Self {
        self.service = Arc::new(ReadOnlyService::new(self.service));
        self.resolver = CollectionResolver::new(self.service.clone());
        self.preview = true;
        self
    }
}
