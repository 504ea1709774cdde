use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use reel_storage::{Entry, LocalStore};

use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::UploadCandidate;
use crate::scan::candidate::{Visit, visit};
use crate::scan::error::{ErrorKind as ScanErrorKind, Result as ScanResult};

/// Walks the recordings root depth-first and yields every upload candidate,
/// visiting siblings in lexicographic order of their raw names.
///
/// - A prefixed folder is yielded as a batch and not descended into.
/// - Anything carrying the uploaded prefix is skipped, at any depth.
/// - A file is yielded when it carries its own prefix and has a supported
///   extension.
/// - With a non-empty `main_folders`, only those top-level folders are walked.
///
/// The walk is lazy: folders are listed as the stream is polled. A folder
/// that cannot be listed is surfaced as an `Err` item and the walk carries
/// on with its siblings.
pub fn scan<'a>(
    store: &'a LocalStore,
    main_folders: &'a [String],
) -> impl Stream<Item = LibraryResult<UploadCandidate>> + 'a {
    stream! {
        for await candidate in scan_inner(store, main_folders) {
            yield candidate.or_raise(|| LibraryErrorKind::Discovery);
        }
    }
}

fn in_main_folders(entry: &Entry, main_folders: &[String]) -> bool {
    main_folders.is_empty() || (entry.is_dir() && main_folders.iter().any(|folder| entry.name == folder.as_str()))
}

fn scan_inner<'a>(
    store: &'a LocalStore,
    main_folders: &'a [String],
) -> impl Stream<Item = ScanResult<UploadCandidate>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let top = match store.list_dir(store.root()).await {
            Ok(entries) => entries,
            Err(e) => {
                yield Err(e.raise(ScanErrorKind::Root));
                return;
            },
        };
        // Pushed in reverse so the smallest name is popped first.
        let mut stack: Vec<Entry> = top.into_iter().filter(|e| in_main_folders(e, main_folders)).rev().collect();

        while let Some(entry) = stack.pop() {
            match visit(&entry) {
                Visit::Yield(candidate) => {
                    tracing::debug!(path = %candidate.source.display(), kind = ?candidate.kind, "Found upload candidate");
                    yield Ok(candidate);
                },
                Visit::Descend => match store.list_dir(&entry.path).await {
                    Ok(children) => stack.extend(children.into_iter().rev()),
                    Err(e) => {
                        tracing::warn!(path = %entry.path.display(), error = %*e, "Skipping unreadable folder");
                        yield Err(e.raise(ScanErrorKind::Unreadable(entry.path.clone())));
                    },
                },
                Visit::Skip => tracing::trace!(path = %entry.path.display(), "Skipping"),
            }
        }
    })
}
