use exn::ResultExt;
use reel_extract::tag::{Tag, is_supported, tag_of};
use reel_storage::LocalStore;
use std::path::{Path, PathBuf};

use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::ErrorKind as ScanErrorKind;

/// Every supported file below a batch folder, in walk order.
///
/// The files' own prefixes do not matter, the folder's status applies to all
/// of them. Already uploaded files and folders are left out. A sub-folder
/// that cannot be listed is logged and skipped; only an unreadable batch
/// folder is an error.
pub async fn expand_batch(store: &LocalStore, folder: &Path) -> LibraryResult<Vec<PathBuf>> {
    let top = store
        .list_dir(folder)
        .await
        .or_raise(|| ScanErrorKind::Unreadable(folder.to_path_buf()))
        .or_raise(|| LibraryErrorKind::Discovery)?;

    let mut files = Vec::new();
    let mut stack: Vec<_> = top.into_iter().rev().collect();
    while let Some(entry) = stack.pop() {
        if tag_of(&entry.name) == Some(Tag::Uploaded) {
            continue;
        }
        if !entry.is_dir() {
            if is_supported(&entry.path) {
                files.push(entry.path);
            }
            continue;
        }
        match store.list_dir(&entry.path).await {
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => tracing::warn!(path = %entry.path.display(), error = %*e, "Skipping unreadable folder in batch"),
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn test_expand_batch() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("WITZIGE MOMENTE/merged_LUSTIGE_MOMENTE");
        touch(&batch, "video2.mp4");
        touch(&batch, "video1.mp4");
        touch(&batch, "uploaded_video0.mp4");
        touch(&batch, "notes.txt");
        touch(&batch, "Teil 2/unmergable_video3.MOV");
        touch(&batch, "uploaded_alt/video4.mp4");

        let store = LocalStore::new(dir.path()).unwrap();
        let files = expand_batch(&store, &batch).await.unwrap();
        assert_eq!(files, vec![
            batch.join("Teil 2/unmergable_video3.MOV"),
            batch.join("video1.mp4"),
            batch.join("video2.mp4"),
        ]);
    }

    #[tokio::test]
    async fn test_missing_batch_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        let err = expand_batch(&store, &dir.path().join("merged_gone")).await.unwrap_err();
        assert_eq!(*err, LibraryErrorKind::Discovery);
    }
}
