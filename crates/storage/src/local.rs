//! Access to the recordings folder on the local filesystem.
//!
//! Everything goes through `tokio::fs` so the scanner and uploads can share a
//! runtime with the network side.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;
use tokio::fs;

use crate::error::{ErrorKind, Result};
use crate::models::{Entry, EntryKind, FileInfo};
use crate::path::contain;
use crate::source::SourceFile;

/// The recordings root. Every path handed to it, absolute or relative, must
/// resolve to somewhere inside the root.
///
/// # Examples
///
/// ```no_run
/// use reel_storage::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("/srv/recordings")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}
impl LocalStore {
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, does not exist, or is
    /// not a directory. The recordings root is never created.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Non-async on purpose, this happens once at startup.
        let metadata = std::fs::metadata(&root).map_err(|e| Self::map_io_error(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            std::io::ErrorKind::NotADirectory => ErrorKind::NotADirectory(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    fn info(path: PathBuf, metadata: &Metadata) -> Result<FileInfo> {
        let modified: SystemTime = metadata.modified().map_err(ErrorKind::Io)?;
        let kind = if metadata.is_dir() { EntryKind::Dir } else { EntryKind::File };
        Ok(FileInfo {
            path,
            kind,
            size: metadata.len(),
            modified: OffsetDateTime::from(modified),
        })
    }

    /// Children of a folder, sorted by raw file name so every walk visits
    /// entries in the same order.
    ///
    /// Symlinks are followed. Anything that is neither a file nor a folder,
    /// or a link that points nowhere, is left out.
    pub async fn list_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<Entry>> {
        let dir = contain(&self.root, dir)?;
        let mut reader = fs::read_dir(&dir).await.map_err(|e| Self::map_io_error(e, &dir))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| Self::map_io_error(e, &dir))? {
            let path = entry.path();
            let kind = match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_dir() => EntryKind::Dir,
                Ok(metadata) if metadata.is_file() => EntryKind::File,
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Skipping dangling symlink");
                    continue;
                },
                Err(e) => exn::bail!(Self::map_io_error(e, &path)),
            };
            entries.push(Entry {
                path,
                name: entry.file_name(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub async fn stat(&self, path: impl AsRef<Path>) -> Result<FileInfo> {
        let path = contain(&self.root, path)?;
        let metadata = fs::metadata(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        Self::info(path, &metadata)
    }

    /// Opens a file for ranged reads.
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<SourceFile> {
        let path = contain(&self.root, path)?;
        let file = fs::File::open(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
        let metadata = file.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        if metadata.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(path));
        }
        Ok(SourceFile::new(path, file, metadata.len()))
    }

    /// Renames a file or folder, refusing to replace anything already at the
    /// destination. Contents and timestamps are left as they were.
    pub async fn rename_exclusive(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
        let from = contain(&self.root, from)?;
        let to = contain(&self.root, to)?;
        if fs::try_exists(&to).await.map_err(|e| Self::map_io_error(e, &to))? {
            exn::bail!(ErrorKind::AlreadyExists(to));
        }
        Ok(fs::rename(&from, &to).await.map_err(|e| Self::map_io_error(e, &from))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as sync_fs;

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn write(root: &Path, relative: &str, data: &[u8]) -> PathBuf {
        let path = root.join(relative);
        sync_fs::create_dir_all(path.parent().unwrap()).unwrap();
        sync_fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_new_requires_existing_absolute_dir() {
        let (dir, _) = store();
        assert!(LocalStore::new("relative/path").is_err());
        let missing = LocalStore::new(dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*missing, ErrorKind::NotFound(_)));
        let file = write(dir.path(), "file.mp4", b"x");
        let not_dir = LocalStore::new(file).unwrap_err();
        assert!(matches!(&*not_dir, ErrorKind::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_list_dir_is_sorted() {
        let (dir, store) = store();
        write(dir.path(), "b.mp4", b"x");
        write(dir.path(), "a.mp4", b"x");
        write(dir.path(), "C/inner.mp4", b"x");
        let entries = store.list_dir(dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["C", "a.mp4", "b.mp4"]);
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].kind, EntryKind::File);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_dir_skips_dangling_symlinks() {
        let (dir, store) = store();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("link.mp4")).unwrap();
        assert!(store.list_dir("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_dir_missing() {
        let (_dir, store) = store();
        let err = store.list_dir("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let (dir, store) = store();
        let path = write(dir.path(), "GAME/merged_a.mp4", b"0123456789");
        let info = store.stat(&path).await.unwrap();
        assert_eq!(info.path, path);
        assert_eq!(info.size, 10);
        assert!(!info.is_dir());
        assert!(store.stat(dir.path().join("GAME")).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_paths_outside_root_are_rejected() {
        let (_dir, store) = store();
        let err = store.stat("../escape.mp4").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_rename_exclusive() {
        let (dir, store) = store();
        let from = write(dir.path(), "merged_a.mp4", b"data");
        let modified = sync_fs::metadata(&from).unwrap().modified().unwrap();
        store.rename_exclusive(&from, "uploaded_a.mp4").await.unwrap();
        let to = dir.path().join("uploaded_a.mp4");
        assert!(!from.exists());
        assert_eq!(sync_fs::read(&to).unwrap(), b"data");
        assert_eq!(sync_fs::metadata(&to).unwrap().modified().unwrap(), modified);
    }

    #[tokio::test]
    async fn test_rename_exclusive_refuses_to_overwrite() {
        let (dir, store) = store();
        let from = write(dir.path(), "merged_a.mp4", b"new");
        let taken = write(dir.path(), "uploaded_a.mp4", b"old");
        let err = store.rename_exclusive(&from, &taken).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(sync_fs::read(&taken).unwrap(), b"old");
        assert!(from.exists());
    }
}
