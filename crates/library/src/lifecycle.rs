//! Marks delivered sources as uploaded.
//!
//! This is the only place a successful upload is recorded locally: the
//! source keeps its content and timestamps but its pending prefix is swapped
//! for `uploaded_`, so the next scan skips it.

use exn::ResultExt;
use reel_extract::{Tag, UPLOADED_PREFIX, classify};
use reel_storage::LocalStore;
use reel_storage::error::{ErrorKind as StorageErrorKind, Result as StorageResult};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};

/// Disambiguated names tried before giving up on a taken target.
const MAX_SUFFIXES: u32 = 100;

/// The processed name for `name`: a pending prefix is replaced, a name
/// without one gets the prefix added in front.
pub fn uploaded_name(name: &OsStr) -> OsString {
    let Some(name) = name.to_str() else {
        let mut uploaded = OsString::from(UPLOADED_PREFIX);
        uploaded.push(name);
        return uploaded;
    };
    let tagged = classify(name);
    match tagged.tag {
        Some(Tag::Uploaded) => name.into(),
        Some(Tag::Pending(_)) => format!("{UPLOADED_PREFIX}{}", tagged.remainder).into(),
        None => format!("{UPLOADED_PREFIX}{name}").into(),
    }
}

/// `name` with `-{suffix}` inserted before the extension (files) or at the
/// end (folders).
fn with_suffix(name: &OsStr, suffix: &str, is_dir: bool) -> OsString {
    let path = Path::new(name);
    let (stem, extension) = match (is_dir, path.file_stem(), path.extension()) {
        (false, Some(stem), Some(extension)) => (stem, Some(extension)),
        _ => (name, None),
    };
    let mut renamed = stem.to_os_string();
    renamed.push("-");
    renamed.push(suffix);
    if let Some(extension) = extension {
        renamed.push(".");
        renamed.push(extension);
    }
    renamed
}

/// Renames `path` to its uploaded name and returns the new path.
///
/// Must only be called once the upload is complete. An existing file is
/// never replaced: if the target is taken the current Unix time is appended
/// to the name, followed by a counter if that is taken too.
#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn commit(store: &LocalStore, path: &Path) -> LibraryResult<PathBuf> {
    commit_inner(store, path).await.or_raise(|| LibraryErrorKind::Rename)
}

async fn commit_inner(store: &LocalStore, path: &Path) -> StorageResult<PathBuf> {
    let info = store.stat(path).await?;
    let Some(name) = path.file_name() else {
        exn::bail!(StorageErrorKind::InvalidPath(path.to_path_buf()));
    };
    let target_name = uploaded_name(name);
    let target = path.with_file_name(&target_name);
    match store.rename_exclusive(path, &target).await {
        Ok(()) => {
            tracing::info!(from = %path.display(), to = %target.display(), "Marked as uploaded");
            return Ok(target);
        },
        Err(e) if matches!(&*e, StorageErrorKind::AlreadyExists(_)) => {
            tracing::warn!(taken = %target.display(), "Target name already taken");
        },
        Err(e) => return Err(e),
    }

    let timestamp = UtcDateTime::now().unix_timestamp();
    let mut last = None;
    for counter in 0..MAX_SUFFIXES {
        let suffix = match counter {
            0 => timestamp.to_string(),
            n => format!("{timestamp}-{n}"),
        };
        let target = path.with_file_name(with_suffix(&target_name, &suffix, info.is_dir()));
        match store.rename_exclusive(path, &target).await {
            Ok(()) => {
                tracing::info!(from = %path.display(), to = %target.display(), "Marked as uploaded");
                return Ok(target);
            },
            Err(e) if matches!(&*e, StorageErrorKind::AlreadyExists(_)) => last = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last.unwrap_or_else(|| exn::Exn::from(StorageErrorKind::AlreadyExists(target))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use std::time::{Duration, SystemTime};

    #[rstest]
    #[case("merged_video.mp4", "uploaded_video.mp4")]
    #[case("unmergable_video.mp4", "uploaded_video.mp4")]
    #[case("onlymic_video.aac", "uploaded_video.aac")]
    #[case("onlydesktop_video.wav", "uploaded_video.wav")]
    #[case("video.mp4", "uploaded_video.mp4")]
    #[case("merged_LUSTIGE_MOMENTE", "uploaded_LUSTIGE_MOMENTE")]
    #[case("uploaded_video.mp4", "uploaded_video.mp4")]
    fn test_uploaded_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(uploaded_name(OsStr::new(name)), OsStr::new(expected));
    }

    #[rstest]
    #[case("uploaded_video.mp4", false, "uploaded_video-17.mp4")]
    #[case("uploaded_video.tar.mp4", false, "uploaded_video.tar-17.mp4")]
    #[case("uploaded_MOMENTE", true, "uploaded_MOMENTE-17")]
    #[case("uploaded_v1.2", true, "uploaded_v1.2-17")]
    fn test_with_suffix(#[case] name: &str, #[case] is_dir: bool, #[case] expected: &str) {
        assert_eq!(with_suffix(OsStr::new(name), "17", is_dir), OsStr::new(expected));
    }

    fn setup(relative: &str, data: &[u8]) -> (tempfile::TempDir, LocalStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, data).unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        (dir, store, path)
    }

    #[tokio::test]
    async fn test_commit_preserves_content_and_mtime() {
        let (_dir, store, path) = setup("GAME/BUG/merged_video.mp4", b"content");
        let captured = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options().write(true).open(&path).unwrap().set_modified(captured).unwrap();

        let renamed = commit(&store, &path).await.unwrap();
        assert_eq!(renamed, path.with_file_name("uploaded_video.mp4"));
        assert!(!path.exists());
        assert_eq!(fs::read(&renamed).unwrap(), b"content");
        assert_eq!(fs::metadata(&renamed).unwrap().modified().unwrap(), captured);
    }

    #[tokio::test]
    async fn test_commit_never_overwrites() {
        let (_dir, store, path) = setup("GAME/BUG/merged_video.mp4", b"new");
        let taken = path.with_file_name("uploaded_video.mp4");
        fs::write(&taken, b"old").unwrap();

        let renamed = commit(&store, &path).await.unwrap();
        let name = renamed.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("uploaded_video-"), "{name}");
        assert!(name.ends_with(".mp4"), "{name}");
        assert_eq!(fs::read(&taken).unwrap(), b"old");
        assert_eq!(fs::read(&renamed).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_commit_folder() {
        let (dir, store, _) = setup("WITZIGE MOMENTE/merged_LUSTIGE_MOMENTE/uploaded_video1.mp4", b"1");
        let folder = dir.path().join("WITZIGE MOMENTE/merged_LUSTIGE_MOMENTE");
        let renamed = commit(&store, &folder).await.unwrap();
        assert_eq!(renamed, dir.path().join("WITZIGE MOMENTE/uploaded_LUSTIGE_MOMENTE"));
        assert!(renamed.join("uploaded_video1.mp4").exists());
    }

    #[tokio::test]
    async fn test_commit_missing_source() {
        let (dir, store, _) = setup("GAME/merged_video.mp4", b"1");
        let err = commit(&store, &dir.path().join("GAME/merged_gone.mp4")).await.unwrap_err();
        assert_eq!(*err, LibraryErrorKind::Rename);
    }
}
