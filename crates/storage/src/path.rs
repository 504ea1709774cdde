//! Keeps every filesystem operation inside the recordings root.

use exn::ResultExt;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Resolves `path` (absolute, or relative to `root`) to an absolute path that
/// is guaranteed to live inside `root`.
///
/// `..` is resolved lexically and may not climb above the root. Null bytes
/// are rejected, since C-based syscalls would silently truncate the name.
/// The root itself is a valid result.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reel_storage::contain_path;
/// let root = Path::new("/rec");
/// assert_eq!(contain_path(root, "GAME/merged_a.mp4").unwrap(), Path::new("/rec/GAME/merged_a.mp4"));
/// assert_eq!(contain_path(root, "/rec/GAME/../b.mp4").unwrap(), Path::new("/rec/b.mp4"));
/// assert!(contain_path(root, "/rec/../etc/passwd").is_err());
/// assert!(contain_path(root, "/elsewhere/a.mp4").is_err());
/// ```
pub fn contain(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_path_buf());
    let relative = match path.is_absolute() {
        true => path.strip_prefix(root).or_raise(invalid)?,
        false => path,
    };
    let mut components = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                if name.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(name);
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    Ok(components.into_iter().fold(root.to_path_buf(), |acc, name| acc.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("GAME/merged_a.mp4", "/rec/GAME/merged_a.mp4")]
    #[case("/rec/GAME/merged_a.mp4", "/rec/GAME/merged_a.mp4")]
    #[case("GAME//./BUG/", "/rec/GAME/BUG")]
    #[case("GAME/BUG/..", "/rec/GAME")]
    #[case("", "/rec")]
    #[case("/rec", "/rec")]
    fn test_contained_paths(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(contain(Path::new("/rec"), path).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("GAME/../../b")]
    #[case("/rec/../etc")]
    #[case("/recordings/a.mp4")]
    #[case("/other/a.mp4")]
    #[case("a\0b")]
    fn test_escaping_paths(#[case] path: &str) {
        let err = contain(Path::new("/rec"), path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
