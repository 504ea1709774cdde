//! Derives upload metadata from where a recording sits below the recordings
//! root, e.g. `<root>/SPIEL AUFNAHMEN/Star Wars Jedi/BUG/merged_video.mp4`.

use exn::{OptionExt, ResultExt};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use time::{OffsetDateTime, UtcOffset};
use tracing::instrument;

use crate::consts::{DEFAULT_ROOT_LABEL, ORIGINAL_PREFIX};
use crate::error::{ErrorKind, Result};
use crate::models::{CollectionChain, MetadataRecord, StatusTag};
use crate::normalize::{fix, fix_os};
use crate::tag::{Tag, classify, tag_of};

/// Raw path components between the root and the file.
struct Segments<'p> {
    folders: Vec<&'p OsStr>,
    leaf: &'p OsStr,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    root: PathBuf,
    label: String,
}
impl Extractor {
    /// The root's own (repaired) folder name becomes the fallback label.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let label = root
            .file_name()
            .map(fix_os)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOT_LABEL.to_string());
        Self { root, label }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stand-in for game, category and collection when the folders run out.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn segments<'p>(&self, path: &'p Path) -> Result<Segments<'p>> {
        let relative = path
            .strip_prefix(&self.root)
            .or_raise(|| ErrorKind::OutsideRoot(path.to_path_buf()))?;
        let mut names = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => names.push(name),
                Component::CurDir => {},
                _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
            }
        }
        let leaf = names.pop().ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
        Ok(Segments { folders: names, leaf })
    }

    /// Cleaned folder names, topmost first. Prefixes are stripped but the
    /// folder still contributes its name.
    fn folders(segments: &Segments<'_>) -> Vec<String> {
        segments.folders.iter().filter_map(|name| folder_name(name)).collect()
    }

    /// Collections for the file at `path`, nearest folder first.
    pub fn chain(&self, path: &Path) -> Result<CollectionChain> {
        let segments = self.segments(path)?;
        let mut names = Self::folders(&segments);
        names.reverse();
        if names.is_empty() {
            names.push(self.label.clone());
        }
        CollectionChain::new(names).ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))
    }

    /// The status of a path. A prefixed folder overrides whatever prefix the
    /// files inside it carry; the topmost one wins.
    pub fn status(&self, path: &Path) -> Result<StatusTag> {
        let segments = self.segments(path)?;
        segments
            .folders
            .iter()
            .chain(std::iter::once(&segments.leaf))
            .find_map(|name| tag_of(name).and_then(|tag| tag.status()))
            .ok_or_raise(|| ErrorKind::Untagged(path.to_path_buf()))
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn metadata(&self, path: &Path) -> Result<MetadataRecord> {
        let status = self.status(path)?;
        let segments = self.segments(path)?;
        let folders = Self::folders(&segments);
        let title = title(segments.leaf).ok_or_raise(|| ErrorKind::EmptyTitle(path.to_path_buf()))?;
        let (captured_at, size) = capture_details(path, segments.leaf)?;
        let nearest = |depth: usize| {
            folders
                .len()
                .checked_sub(depth)
                .and_then(|index| folders.get(index))
                .cloned()
                .unwrap_or_else(|| self.label.clone())
        };
        Ok(MetadataRecord {
            path: path.to_path_buf(),
            title,
            captured_at,
            game: nearest(2),
            category: nearest(1),
            collection: folders.first().cloned().unwrap_or_else(|| self.label.clone()),
            status,
            size,
            folders,
        })
    }
}

fn folder_name(name: &OsStr) -> Option<String> {
    let decoded = fix_os(name);
    Some(fix(classify(&decoded).remainder)).filter(|name| !name.is_empty())
}

/// File name without prefix and extension, underscores read as spaces.
fn title(leaf: &OsStr) -> Option<String> {
    let decoded = fix_os(leaf);
    let remainder = classify(&decoded).remainder;
    let stem = remainder.rsplit_once('.').map_or(remainder, |(stem, _)| stem);
    Some(fix(&stem.replace('_', " "))).filter(|title| !title.is_empty())
}

/// Merging leaves the source recording next to the result. Its timestamp is
/// the real capture time, the merged file was only written afterwards.
fn siblings(path: &Path, leaf: &OsStr) -> Vec<PathBuf> {
    let (Some(parent), Some(name)) = (path.parent(), leaf.to_str()) else {
        return Vec::new();
    };
    let tagged = classify(name);
    let mut siblings = vec![parent.join(format!("{ORIGINAL_PREFIX}{}", tagged.remainder))];
    if matches!(tagged.tag, Some(Tag::Pending(_))) {
        siblings.push(parent.join(tagged.remainder));
    }
    siblings
}

fn capture_details(path: &Path, leaf: &OsStr) -> Result<(OffsetDateTime, u64)> {
    let metadata = std::fs::metadata(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let original = siblings(path, leaf).into_iter().find_map(|sibling| {
        let modified = std::fs::metadata(&sibling).and_then(|m| m.modified()).ok()?;
        tracing::debug!(original = %sibling.display(), "Using capture time of the pre-merge recording");
        Some(modified)
    });
    let modified = original
        .or_else(|| metadata.modified().ok())
        .unwrap_or_else(SystemTime::now);
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    Ok((OffsetDateTime::from(modified).to_offset(offset), metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_single_file_metadata() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("AUFNAHMEN");
        let path = root.join("SPIEL AUFNAHMEN/Star Wars Jedi/BUG/merged_video.mp4");
        touch(&path, b"0123456789");

        let record = Extractor::new(&root).metadata(&path).unwrap();
        assert_eq!(record.title, "video");
        assert_eq!(record.game, "Star Wars Jedi");
        assert_eq!(record.category, "BUG");
        assert_eq!(record.collection, "SPIEL AUFNAHMEN");
        assert_eq!(record.status, StatusTag::Merged);
        assert_eq!(record.size, 10);
        assert_eq!(record.path, path);
    }

    #[test]
    fn test_chain_nearest_first() {
        let extractor = Extractor::new("/rec");
        let chain = extractor
            .chain(Path::new("/rec/SPIEL AUFNAHMEN/Star Wars Jedi/BUG/merged_video.mp4"))
            .unwrap();
        assert_eq!(&*chain, ["BUG", "Star Wars Jedi", "SPIEL AUFNAHMEN"]);
        assert_eq!(chain.primary(), "BUG");
    }

    #[test]
    fn test_batch_files_share_a_chain() {
        let extractor = Extractor::new("/rec");
        let first = extractor
            .chain(Path::new("/rec/WITZIGE MOMENTE/merged_LUSTIGE_MOMENTE/video1.mp4"))
            .unwrap();
        let second = extractor
            .chain(Path::new("/rec/WITZIGE MOMENTE/merged_LUSTIGE_MOMENTE/video2.mp4"))
            .unwrap();
        assert_eq!(&*first, ["LUSTIGE_MOMENTE", "WITZIGE MOMENTE"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chain_directly_below_root_uses_label() {
        let extractor = Extractor::new("/rec").with_label("Aufnahmen");
        let chain = extractor.chain(Path::new("/rec/merged_clip.mp4")).unwrap();
        assert_eq!(&*chain, ["Aufnahmen"]);
    }

    #[rstest]
    #[case("/rec/G/merged_LUSTIG/unmergable_a.mp4", StatusTag::Merged)]
    #[case("/rec/onlymic_X/merged_LUSTIG/a.mp4", StatusTag::OnlyMic)]
    #[case("/rec/G/onlydesktop_a.mp4", StatusTag::OnlyDesktop)]
    fn test_folder_status_wins(#[case] path: &str, #[case] expected: StatusTag) {
        assert_eq!(Extractor::new("/rec").status(Path::new(path)).unwrap(), expected);
    }

    #[test]
    fn test_untagged_path_is_rejected() {
        let err = Extractor::new("/rec").status(Path::new("/rec/G/a.mp4")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Untagged(_)));
    }

    #[rstest]
    #[case("/elsewhere/G/merged_a.mp4")]
    #[case("/rec")]
    fn test_paths_outside_root(#[case] path: &str) {
        assert!(Extractor::new("/rec").chain(Path::new(path)).is_err());
    }

    #[test]
    fn test_shallow_path_defaults_to_label() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged_clip_of_the_day.mkv");
        touch(&path, b"x");

        let record = Extractor::new(dir.path()).with_label("Recordings").metadata(&path).unwrap();
        assert_eq!(record.title, "clip of the day");
        assert_eq!(record.game, "Recordings");
        assert_eq!(record.category, "Recordings");
        assert_eq!(record.collection, "Recordings");
    }

    #[test]
    fn test_mangled_names_are_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SchÃ¶ne Spiele/GrÃ¼n/merged_KÃ¤fer_Jagd.mp4");
        touch(&path, b"x");

        let record = Extractor::new(dir.path()).metadata(&path).unwrap();
        assert_eq!(record.title, "Käfer Jagd");
        assert_eq!(record.game, "Schöne Spiele");
        assert_eq!(record.category, "Grün");
    }

    #[test]
    fn test_capture_time_prefers_original_recording() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("G/original_video.mp4");
        touch(&original, b"original");
        let modified = fs::metadata(&original).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let merged = dir.path().join("G/merged_video.mp4");
        touch(&merged, b"merged");

        let record = Extractor::new(dir.path()).metadata(&merged).unwrap();
        assert_eq!(record.captured_at, OffsetDateTime::from(modified));
    }

    #[test]
    fn test_empty_title() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("G/merged_.mp4");
        touch(&path, b"x");
        let err = Extractor::new(dir.path()).metadata(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyTitle(_)));
    }
}
