use reel_extract::models::StatusTag;
use reel_extract::tag::{Tag, is_supported, tag_of};
use reel_storage::{Entry, EntryKind};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    /// A single prefixed media file.
    SingleFile,
    /// A prefixed folder; every supported file below it is uploaded.
    FolderBatch,
}

/// Something discovered below the recordings root that is ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    /// Absolute path of the file or folder.
    pub source: PathBuf,
    pub kind: CandidateKind,
    pub status: StatusTag,
}
impl UploadCandidate {
    pub fn is_batch(&self) -> bool {
        self.kind == CandidateKind::FolderBatch
    }
}

/// What the walk does with a single folder entry.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Visit {
    Yield(UploadCandidate),
    Descend,
    Skip,
}

pub(crate) fn visit(entry: &Entry) -> Visit {
    let candidate = |kind, status| {
        Visit::Yield(UploadCandidate {
            source: entry.path.clone(),
            kind,
            status,
        })
    };
    match (entry.kind, tag_of(&entry.name)) {
        (_, Some(Tag::Uploaded)) => Visit::Skip,
        (EntryKind::Dir, Some(Tag::Pending(status))) => candidate(CandidateKind::FolderBatch, status),
        (EntryKind::Dir, None) => Visit::Descend,
        (EntryKind::File, Some(Tag::Pending(status))) if is_supported(&entry.path) => {
            candidate(CandidateKind::SingleFile, status)
        },
        (EntryKind::File, _) => Visit::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(name: &str, kind: EntryKind) -> Entry {
        Entry {
            path: PathBuf::from("/rec/GAME").join(name),
            name: name.into(),
            kind,
        }
    }

    #[rstest]
    #[case("merged_a.mp4", EntryKind::File, Some((CandidateKind::SingleFile, StatusTag::Merged)))]
    #[case("onlymic_a.wav", EntryKind::File, Some((CandidateKind::SingleFile, StatusTag::OnlyMic)))]
    #[case("merged_LUSTIG", EntryKind::Dir, Some((CandidateKind::FolderBatch, StatusTag::Merged)))]
    #[case("unmergable_notes.txt", EntryKind::File, None)]
    #[case("uploaded_merged_a.mp4", EntryKind::File, None)]
    #[case("uploaded_LUSTIG", EntryKind::Dir, None)]
    #[case("a.mp4", EntryKind::File, None)]
    fn test_visit(#[case] name: &str, #[case] kind: EntryKind, #[case] expected: Option<(CandidateKind, StatusTag)>) {
        let entry = entry(name, kind);
        let expected = match expected {
            Some((kind, status)) => Visit::Yield(UploadCandidate {
                source: entry.path.clone(),
                kind,
                status,
            }),
            None => Visit::Skip,
        };
        assert_eq!(visit(&entry), expected);
    }

    #[test]
    fn test_plain_folders_are_descended() {
        assert_eq!(visit(&entry("Star Wars Jedi", EntryKind::Dir)), Visit::Descend);
    }
}
