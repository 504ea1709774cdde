//! Classification of file and folder names by their transfer-state prefix.
//!
//! Prefixes are matched case-sensitively at the very start of a single path
//! segment. A name carries at most one prefix; the remainder is returned
//! untouched so callers can decide how to clean it up.

use std::ffi::OsStr;
use std::path::Path;

use crate::consts::{SUPPORTED_EXTENSIONS, UPLOADED_PREFIX};
use crate::models::StatusTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Ready for upload, with the given processing status.
    Pending(StatusTag),
    /// Already delivered in a previous run.
    Uploaded,
}
impl Tag {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Pending(status) => status.prefix(),
            Self::Uploaded => UPLOADED_PREFIX,
        }
    }

    pub fn status(&self) -> Option<StatusTag> {
        match self {
            Self::Pending(status) => Some(*status),
            Self::Uploaded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tagged<'a> {
    pub tag: Option<Tag>,
    /// The name with the matched prefix removed.
    pub remainder: &'a str,
}
impl Tagged<'_> {
    pub fn status(&self) -> Option<StatusTag> {
        self.tag.and_then(|tag| tag.status())
    }

    pub fn is_uploaded(&self) -> bool {
        self.tag == Some(Tag::Uploaded)
    }
}

fn tags() -> impl Iterator<Item = Tag> {
    std::iter::once(Tag::Uploaded).chain(StatusTag::ALL.into_iter().map(Tag::Pending))
}

/// Splits a single name into its prefix tag and the remaining text.
pub fn classify(name: &str) -> Tagged<'_> {
    for tag in tags() {
        if let Some(remainder) = name.strip_prefix(tag.prefix()) {
            return Tagged { tag: Some(tag), remainder };
        }
    }
    Tagged { tag: None, remainder: name }
}

/// Same as [`classify`], but for names read straight from the filesystem that
/// are not guaranteed to be valid UTF-8. Prefixes are ASCII, so a byte
/// comparison is enough.
pub fn tag_of(name: &OsStr) -> Option<Tag> {
    let bytes = name.as_encoded_bytes();
    tags().find(|tag| bytes.starts_with(tag.prefix().as_bytes()))
}

/// Whether the file extension belongs to a media type the host accepts.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(extension)))
}
