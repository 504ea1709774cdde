use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

pub const MERGED_PREFIX: &str = "merged_";
pub const UNMERGABLE_PREFIX: &str = "unmergable_";
pub const ONLYMIC_PREFIX: &str = "onlymic_";
pub const ONLYDESKTOP_PREFIX: &str = "onlydesktop_";
/// Marks a file or folder as already delivered; never picked up again.
pub const UPLOADED_PREFIX: &str = "uploaded_";
/// The pre-merge recording kept next to a merged file.
pub const ORIGINAL_PREFIX: &str = "original_";

/// Compared case-insensitively against the final extension of a file name.
pub const SUPPORTED_EXTENSIONS: [&str; 10] = ["mp4", "avi", "mov", "mkv", "webm", "flv", "aac", "mp3", "wav", "m4a"];

/// Label used for metadata fields when the folder structure is too shallow.
pub const DEFAULT_ROOT_LABEL: &str = "Recordings";

// Python's `surrogateescape` renders undecodable bytes 0x80..=0xFF as the
// lone surrogates U+DC80..=U+DCFF, which show up escaped in names that passed
// through such tooling.
regex!(SURROGATE_RUN_REGEX, r"(?:\\[uU][dD][cC][89a-fA-F][0-9a-fA-F])+");
regex!(WHITESPACE_REGEX, r"\s+");
