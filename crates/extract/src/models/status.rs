use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::consts::{MERGED_PREFIX, ONLYDESKTOP_PREFIX, ONLYMIC_PREFIX, UNMERGABLE_PREFIX};

/// How a recording was post-processed before it became ready for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusTag {
    /// Microphone and desktop audio were merged into one track.
    Merged,
    /// The tracks could not be merged and the recording is uploaded as-is.
    Unmergable,
    /// Only the microphone track was recorded.
    OnlyMic,
    /// Only the game/desktop track was recorded.
    OnlyDesktop,
}
impl StatusTag {
    pub const ALL: [StatusTag; 4] = [Self::Merged, Self::Unmergable, Self::OnlyMic, Self::OnlyDesktop];

    /// The name prefix that marks a path with this status.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Merged => MERGED_PREFIX,
            Self::Unmergable => UNMERGABLE_PREFIX,
            Self::OnlyMic => ONLYMIC_PREFIX,
            Self::OnlyDesktop => ONLYDESKTOP_PREFIX,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Unmergable => "unmergable",
            Self::OnlyMic => "onlymic",
            Self::OnlyDesktop => "onlydesktop",
        }
    }

    /// Human readable line used in generated video descriptions.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Merged => "Merged audio tracks",
            Self::Unmergable => "Original recording (audio tracks not merged)",
            Self::OnlyMic => "Microphone audio only",
            Self::OnlyDesktop => "Game/desktop audio only",
        }
    }
}
impl Display for StatusTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
