use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use super::StatusTag;

const CAPTURED_AT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[day].[month].[year] - [hour]:[minute]");

/// Everything the hosting service needs to know about a single recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Absolute path of the source file.
    pub path: PathBuf,
    pub title: String,
    pub captured_at: OffsetDateTime,
    /// Second-nearest folder, usually named after the game.
    pub game: String,
    /// Nearest folder.
    pub category: String,
    /// Top-level folder below the recordings root.
    pub collection: String,
    /// Cleaned folder names between root and file, topmost first.
    pub folders: Vec<String>,
    pub status: StatusTag,
    pub size: u64,
}
impl MetadataRecord {
    /// Capture time rendered the way it appears in descriptions.
    pub fn captured_at_display(&self) -> String {
        self.captured_at
            .format(CAPTURED_AT_FORMAT)
            .unwrap_or_else(|_| self.captured_at.unix_timestamp().to_string())
    }

    pub fn description(&self) -> String {
        let headline = match self.status {
            StatusTag::OnlyMic => format!("Microphone audio: {}", self.title),
            StatusTag::OnlyDesktop => format!("Game/desktop audio: {}", self.title),
            StatusTag::Merged | StatusTag::Unmergable => format!("Gameplay video: {}", self.title),
        };
        format!(
            "{headline}\n\nGame: {}\nCategory: {}\nStatus: {}\nRecorded: {}\n\nUploaded automatically from the \"{}\" collection.",
            self.game,
            self.category,
            self.status.describe(),
            self.captured_at_display(),
            self.collection,
        )
    }

    /// Search tags: a few fixed ones for the status, then the folder names.
    pub fn tags(&self) -> Vec<String> {
        let fixed: &[&str] = match self.status {
            StatusTag::OnlyMic => &["Microphone", "Voice", "Commentary"],
            StatusTag::OnlyDesktop => &["Gaming", "Gameplay", "Desktop Audio"],
            StatusTag::Merged | StatusTag::Unmergable => &["Gaming", "Gameplay"],
        };
        let mut tags: Vec<String> = fixed.iter().map(ToString::to_string).collect();
        let folders = std::iter::once(self.game.clone())
            .chain(std::iter::once(self.collection.replace(' ', "")))
            .chain(self.folders.iter().skip(2).cloned());
        for tag in folders {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(status: StatusTag) -> MetadataRecord {
        MetadataRecord {
            path: PathBuf::from("/recordings/SPIEL AUFNAHMEN/Star Wars Jedi/BUG/merged_video.mp4"),
            title: "video".to_string(),
            captured_at: datetime!(2024-03-09 18:05 +00:00),
            game: "Star Wars Jedi".to_string(),
            category: "BUG".to_string(),
            collection: "SPIEL AUFNAHMEN".to_string(),
            folders: vec!["SPIEL AUFNAHMEN".to_string(), "Star Wars Jedi".to_string(), "BUG".to_string()],
            status,
            size: 42,
        }
    }

    #[test]
    fn test_description() {
        let description = record(StatusTag::Merged).description();
        assert!(description.starts_with("Gameplay video: video\n"));
        assert!(description.contains("Game: Star Wars Jedi\n"));
        assert!(description.contains("Category: BUG\n"));
        assert!(description.contains("Recorded: 09.03.2024 - 18:05\n"));
        assert!(description.ends_with("\"SPIEL AUFNAHMEN\" collection."));
    }

    #[test]
    fn test_description_for_microphone_only() {
        let description = record(StatusTag::OnlyMic).description();
        assert!(description.starts_with("Microphone audio: video\n"));
        assert!(description.contains("Status: Microphone audio only\n"));
    }

    #[test]
    fn test_tags() {
        assert_eq!(record(StatusTag::Merged).tags(), vec![
            "Gaming",
            "Gameplay",
            "Star Wars Jedi",
            "SPIELAUFNAHMEN",
            "BUG"
        ]);
    }
}
