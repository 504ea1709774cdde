use clap::Parser;
use figment::Figment;
use figment::providers::Serialized;
use reel_config::Config;
use std::path::PathBuf;

/// Uploads recorded gameplay to a video host, sorted into playlists by
/// folder.
///
/// Recordings are picked up when their name (or the name of a folder they
/// are in) starts with `merged_`, `unmergable_`, `onlymic_` or
/// `onlydesktop_`. Uploaded recordings are renamed to `uploaded_…`.
#[derive(Debug, Parser)]
#[command(name = "reel", version, about)]
pub struct Cli {
    /// Show what would be uploaded and which playlists exist, without
    /// uploading, creating or renaming anything.
    #[arg(short = 'n', long)]
    pub preview: bool,

    /// Verbose logging.
    #[arg(short, long)]
    pub debug: bool,

    /// Upload without asking first.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Recordings folder to scan instead of the configured one.
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Configuration file to use instead of the default one.
    #[arg(short, long, value_name = "FILE", env = "REEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recordings uploaded at the same time.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Who can see new videos.
    #[arg(long, value_parser = ["public", "unlisted", "private"])]
    pub visibility: Option<String>,

    /// Only scan this top-level folder; can be repeated.
    #[arg(long = "main-folder", value_name = "NAME")]
    pub main_folders: Vec<String>,
}
impl Cli {
    /// Configuration from every source, with command line flags on top.
    pub fn figment(&self) -> Figment {
        let mut figment = Config::figment(self.config.as_deref());
        if let Some(path) = &self.path {
            // Logged and reported paths should not depend on where reel was started.
            let path = std::path::absolute(path).unwrap_or_else(|_| path.clone());
            figment = figment.merge(Serialized::default("recordings_path", path));
        }
        if self.debug {
            figment = figment.merge(Serialized::default("debug", true));
        }
        if let Some(workers) = self.workers {
            figment = figment.merge(Serialized::default("upload.workers", workers));
        }
        if let Some(visibility) = &self.visibility {
            figment = figment.merge(Serialized::default("visibility", visibility));
        }
        if !self.main_folders.is_empty() {
            figment = figment.merge(Serialized::default("main_folders", &self.main_folders));
        }
        figment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use reel_remote::Visibility;
    use rstest::rstest;

    #[test]
    fn test_command() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_configuration() {
        let cli = Cli::try_parse_from([
            "reel",
            "--path",
            "/recordings",
            "--workers",
            "3",
            "--visibility",
            "private",
            "--main-folder",
            "SPIEL AUFNAHMEN",
            "-n",
        ])
        .unwrap();
        assert!(cli.preview);
        assert!(!cli.yes);
        let config: Config = cli.figment().extract().unwrap();
        assert_eq!(config.recordings_path, Some(PathBuf::from("/recordings")));
        assert_eq!(config.upload.workers, 3);
        assert_eq!(config.visibility, Visibility::Private);
        assert_eq!(config.main_folders, ["SPIEL AUFNAHMEN"]);
    }

    #[rstest]
    #[case(&["reel", "-y"])]
    #[case(&["reel", "--yes"])]
    fn test_yes_skips_confirmation(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).unwrap().yes);
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let cli = Cli::try_parse_from(["reel", "-p", "recordings"]).unwrap();
        let config: Config = cli.figment().extract().unwrap();
        let path = config.recordings_path.unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, std::env::current_dir().unwrap().join("recordings"));
    }

    #[rstest]
    #[case(&["reel", "--visibility", "secret"])]
    #[case(&["reel", "--workers", "many"])]
    fn test_invalid_flags(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }
}
