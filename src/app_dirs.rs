use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "ghostkeys")
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("ghostkeys_config.json"))
    }

    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("ghostkeys")
                .join("ghostkeys.log")
        } else {
            Self::project()
                .map(|pd| pd.data_local_dir().join("ghostkeys.log"))
                .unwrap_or_else(|| PathBuf::from("ghostkeys.log"))
        }
    }
}
