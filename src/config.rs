use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::profile::DEFAULT_PROFILE;
use crate::recorder::KeyPolicy;
use crate::session::{ChartMode, SessionSettings};
use crate::transition::{KeyboardLayout, DEFAULT_LEFT_HAND_KEYS};
use crate::words::DEFAULT_NUMBER_OF_WORDS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub number_of_words: usize,
    pub profile: String,
    pub key_policy: KeyPolicy,
    pub chart_mode: ChartMode,
    pub tempo: f64,
    pub left_hand_keys: String,
    pub words_file: Option<PathBuf>,
    pub reference_sample: Option<PathBuf>,
    pub pulse_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            number_of_words: DEFAULT_NUMBER_OF_WORDS,
            profile: DEFAULT_PROFILE.to_string(),
            key_policy: KeyPolicy::default(),
            chart_mode: ChartMode::default(),
            tempo: 1.0,
            left_hand_keys: DEFAULT_LEFT_HAND_KEYS.to_string(),
            words_file: None,
            reference_sample: None,
            pulse_dir: None,
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            number_of_words: cfg.number_of_words,
            profile_id: cfg.profile.clone(),
            key_policy: cfg.key_policy,
            chart_mode: cfg.chart_mode,
            layout: KeyboardLayout::new(&cfg.left_hand_keys),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            },
            Err(_) => log::debug!("no config at {}", self.path.display()),
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
