use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{GhostError, Result};
use crate::transition::TransitionClass;

static DATA_DIR: Dir = include_dir!("src/data");

pub const DEFAULT_PROFILE: &str = "5USOYSDCXB";

/// One reference typist's mean inter-key delays (ms) per transition class
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyProfile {
    pub id: String,
    table: HashMap<TransitionClass, f64>,
}

impl LatencyProfile {
    /// Build a profile, rejecting tables that do not define all nine classes.
    pub fn new(id: impl Into<String>, table: HashMap<TransitionClass, f64>) -> Result<Self> {
        let id = id.into();
        if let Some(missing) = TransitionClass::ALL.iter().find(|c| !table.contains_key(c)) {
            return Err(GhostError::UnknownTransition {
                profile: id,
                code: missing.to_string(),
            });
        }
        Ok(Self { id, table })
    }

    pub fn latency(&self, class: TransitionClass) -> Result<f64> {
        self.table
            .get(&class)
            .copied()
            .ok_or_else(|| GhostError::UnknownTransition {
                profile: self.id.clone(),
                code: class.to_string(),
            })
    }
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawProfiles(BTreeMap<String, HashMap<TransitionClass, f64>>);

/// Named latency profiles keyed by participant id
#[derive(Debug, Clone, Default)]
pub struct ProfileBook {
    profiles: BTreeMap<String, LatencyProfile>,
}

impl ProfileBook {
    /// The profiles shipped with the binary
    pub fn builtin() -> Result<Self> {
        let file = DATA_DIR
            .get_file("profiles.json")
            .and_then(|f| f.contents_utf8())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "embedded profiles.json")
            })?;
        Self::from_json(file)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawProfiles = serde_json::from_str(json)?;
        let mut profiles = BTreeMap::new();
        for (id, table) in raw.0 {
            let profile = LatencyProfile::new(id.clone(), table)?;
            profiles.insert(id, profile);
        }
        Ok(Self { profiles })
    }

    pub fn insert(&mut self, profile: LatencyProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn get(&self, id: &str) -> Result<&LatencyProfile> {
        self.profiles
            .get(id)
            .ok_or_else(|| GhostError::UnknownProfile(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
