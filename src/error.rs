use std::io;

use thiserror::Error;

/// Errors surfaced by the timing engine and its data loaders.
#[derive(Debug, Error)]
pub enum GhostError {
    /// Requested latency profile id is not in the profile book.
    #[error("Unknown latency profile: {0}")]
    UnknownProfile(String),

    /// A transition class was missing from an otherwise known profile.
    #[error("Profile {profile} has no latency for transition {code}")]
    UnknownTransition { profile: String, code: String },

    #[error("Word list is empty, cannot generate a sentence")]
    EmptyWordList,

    #[error("Tempo must be a positive number, got {0}")]
    InvalidTempo(f64),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GhostError>;
