use include_dir::{include_dir, Dir};
use rand::Rng;
use std::path::Path;

use crate::error::{GhostError, Result};

static DATA_DIR: Dir = include_dir!("src/data");

pub const DEFAULT_NUMBER_OF_WORDS: usize = 30;

/// Newline-delimited pool of words that sentences are drawn from
#[derive(Debug, Clone, PartialEq)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Parse newline-delimited text, trimming lines and dropping blanks
    pub fn parse(text: &str) -> Self {
        Self {
            words: text
                .lines()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        let text = DATA_DIR
            .get_file("words.txt")
            .and_then(|f| f.contents_utf8())
            .unwrap_or_default();
        Self::parse(text)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Sample `n_words` uniformly (with replacement) and join them with spaces
    pub fn generate_sentence<R: Rng + ?Sized>(&self, rng: &mut R, n_words: usize) -> Result<Sentence> {
        if self.words.is_empty() {
            return Err(GhostError::EmptyWordList);
        }
        let picked: Vec<&str> = (0..n_words.max(1))
            .map(|_| self.words[rng.gen_range(0..self.words.len())].as_str())
            .collect();
        Ok(Sentence::new(picked.join(" ")))
    }
}

/// The target text of a typing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    text: String,
    chars: Vec<char>,
}

impl Sentence {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let chars = text.chars().collect();
        Self { text, chars }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Length in characters, not bytes
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split(' ').count()
    }
}
