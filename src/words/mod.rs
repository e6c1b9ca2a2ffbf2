//! Word catalog
//!
//! Read-only HSK vocabulary, indexed by id and by level. The catalog is
//! loaded once and never mutated; lookups of unknown ids return `None` so
//! callers can silently drop dangling references.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compiled-in catalog (HSK 1-3)
const BUILTIN_WORDS: &str = include_str!("../../data/hsk_words.json");

// ============================================================
// Errors
// ============================================================

#[derive(Error, Debug)]
pub enum WordBankError {
    #[error("catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate word id: {0}")]
    DuplicateId(String),

    #[error("invalid HSK level: {0}")]
    InvalidLevel(u8),
}

// ============================================================
// HskLevel
// ============================================================

/// HSK level, always within 1..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HskLevel(u8);

impl HskLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All six levels in ascending order
    pub fn all() -> impl Iterator<Item = HskLevel> {
        (Self::MIN..=Self::MAX).map(HskLevel)
    }
}

impl TryFrom<u8> for HskLevel {
    type Error = WordBankError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(WordBankError::InvalidLevel(value))
    }
}

impl From<HskLevel> for u8 {
    fn from(level: HskLevel) -> Self {
        level.0
    }
}

impl fmt::Display for HskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HSK {}", self.0)
    }
}

// ============================================================
// Word
// ============================================================

/// Example sentence attached to a word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    pub pinyin: String,
    pub meaning: String,
}

/// A single vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    pub level: HskLevel,
    pub hanzi: String,
    pub pinyin: String,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Example>,
}

impl Word {
    /// Number of characters in the hanzi form, used as a syllable-count proxy
    pub fn char_count(&self) -> usize {
        self.hanzi.chars().count()
    }
}

// ============================================================
// WordBank
// ============================================================

/// Immutable word catalog
#[derive(Debug, Default)]
pub struct WordBank {
    words: Vec<Word>,
    by_id: HashMap<String, usize>,
    by_level: BTreeMap<HskLevel, Vec<usize>>,
}

impl WordBank {
    /// Builds a bank from words in insertion order
    ///
    /// # Errors
    /// Fails with [`WordBankError::DuplicateId`] if two words share an id.
    pub fn from_words(words: Vec<Word>) -> Result<Self, WordBankError> {
        let mut by_id = HashMap::with_capacity(words.len());
        let mut by_level: BTreeMap<HskLevel, Vec<usize>> = BTreeMap::new();

        for (idx, word) in words.iter().enumerate() {
            if by_id.insert(word.id.clone(), idx).is_some() {
                return Err(WordBankError::DuplicateId(word.id.clone()));
            }
            by_level.entry(word.level).or_default().push(idx);
        }

        Ok(Self {
            words,
            by_id,
            by_level,
        })
    }

    /// Parses a JSON array of words
    pub fn from_json_str(json: &str) -> Result<Self, WordBankError> {
        let words: Vec<Word> = serde_json::from_str(json)?;
        Self::from_words(words)
    }

    /// Reads a JSON catalog from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, WordBankError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The compiled-in HSK catalog
    pub fn builtin() -> Result<Self, WordBankError> {
        Self::from_json_str(BUILTIN_WORDS)
    }

    /// Process-wide catalog, parsed on first use
    ///
    /// A broken compiled-in catalog degrades to an empty bank rather than
    /// taking the process down.
    pub fn global() -> Arc<WordBank> {
        static GLOBAL: OnceLock<Arc<WordBank>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| match Self::builtin() {
                Ok(bank) => {
                    tracing::debug!(words = bank.total_count(), "word bank loaded");
                    Arc::new(bank)
                }
                Err(err) => {
                    tracing::error!(error = %err, "builtin word bank failed to parse");
                    Arc::new(WordBank::default())
                }
            })
            .clone()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Word> {
        self.by_id.get(id).map(|&idx| &self.words[idx])
    }

    /// Words at `level`, in catalog order
    pub fn get_by_level(&self, level: HskLevel) -> Vec<&Word> {
        self.by_level
            .get(&level)
            .map(|indices| indices.iter().map(|&idx| &self.words[idx]).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, level: HskLevel) -> usize {
        self.by_level.get(&level).map_or(0, Vec::len)
    }

    pub fn total_count(&self) -> usize {
        self.words.len()
    }

    pub fn all(&self) -> &[Word] {
        &self.words
    }

    /// Levels that have at least one word
    pub fn levels(&self) -> Vec<HskLevel> {
        self.by_level.keys().copied().collect()
    }
}
