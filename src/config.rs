use std::path::PathBuf;

use crate::progress::DayBoundary;
use crate::quiz::session::DEFAULT_QUIZ_SIZE;
use crate::storage::{FileStore, DEFAULT_STORAGE_KEY};

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub quiz_size: usize,
    pub day_boundary: DayBoundary,
    pub log_level: String,
    /// Enables daily-rolling file logs in this directory
    pub log_dir: Option<PathBuf>,
    /// JSON catalog replacing the compiled-in word bank
    pub word_bank_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            quiz_size: DEFAULT_QUIZ_SIZE,
            day_boundary: DayBoundary::default(),
            log_level: "info".to_string(),
            log_dir: None,
            word_bank_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; bad values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("HSK_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let storage_key = lookup("HSK_STORAGE_KEY")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.storage_key);

        let quiz_size = lookup("HSK_QUIZ_SIZE")
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.quiz_size);

        let day_boundary = lookup("HSK_DAY_BOUNDARY")
            .and_then(|value| DayBoundary::parse(&value))
            .unwrap_or(defaults.day_boundary);

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        let log_dir = lookup("HSK_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let word_bank_path = lookup("HSK_WORD_BANK")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            data_dir,
            storage_key,
            quiz_size,
            day_boundary,
            log_level,
            log_dir,
            word_bank_path,
        }
    }
}

fn default_data_dir() -> PathBuf {
    FileStore::default_data_dir().unwrap_or_else(|_| PathBuf::from("./data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.quiz_size, DEFAULT_QUIZ_SIZE);
        assert_eq!(config.day_boundary, DayBoundary::Utc);
        assert_eq!(config.log_level, "info");
        assert!(config.word_bank_path.is_none());
    }

    #[test]
    fn test_values_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("HSK_DATA_DIR", "/tmp/hsk"),
            ("HSK_STORAGE_KEY", "alt"),
            ("HSK_QUIZ_SIZE", "25"),
            ("HSK_DAY_BOUNDARY", "local"),
            ("RUST_LOG", "debug"),
            ("HSK_LOG_DIR", "/tmp/hsk/logs"),
            ("HSK_WORD_BANK", "words.json"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/hsk"));
        assert_eq!(config.storage_key, "alt");
        assert_eq!(config.quiz_size, 25);
        assert_eq!(config.day_boundary, DayBoundary::Local);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/hsk/logs")));
        assert_eq!(config.word_bank_path, Some(PathBuf::from("words.json")));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("HSK_QUIZ_SIZE", "lots"),
            ("HSK_DAY_BOUNDARY", "martian"),
            ("HSK_STORAGE_KEY", "  "),
        ]));
        assert_eq!(config.quiz_size, DEFAULT_QUIZ_SIZE);
        assert_eq!(config.day_boundary, DayBoundary::Utc);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }
}
