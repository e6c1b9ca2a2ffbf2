//! Persisted data model
//!
//! Per-word SRS records, per-day counters, user settings, and the single
//! document that bundles them for storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StorageResult;
use crate::words::HskLevel;

/// Highest SRS tier; reaching it marks a word mastered
pub const MAX_SRS_LEVEL: u8 = 5;

pub const MIN_DAILY_GOAL: u32 = 5;
pub const MAX_DAILY_GOAL: u32 = 100;

/// Document format version written next to the state
const DOCUMENT_VERSION: u32 = 0;

// ============================================================
// WordProgress
// ============================================================

/// SRS state of one word, created on its first answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordProgress {
    pub word_id: String,
    /// 0 = new, 1..=MAX_SRS_LEVEL = familiarity tier
    pub level: u8,
    /// Total correct answers, never reset
    pub correct_count: u32,
    /// Total wrong answers, never reset
    pub wrong_count: u32,
    pub next_review: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    pub mastered: bool,
}

impl WordProgress {
    /// Restores `level <= MAX_SRS_LEVEL` and `mastered <=> level == MAX_SRS_LEVEL`
    fn normalize(&mut self) {
        self.level = self.level.min(MAX_SRS_LEVEL);
        self.mastered = self.level == MAX_SRS_LEVEL;
    }
}

// ============================================================
// DailyStats
// ============================================================

/// Counter selector for [`DailyStats::increment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyCounter {
    QuestionsAnswered,
    CorrectAnswers,
    NewWordsLearned,
    WordsReviewed,
}

/// Aggregate counters for one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub questions_answered: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub new_words_learned: u32,
    #[serde(default)]
    pub words_reviewed: u32,
}

impl DailyStats {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            questions_answered: 0,
            correct_answers: 0,
            new_words_learned: 0,
            words_reviewed: 0,
        }
    }

    pub fn increment(&mut self, counter: DailyCounter) {
        let slot = match counter {
            DailyCounter::QuestionsAnswered => &mut self.questions_answered,
            DailyCounter::CorrectAnswers => &mut self.correct_answers,
            DailyCounter::NewWordsLearned => &mut self.new_words_learned,
            DailyCounter::WordsReviewed => &mut self.words_reviewed,
        };
        *slot = slot.saturating_add(1);
    }
}

// ============================================================
// Settings
// ============================================================

/// User preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Questions per day, within [MIN_DAILY_GOAL, MAX_DAILY_GOAL]
    pub daily_goal: u32,
    /// Non-empty, ascending, no duplicates
    pub selected_levels: Vec<HskLevel>,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub notification_enabled: bool,
    pub show_pinyin: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_goal: 20,
            selected_levels: default_levels(),
            sound_enabled: true,
            vibration_enabled: true,
            notification_enabled: true,
            show_pinyin: true,
        }
    }
}

fn default_levels() -> Vec<HskLevel> {
    [1, 2].into_iter().filter_map(HskLevel::new).collect()
}

pub fn clamp_daily_goal(goal: u32) -> u32 {
    goal.clamp(MIN_DAILY_GOAL, MAX_DAILY_GOAL)
}

impl Settings {
    pub fn is_level_selected(&self, level: HskLevel) -> bool {
        self.selected_levels.binary_search(&level).is_ok()
    }

    /// Applies every present field of `patch`
    ///
    /// The daily goal is clamped; an empty level list is ignored so the
    /// selection can never become empty.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(goal) = patch.daily_goal {
            self.daily_goal = clamp_daily_goal(goal);
        }
        if let Some(mut levels) = patch.selected_levels {
            levels.sort_unstable();
            levels.dedup();
            if levels.is_empty() {
                tracing::warn!("ignoring empty level selection");
            } else {
                self.selected_levels = levels;
            }
        }
        if let Some(v) = patch.sound_enabled {
            self.sound_enabled = v;
        }
        if let Some(v) = patch.vibration_enabled {
            self.vibration_enabled = v;
        }
        if let Some(v) = patch.notification_enabled {
            self.notification_enabled = v;
        }
        if let Some(v) = patch.show_pinyin {
            self.show_pinyin = v;
        }
    }

    fn normalize(&mut self) {
        self.daily_goal = clamp_daily_goal(self.daily_goal);
        self.selected_levels.sort_unstable();
        self.selected_levels.dedup();
        if self.selected_levels.is_empty() {
            self.selected_levels = default_levels();
        }
    }
}

/// Partial settings update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub daily_goal: Option<u32>,
    pub selected_levels: Option<Vec<HskLevel>>,
    pub sound_enabled: Option<bool>,
    pub vibration_enabled: Option<bool>,
    pub notification_enabled: Option<bool>,
    pub show_pinyin: Option<bool>,
}

// ============================================================
// PersistedState
// ============================================================

/// Everything the progress store persists, stored as one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub word_progress: BTreeMap<String, WordProgress>,
    pub daily_stats: BTreeMap<String, DailyStats>,
    pub settings: Settings,
    pub excluded_words: Vec<String>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    state: &'a PersistedState,
    version: u32,
}

impl PersistedState {
    /// Serializes as `{"state": {...}, "version": 0}`
    pub fn to_document(&self) -> StorageResult<String> {
        let document = serde_json::to_string(&DocumentRef {
            state: self,
            version: DOCUMENT_VERSION,
        })?;
        Ok(document)
    }

    /// Parses a stored document, never failing
    ///
    /// Accepts the wrapped form as well as a bare state object. A field that
    /// is missing or malformed falls back to its default; malformed entries
    /// inside the progress and stats maps are dropped individually.
    pub fn from_document(document: &str) -> Self {
        let root: Value = match serde_json::from_str(document) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "stored state is not valid JSON, starting empty");
                return Self::default();
            }
        };

        let Some(obj) = unwrap_state(&root) else {
            tracing::warn!("stored state is not an object, starting empty");
            return Self::default();
        };

        let mut word_progress: BTreeMap<String, WordProgress> =
            map_field(obj, "wordProgress");
        for (id, progress) in word_progress.iter_mut() {
            progress.word_id = id.clone();
            progress.normalize();
        }

        let mut daily_stats: BTreeMap<String, DailyStats> = map_field(obj, "dailyStats");
        for (date, stats) in daily_stats.iter_mut() {
            stats.date = date.clone();
        }

        let mut settings: Settings = field(obj, "settings");
        settings.normalize();

        let mut excluded_words: Vec<String> = field(obj, "excludedWords");
        let mut seen = std::collections::HashSet::new();
        excluded_words.retain(|id| seen.insert(id.clone()));

        Self {
            word_progress,
            daily_stats,
            settings,
            excluded_words,
        }
    }
}

fn unwrap_state(root: &Value) -> Option<&Map<String, Value>> {
    let obj = root.as_object()?;
    match obj.get("state") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(obj),
    }
}

fn field<T: DeserializeOwned + Default>(obj: &Map<String, Value>, name: &str) -> T {
    match obj.get(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::warn!(field = name, error = %err, "malformed stored field, using default");
            T::default()
        }),
    }
}

fn map_field<T: DeserializeOwned>(obj: &Map<String, Value>, name: &str) -> BTreeMap<String, T> {
    let Some(value) = obj.get(name) else {
        return BTreeMap::new();
    };
    let Some(entries) = value.as_object() else {
        tracing::warn!(field = name, "stored field is not an object, using default");
        return BTreeMap::new();
    };

    entries
        .iter()
        .filter_map(|(key, entry)| match serde_json::from_value(entry.clone()) {
            Ok(parsed) => Some((key.clone(), parsed)),
            Err(err) => {
                tracing::warn!(field = name, key = %key, error = %err, "dropping malformed entry");
                None
            }
        })
        .collect()
}

// ============================================================
// Tests
// ============================================================
