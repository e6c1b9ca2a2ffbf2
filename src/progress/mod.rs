//! Learner progress
//!
//! [`ProgressStore`] owns every piece of mutable learner state: per-word SRS
//! records, daily counters, settings and the excluded-word list. All
//! mutation goes through its methods; each mutation is applied in memory
//! first and then handed to the [`Persister`] without waiting on I/O.
//!
//! - [`srs`] - tier transitions, review intervals, day boundaries
//! - [`scheduler`] - due-word, new-word and quiz-batch selection

pub mod scheduler;
pub mod srs;

pub use srs::{DayBoundary, SRS_INTERVALS};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::storage::{
    clamp_daily_goal, DailyCounter, DailyStats, PersistedState, Persister, Settings,
    SettingsPatch, WordProgress,
};
use crate::words::{HskLevel, Word, WordBank};

/// Longest history `recent_daily_stats` will build (about ten years)
pub const MAX_RECENT_DAYS: u32 = 3660;

// ============================================================
// Query results
// ============================================================

/// Progress summary for one HSK level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub level: HskLevel,
    pub total_words: usize,
    /// Words with a progress record above tier 0
    pub learned_words: usize,
    pub mastered_words: usize,
}

/// Lifetime totals across all days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub words_tracked: usize,
    pub words_mastered: usize,
    pub total_questions: u64,
    pub total_correct: u64,
    /// Rounded percentage, 0 when nothing was answered
    pub accuracy_percent: u32,
}

// ============================================================
// ProgressStore
// ============================================================

pub struct ProgressStore {
    bank: Arc<WordBank>,
    state: PersistedState,
    persister: Persister,
    day_boundary: DayBoundary,
    rng: ChaCha8Rng,
}

impl ProgressStore {
    /// Starts from empty state
    pub fn new(bank: Arc<WordBank>, persister: Persister) -> Self {
        Self::from_state(bank, PersistedState::default(), persister)
    }

    pub fn from_state(bank: Arc<WordBank>, state: PersistedState, persister: Persister) -> Self {
        Self {
            bank,
            state,
            persister,
            day_boundary: DayBoundary::default(),
            rng: ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Rehydrates from the persister's store
    ///
    /// A failed read or a corrupt document yields default state; this never
    /// fails.
    pub fn load(bank: Arc<WordBank>, persister: Persister) -> Self {
        let document = persister.load();
        Self::rehydrate(bank, persister, document)
    }

    /// Like [`ProgressStore::load`], reading on the blocking pool
    pub async fn open(bank: Arc<WordBank>, persister: Persister) -> Self {
        let document = persister.load_async().await;
        Self::rehydrate(bank, persister, document)
    }

    fn rehydrate(
        bank: Arc<WordBank>,
        persister: Persister,
        document: crate::storage::StorageResult<Option<String>>,
    ) -> Self {
        let state = match document {
            Ok(Some(doc)) => PersistedState::from_document(&doc),
            Ok(None) => {
                tracing::info!(key = persister.key(), "no stored progress, starting fresh");
                PersistedState::default()
            }
            Err(err) => {
                tracing::warn!(key = persister.key(), error = %err, "failed to read stored progress");
                PersistedState::default()
            }
        };
        tracing::debug!(
            words = state.word_progress.len(),
            days = state.daily_stats.len(),
            "progress loaded"
        );
        Self::from_state(bank, state, persister)
    }

    pub fn with_day_boundary(mut self, day_boundary: DayBoundary) -> Self {
        self.day_boundary = day_boundary;
        self
    }

    /// Fixes the shuffle seed (for testing)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn bank(&self) -> &Arc<WordBank> {
        &self.bank
    }

    pub fn day_boundary(&self) -> DayBoundary {
        self.day_boundary
    }

    /// Current state, as it would be persisted
    pub fn snapshot(&self) -> &PersistedState {
        &self.state
    }

    /// Waits for queued writes (call before shutdown)
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    fn persist(&self) {
        match self.state.to_document() {
            Ok(doc) => self.persister.save(doc),
            Err(err) => tracing::error!(error = %err, "failed to serialize progress"),
        }
    }

    // ========== Answers ==========

    /// Records one answer for `word_id`
    ///
    /// Returns the updated record, or `None` (and changes nothing) when the
    /// id is not in the word bank.
    pub fn update_word_progress(&mut self, word_id: &str, correct: bool) -> Option<WordProgress> {
        self.update_word_progress_at(word_id, correct, Utc::now())
    }

    pub fn update_word_progress_at(
        &mut self,
        word_id: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> Option<WordProgress> {
        if self.bank.get_by_id(word_id).is_none() {
            tracing::warn!(word_id, "answer for unknown word ignored");
            return None;
        }

        let existing = self.state.word_progress.get(word_id);
        let is_new = srs::is_new_learning(existing);
        let updated = srs::apply_answer(existing, word_id, correct, now);

        self.state
            .word_progress
            .insert(word_id.to_string(), updated.clone());

        let today = self.today_entry(now);
        today.increment(DailyCounter::QuestionsAnswered);
        if correct {
            today.increment(DailyCounter::CorrectAnswers);
        }
        today.increment(if is_new {
            DailyCounter::NewWordsLearned
        } else {
            DailyCounter::WordsReviewed
        });

        tracing::debug!(
            word_id,
            correct,
            level = updated.level,
            mastered = updated.mastered,
            "word progress updated"
        );
        self.persist();
        Some(updated)
    }

    pub fn word_progress(&self, word_id: &str) -> Option<&WordProgress> {
        self.state.word_progress.get(word_id)
    }

    /// Records with at least one wrong answer, most wrong first
    ///
    /// Ties keep the store's iteration order (ascending word id).
    pub fn most_wrong_words(&self) -> Vec<WordProgress> {
        let mut words: Vec<WordProgress> = self
            .state
            .word_progress
            .values()
            .filter(|wp| wp.wrong_count > 0)
            .cloned()
            .collect();
        words.sort_by(|a, b| b.wrong_count.cmp(&a.wrong_count));
        words
    }

    // ========== Daily stats ==========

    pub fn today_key(&self) -> String {
        self.today_key_at(Utc::now())
    }

    pub fn today_key_at(&self, now: DateTime<Utc>) -> String {
        self.day_boundary.date_key(now)
    }

    /// Today's counters; zeroed if nothing was answered today
    pub fn today_stats(&self) -> DailyStats {
        self.today_stats_at(Utc::now())
    }

    pub fn today_stats_at(&self, now: DateTime<Utc>) -> DailyStats {
        let key = self.today_key_at(now);
        self.state
            .daily_stats
            .get(&key)
            .cloned()
            .unwrap_or_else(|| DailyStats::new(key))
    }

    pub fn increment_daily_stat(&mut self, counter: DailyCounter) {
        self.increment_daily_stat_at(counter, Utc::now());
    }

    pub fn increment_daily_stat_at(&mut self, counter: DailyCounter, now: DateTime<Utc>) {
        self.today_entry(now).increment(counter);
        self.persist();
    }

    fn today_entry(&mut self, now: DateTime<Utc>) -> &mut DailyStats {
        let key = self.day_boundary.date_key(now);
        self.state
            .daily_stats
            .entry(key.clone())
            .or_insert_with(|| DailyStats::new(key))
    }

    /// One entry per day for the last `days` days, oldest first
    pub fn recent_daily_stats(&self, days: u32) -> Vec<DailyStats> {
        self.recent_daily_stats_at(days, Utc::now())
    }

    /// One entry per day ending at `now`, oldest first
    ///
    /// `days` is capped at [`MAX_RECENT_DAYS`]; the series stops early at
    /// the edge of the representable date range.
    pub fn recent_daily_stats_at(&self, days: u32, now: DateTime<Utc>) -> Vec<DailyStats> {
        let days = days.min(MAX_RECENT_DAYS);
        let mut series: Vec<DailyStats> = (0..i64::from(days))
            .map_while(|offset| now.checked_sub_signed(Duration::days(offset)))
            .map(|day| self.today_stats_at(day))
            .collect();
        series.reverse();
        series
    }

    pub fn overall_stats(&self) -> OverallStats {
        let (total_questions, total_correct) =
            self.state
                .daily_stats
                .values()
                .fold((0u64, 0u64), |(questions, correct), stats| {
                    (
                        questions + u64::from(stats.questions_answered),
                        correct + u64::from(stats.correct_answers),
                    )
                });

        let accuracy_percent = if total_questions > 0 {
            ((total_correct as f64 / total_questions as f64) * 100.0).round() as u32
        } else {
            0
        };

        OverallStats {
            words_tracked: self.state.word_progress.len(),
            words_mastered: self
                .state
                .word_progress
                .values()
                .filter(|wp| wp.mastered)
                .count(),
            total_questions,
            total_correct,
            accuracy_percent,
        }
    }

    /// Recomputed on every call
    pub fn level_stats(&self, level: HskLevel) -> LevelStats {
        let mut learned_words = 0;
        let mut mastered_words = 0;

        for word in self.bank.get_by_level(level) {
            if let Some(wp) = self.state.word_progress.get(&word.id) {
                if wp.level > 0 {
                    learned_words += 1;
                    if wp.mastered {
                        mastered_words += 1;
                    }
                }
            }
        }

        LevelStats {
            level,
            total_words: self.bank.count(level),
            learned_words,
            mastered_words,
        }
    }

    // ========== Settings ==========

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    /// Merges `patch` into the settings (goal clamped to [5, 100])
    pub fn update_settings(&mut self, patch: SettingsPatch) {
        self.state.settings.apply(patch);
        self.persist();
    }

    pub fn set_daily_goal(&mut self, goal: u32) {
        self.state.settings.daily_goal = clamp_daily_goal(goal);
        self.persist();
    }

    /// Selects or deselects `level`
    ///
    /// Returns `false` and changes nothing when asked to deselect the only
    /// selected level.
    pub fn toggle_level(&mut self, level: HskLevel) -> bool {
        let levels = &mut self.state.settings.selected_levels;
        match levels.binary_search(&level) {
            Ok(_) if levels.len() == 1 => {
                tracing::debug!(%level, "refusing to deselect the last level");
                return false;
            }
            Ok(pos) => {
                levels.remove(pos);
            }
            Err(pos) => levels.insert(pos, level),
        }
        self.persist();
        true
    }

    // ========== Exclusions ==========

    /// Flips exclusion of `word_id`; returns whether it is now excluded
    pub fn toggle_word_exclusion(&mut self, word_id: &str) -> bool {
        let excluded = &mut self.state.excluded_words;
        let now_excluded = match excluded.iter().position(|id| id == word_id) {
            Some(pos) => {
                excluded.remove(pos);
                false
            }
            None => {
                excluded.push(word_id.to_string());
                true
            }
        };
        self.persist();
        now_excluded
    }

    pub fn is_word_excluded(&self, word_id: &str) -> bool {
        self.state.excluded_words.iter().any(|id| id == word_id)
    }

    /// Excluded ids in the order they were excluded
    pub fn excluded_word_ids(&self) -> &[String] {
        &self.state.excluded_words
    }

    /// Excluded words that still exist in the bank
    pub fn excluded_words(&self) -> Vec<&Word> {
        self.state
            .excluded_words
            .iter()
            .filter_map(|id| self.bank.get_by_id(id))
            .collect()
    }

    // ========== Reset ==========

    /// Clears word progress and daily stats; settings and exclusions stay
    pub fn reset_all_progress(&mut self) {
        self.state.word_progress.clear();
        self.state.daily_stats.clear();
        tracing::info!("all progress reset");
        self.persist();
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::words::test_support::word;
    use chrono::TimeZone;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 15, 10, 0, 0).unwrap()
    }

    pub fn small_bank() -> Arc<WordBank> {
        Arc::new(
            WordBank::from_words(vec![
                word("ai", 1, "爱", "ài", "love"),
                word("ba", 1, "八", "bā", "eight"),
                word("cha", 1, "茶", "chá", "tea"),
                word("chi", 1, "吃", "chī", "to eat"),
                word("bai", 2, "白", "bái", "white"),
                word("bie", 2, "别", "bié", "don't"),
                word("anjing", 3, "安静", "ānjìng", "quiet"),
            ])
            .unwrap(),
        )
    }

    pub fn store_with(bank: Arc<WordBank>) -> (ProgressStore, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        let store = ProgressStore::new(bank, Persister::inline(kv.clone())).with_seed(7);
        (store, kv)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::storage::{KeyValueStore, MAX_SRS_LEVEL};
    use crate::words::test_support::level;

    #[test]
    fn test_first_correct_answer() {
        let (mut store, _) = store_with(small_bank());
        let wp = store.update_word_progress_at("ai", true, now()).unwrap();

        assert_eq!(wp.level, 1);
        assert_eq!(wp.correct_count, 1);
        assert_eq!(wp.wrong_count, 0);
        assert!(!wp.mastered);
        assert_eq!(
            store.day_boundary().date_of(wp.next_review),
            store.day_boundary().date_of(now() + Duration::days(1))
        );

        let today = store.today_stats_at(now());
        assert_eq!(today.questions_answered, 1);
        assert_eq!(today.correct_answers, 1);
        assert_eq!(today.new_words_learned, 1);
        assert_eq!(today.words_reviewed, 0);
    }

    #[test]
    fn test_wrong_answer_after_progress() {
        let (mut store, _) = store_with(small_bank());
        for _ in 0..3 {
            store.update_word_progress_at("ai", true, now());
        }
        assert_eq!(store.word_progress("ai").unwrap().level, 3);

        let wp = store.update_word_progress_at("ai", false, now()).unwrap();
        assert_eq!(wp.level, 1);
        assert_eq!(wp.wrong_count, 1);
        assert_eq!(wp.correct_count, 3);
        assert!(!wp.mastered);
        assert_eq!(wp.next_review, now() + Duration::days(1));

        let today = store.today_stats_at(now());
        assert_eq!(today.questions_answered, 4);
        assert_eq!(today.correct_answers, 3);
        assert_eq!(today.new_words_learned, 1);
        assert_eq!(today.words_reviewed, 3);
    }

    #[test]
    fn test_mastery_at_top_tier() {
        let (mut store, _) = store_with(small_bank());
        let mut last = None;
        for _ in 0..6 {
            last = store.update_word_progress_at("ai", true, now());
        }
        let wp = last.unwrap();
        assert_eq!(wp.level, MAX_SRS_LEVEL);
        assert!(wp.mastered);
        assert_eq!(wp.next_review, now() + Duration::days(30));
    }

    #[test]
    fn test_unknown_word_ignored() {
        let (mut store, kv) = store_with(small_bank());
        assert!(store.update_word_progress_at("nope", true, now()).is_none());
        assert!(store.snapshot().word_progress.is_empty());
        assert!(store.snapshot().daily_stats.is_empty());
        assert!(kv.is_empty());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let bank = small_bank();
        let (mut store, kv) = store_with(bank.clone());
        store.update_word_progress_at("cha", false, now());
        store.toggle_word_exclusion("bai");
        store.set_daily_goal(3);

        let reloaded = ProgressStore::load(bank, Persister::inline(kv.clone()));
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(reloaded.settings().daily_goal, 5);
        assert!(kv.get_item(crate::storage::DEFAULT_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_level_stats() {
        let (mut store, _) = store_with(small_bank());
        store.update_word_progress_at("ai", true, now());
        for _ in 0..5 {
            store.update_word_progress_at("ba", true, now());
        }
        store.update_word_progress_at("bai", true, now());

        let stats = store.level_stats(level(1));
        assert_eq!(stats.total_words, 4);
        assert_eq!(stats.learned_words, 2);
        assert_eq!(stats.mastered_words, 1);

        assert_eq!(store.level_stats(level(4)).total_words, 0);
    }

    #[test]
    fn test_most_wrong_words_sorted() {
        let (mut store, _) = store_with(small_bank());
        store.update_word_progress_at("ai", false, now());
        for _ in 0..3 {
            store.update_word_progress_at("cha", false, now());
        }
        store.update_word_progress_at("ba", true, now());
        store.update_word_progress_at("chi", false, now());

        let ids: Vec<_> = store
            .most_wrong_words()
            .into_iter()
            .map(|wp| wp.word_id)
            .collect();
        assert_eq!(ids, vec!["cha", "ai", "chi"]);
    }

    #[test]
    fn test_toggle_level_keeps_one() {
        let (mut store, _) = store_with(small_bank());
        assert_eq!(store.settings().selected_levels, vec![level(1), level(2)]);

        assert!(store.toggle_level(level(3)));
        assert_eq!(store.settings().selected_levels, vec![level(1), level(2), level(3)]);

        assert!(store.toggle_level(level(1)));
        assert!(store.toggle_level(level(2)));
        assert!(!store.toggle_level(level(3)));
        assert_eq!(store.settings().selected_levels, vec![level(3)]);
    }

    #[test]
    fn test_exclusion_toggle() {
        let (mut store, _) = store_with(small_bank());
        assert!(store.toggle_word_exclusion("ai"));
        assert!(store.toggle_word_exclusion("ghost"));
        assert!(store.is_word_excluded("ai"));
        assert_eq!(store.excluded_word_ids(), ["ai".to_string(), "ghost".to_string()]);
        assert_eq!(store.excluded_words().len(), 1);

        assert!(!store.toggle_word_exclusion("ai"));
        assert!(!store.is_word_excluded("ai"));
    }

    #[test]
    fn test_reset_keeps_settings_and_exclusions() {
        let (mut store, _) = store_with(small_bank());
        store.update_word_progress_at("ai", true, now());
        store.toggle_word_exclusion("ba");
        store.set_daily_goal(40);

        store.reset_all_progress();
        assert!(store.snapshot().word_progress.is_empty());
        assert!(store.snapshot().daily_stats.is_empty());
        assert!(store.is_word_excluded("ba"));
        assert_eq!(store.settings().daily_goal, 40);
    }

    #[test]
    fn test_recent_and_overall_stats() {
        let (mut store, _) = store_with(small_bank());
        store.update_word_progress_at("ai", true, now() - Duration::days(2));
        store.update_word_progress_at("ba", false, now());
        store.update_word_progress_at("cha", true, now());
        store.increment_daily_stat_at(DailyCounter::WordsReviewed, now());

        let recent = store.recent_daily_stats_at(7, now());
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[6].date, "2026-04-15");
        assert_eq!(recent[6].questions_answered, 2);
        assert_eq!(recent[6].words_reviewed, 1);
        assert_eq!(recent[4].questions_answered, 1);
        assert_eq!(recent[0].date, "2026-04-09");
        assert_eq!(recent[0].questions_answered, 0);

        assert!(store.recent_daily_stats_at(0, now()).is_empty());

        let overall = store.overall_stats();
        assert_eq!(overall.words_tracked, 3);
        assert_eq!(overall.total_questions, 3);
        assert_eq!(overall.total_correct, 2);
        assert_eq!(overall.accuracy_percent, 67);
    }

    #[test]
    fn test_today_stats_empty_day() {
        let (store, _) = store_with(small_bank());
        let stats = store.today_stats_at(now());
        assert_eq!(stats, DailyStats::new("2026-04-15"));
        assert_eq!(store.today_key_at(now()), "2026-04-15");
        assert_eq!(store.overall_stats().accuracy_percent, 0);
    }

    #[test]
    fn test_recent_stats_bounded() {
        let (store, _) = store_with(small_bank());
        let long = store.recent_daily_stats_at(u32::MAX, now());
        assert_eq!(long.len(), MAX_RECENT_DAYS as usize);
        assert_eq!(long.last().unwrap().date, "2026-04-15");

        // stops at the start of the representable range instead of panicking
        let edge = DateTime::<Utc>::MIN_UTC + Duration::days(3);
        let short = store.recent_daily_stats_at(10, edge);
        assert_eq!(short.len(), 4);
        assert_eq!(short[3].date, store.today_key_at(edge));
    }

    #[test]
    fn test_local_day_boundary_drives_keys_and_due() {
        use chrono::{Local, NaiveTime};

        let (store, _) = store_with(small_bank());
        let mut store = store.with_day_boundary(DayBoundary::Local);
        let ts = now();
        let local_day = ts.with_timezone(&Local).date_naive();

        assert_eq!(store.today_key_at(ts), local_day.format("%Y-%m-%d").to_string());
        assert_eq!(DayBoundary::Local.date_of(ts), local_day);
        assert_eq!(DayBoundary::Utc.date_key(ts), "2026-04-15");

        store.update_word_progress_at("ai", true, ts);
        assert!(store.snapshot().daily_stats.contains_key(&store.today_key_at(ts)));

        let local_instant = |day: chrono::NaiveDate, time: NaiveTime| {
            day.and_time(time)
                .and_local_timezone(Local)
                .earliest()
                .unwrap()
                .with_timezone(&Utc)
        };
        let end_of_day = local_instant(local_day, NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        let next_morning = local_instant(
            local_day.succ_opt().unwrap(),
            NaiveTime::from_hms_opt(0, 0, 1).unwrap(),
        );

        assert!(store.words_to_review_at(end_of_day).is_empty());
        assert_eq!(store.words_to_review_at(next_morning), vec!["ai"]);
        assert_eq!(
            DayBoundary::Local.date_of(next_morning),
            DayBoundary::Local.date_of(store.word_progress("ai").unwrap().next_review)
        );
    }
}
