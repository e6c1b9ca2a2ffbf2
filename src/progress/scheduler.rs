//! Review scheduling
//!
//! Chooses which words a quiz should ask: words whose review date has come
//! take priority, new words fill whatever room is left.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use super::ProgressStore;

impl ProgressStore {
    /// Ids of words due for review today
    pub fn words_to_review(&self) -> Vec<String> {
        self.words_to_review_at(Utc::now())
    }

    /// Due means: tracked, not mastered, above tier 0, not excluded, at a
    /// selected level, and scheduled on or before today (dates only).
    pub fn words_to_review_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let today = self.day_boundary.date_of(now);
        let settings = &self.state.settings;

        self.state
            .word_progress
            .values()
            .filter(|wp| !wp.mastered && wp.level > 0)
            .filter(|wp| !self.is_word_excluded(&wp.word_id))
            .filter(|wp| self.day_boundary.date_of(wp.next_review) <= today)
            .filter(|wp| {
                self.bank
                    .get_by_id(&wp.word_id)
                    .is_some_and(|word| settings.is_level_selected(word.level))
            })
            .map(|wp| wp.word_id.clone())
            .collect()
    }

    /// Up to `count` never-answered words from the selected levels, in
    /// random order
    pub fn new_words(&mut self, count: usize) -> Vec<String> {
        let settings = &self.state.settings;
        let mut candidates: Vec<String> = self
            .bank
            .all()
            .iter()
            .filter(|word| settings.is_level_selected(word.level))
            .filter(|word| !self.state.word_progress.contains_key(&word.id))
            .filter(|word| !self.state.excluded_words.contains(&word.id))
            .map(|word| word.id.clone())
            .collect();

        candidates.shuffle(&mut self.rng);
        candidates.truncate(count);
        candidates
    }

    /// A shuffled batch of at most `count` distinct ids
    pub fn quiz_words(&mut self, count: usize) -> Vec<String> {
        self.quiz_words_at(count, Utc::now())
    }

    pub fn quiz_words_at(&mut self, count: usize, now: DateTime<Utc>) -> Vec<String> {
        let mut batch = self.words_to_review_at(now);
        let review_count = batch.len();

        let needed = count.saturating_sub(review_count);
        if needed > 0 {
            batch.extend(self.new_words(needed));
        }

        batch.shuffle(&mut self.rng);
        batch.truncate(count);

        tracing::debug!(
            requested = count,
            review = review_count.min(count),
            total = batch.len(),
            "quiz batch assembled"
        );
        batch
    }
}
