use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{WordProgress, MAX_SRS_LEVEL};

/// Days until the next review, indexed by SRS level
pub const SRS_INTERVALS: [i64; MAX_SRS_LEVEL as usize + 1] = [0, 1, 3, 7, 14, 30];

pub fn interval_days(level: u8) -> i64 {
    SRS_INTERVALS[usize::from(level.min(MAX_SRS_LEVEL))]
}

/// Which calendar decides where a day ends
///
/// Used for both daily-stats keys and due-date comparison so the two can
/// never disagree by a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    #[default]
    Utc,
    Local,
}

impl DayBoundary {
    pub fn date_of(self, ts: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Utc => ts.date_naive(),
            Self::Local => ts.with_timezone(&Local).date_naive(),
        }
    }

    /// `YYYY-MM-DD` key of the day containing `ts`
    pub fn date_key(self, ts: DateTime<Utc>) -> String {
        self.date_of(ts).format("%Y-%m-%d").to_string()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Some(Self::Utc),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Whether an answer counts as learning a new word rather than a review
///
/// Decided from the state before the answer is applied.
pub fn is_new_learning(existing: Option<&WordProgress>) -> bool {
    existing.map_or(true, |wp| wp.level == 0)
}

/// Applies one answer to a word's SRS state
///
/// A correct answer climbs one tier (a word without a record lands on tier 1)
/// and is capped at [`MAX_SRS_LEVEL`]. A wrong answer always drops to tier 1,
/// never 0. Counters only ever grow.
pub fn apply_answer(
    existing: Option<&WordProgress>,
    word_id: &str,
    correct: bool,
    now: DateTime<Utc>,
) -> WordProgress {
    let correct_count = existing.map_or(0, |wp| wp.correct_count);
    let wrong_count = existing.map_or(0, |wp| wp.wrong_count);

    if correct {
        let level = match existing {
            Some(wp) => (wp.level + 1).min(MAX_SRS_LEVEL),
            None => 1,
        };
        WordProgress {
            word_id: word_id.to_string(),
            level,
            correct_count: correct_count.saturating_add(1),
            wrong_count,
            next_review: now + Duration::days(interval_days(level)),
            last_review: Some(now),
            mastered: level == MAX_SRS_LEVEL,
        }
    } else {
        WordProgress {
            word_id: word_id.to_string(),
            level: 1,
            correct_count,
            wrong_count: wrong_count.saturating_add(1),
            next_review: now + Duration::days(1),
            last_review: Some(now),
            mastered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_first_correct_lands_on_tier_one() {
        let wp = apply_answer(None, "w", true, now());
        assert_eq!(wp.level, 1);
        assert_eq!(wp.correct_count, 1);
        assert_eq!(wp.wrong_count, 0);
        assert!(!wp.mastered);
        assert_eq!(wp.next_review, now() + Duration::days(1));
    }

    #[test]
    fn test_first_wrong_lands_on_tier_one() {
        let wp = apply_answer(None, "w", false, now());
        assert_eq!(wp.level, 1);
        assert_eq!(wp.wrong_count, 1);
        assert_eq!(wp.correct_count, 0);
    }

    #[test]
    fn test_interval_table_followed() {
        let mut wp = apply_answer(None, "w", true, now());
        for (expected_level, days) in [(2u8, 3i64), (3, 7), (4, 14), (5, 30)] {
            wp = apply_answer(Some(&wp), "w", true, now());
            assert_eq!(wp.level, expected_level);
            assert_eq!(wp.next_review, now() + Duration::days(days));
        }
        assert!(wp.mastered);
    }

    #[test]
    fn test_top_tier_clamped() {
        let mut wp = apply_answer(None, "w", true, now());
        wp.level = MAX_SRS_LEVEL;
        let next = apply_answer(Some(&wp), "w", true, now());
        assert_eq!(next.level, MAX_SRS_LEVEL);
        assert!(next.mastered);
        assert_eq!(next.next_review, now() + Duration::days(30));
    }

    #[test]
    fn test_wrong_resets_and_unmasters() {
        let mut wp = apply_answer(None, "w", true, now());
        wp.level = MAX_SRS_LEVEL;
        wp.mastered = true;
        wp.correct_count = 7;
        let next = apply_answer(Some(&wp), "w", false, now());
        assert_eq!(next.level, 1);
        assert!(!next.mastered);
        assert_eq!(next.correct_count, 7);
        assert_eq!(next.wrong_count, 1);
    }

    #[test]
    fn test_new_learning_classification() {
        assert!(is_new_learning(None));
        let mut wp = apply_answer(None, "w", true, now());
        assert!(!is_new_learning(Some(&wp)));
        wp.level = 0;
        assert!(is_new_learning(Some(&wp)));
    }

    #[test]
    fn test_day_boundary_utc_key() {
        let late = Utc.with_ymd_and_hms(2026, 5, 10, 23, 59, 59).unwrap();
        assert_eq!(DayBoundary::Utc.date_key(late), "2026-05-10");
        assert_eq!(DayBoundary::parse(" LOCAL "), Some(DayBoundary::Local));
        assert_eq!(DayBoundary::parse("mars"), None);
    }
}
