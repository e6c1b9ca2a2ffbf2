//! Multiple-choice questions
//!
//! Turns a word id into a question with one correct option and a set of
//! distractors drawn from the word bank.
//!
//! Distractor selection:
//! 1. hanzi and pinyin answers only take candidates with the same number
//!    of characters as the target (a syllable-count proxy); meanings don't
//! 2. candidates from the target's level and from every other level are
//!    pooled and shuffled
//! 3. values equal to the correct answer, or already chosen, are skipped
//! 4. if that runs short, the length restriction is dropped and any other
//!    word may fill the remaining slots

pub mod session;

pub use session::{AnswerFeedback, AnswerOutcome, Haptic, NoFeedback, QuizSession, QuizSummary};

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::words::{Word, WordBank};

pub const DEFAULT_OPTION_COUNT: usize = 4;

// ============================================================
// Types
// ============================================================

/// What is shown and what is asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    HanziToMeaning,
    MeaningToHanzi,
    HanziToPinyin,
}

impl QuizType {
    pub const ALL: [QuizType; 3] = [
        QuizType::HanziToMeaning,
        QuizType::MeaningToHanzi,
        QuizType::HanziToPinyin,
    ];

    /// Field the options are drawn from
    pub fn target_field(self) -> WordField {
        match self {
            Self::HanziToMeaning => WordField::Meaning,
            Self::MeaningToHanzi => WordField::Hanzi,
            Self::HanziToPinyin => WordField::Pinyin,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::HanziToMeaning => "Hanzi → Meaning",
            Self::MeaningToHanzi => "Meaning → Hanzi",
            Self::HanziToPinyin => "Hanzi → Pinyin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordField {
    Hanzi,
    Pinyin,
    Meaning,
}

impl WordField {
    pub fn value(self, word: &Word) -> &str {
        match self {
            Self::Hanzi => &word.hanzi,
            Self::Pinyin => &word.pinyin,
            Self::Meaning => &word.meaning,
        }
    }

    /// Whether distractors should match the target's character count
    pub fn is_length_sensitive(self) -> bool {
        matches!(self, Self::Hanzi | Self::Pinyin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub word: Word,
    pub quiz_type: QuizType,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl QuizQuestion {
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_index]
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_index
    }
}

/// Prompt line for a question
pub fn question_text(question: &QuizQuestion) -> String {
    let word = &question.word;
    match question.quiz_type {
        QuizType::HanziToMeaning => format!("What does \"{}\" mean?", word.hanzi),
        QuizType::MeaningToHanzi => format!("Which hanzi means \"{}\"?", word.meaning),
        QuizType::HanziToPinyin => format!("What is the pinyin of \"{}\"?", word.hanzi),
    }
}

/// The big glyph or phrase shown above the options
pub fn question_display(question: &QuizQuestion) -> &str {
    match question.quiz_type {
        QuizType::HanziToMeaning | QuizType::HanziToPinyin => &question.word.hanzi,
        QuizType::MeaningToHanzi => &question.word.meaning,
    }
}

// ============================================================
// QuestionGenerator
// ============================================================

pub struct QuestionGenerator {
    bank: Arc<WordBank>,
    option_count: usize,
    rng: ChaCha8Rng,
}

impl QuestionGenerator {
    pub fn new(bank: Arc<WordBank>) -> Self {
        Self {
            bank,
            option_count: DEFAULT_OPTION_COUNT,
            rng: ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Options per question, at least 2
    pub fn with_option_count(mut self, option_count: usize) -> Self {
        self.option_count = option_count.max(2);
        self
    }

    /// Fixes the random seed (for testing)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn option_count(&self) -> usize {
        self.option_count
    }

    /// `None` if `word_id` is not in the bank
    pub fn generate_question(&mut self, word_id: &str, quiz_type: QuizType) -> Option<QuizQuestion> {
        let word = self.bank.get_by_id(word_id)?;
        let (options, correct_index) = pick_options(
            &self.bank,
            word,
            quiz_type.target_field(),
            self.option_count,
            &mut self.rng,
        );

        Some(QuizQuestion {
            word: word.clone(),
            quiz_type,
            options,
            correct_index,
        })
    }

    /// One question per resolvable id, each with a random type
    pub fn generate_questions<S: AsRef<str>>(&mut self, word_ids: &[S]) -> Vec<QuizQuestion> {
        word_ids
            .iter()
            .filter_map(|id| {
                let quiz_type = QuizType::ALL[self.rng.random_range(0..QuizType::ALL.len())];
                let question = self.generate_question(id.as_ref(), quiz_type);
                if question.is_none() {
                    tracing::debug!(word_id = id.as_ref(), "skipping unknown word");
                }
                question
            })
            .collect()
    }
}

/// Builds the shuffled option list; returns it with the correct index
fn pick_options<R: Rng + ?Sized>(
    bank: &WordBank,
    target: &Word,
    field: WordField,
    option_count: usize,
    rng: &mut R,
) -> (Vec<String>, usize) {
    let correct = field.value(target);
    let needed = option_count.saturating_sub(1);
    let target_len = target.char_count();
    let length_filter = field.is_length_sensitive();

    let eligible = |w: &&Word| {
        w.id != target.id && (!length_filter || w.char_count() == target_len)
    };
    let same_level = bank
        .get_by_level(target.level)
        .into_iter()
        .filter(eligible);
    let other_levels = bank
        .all()
        .iter()
        .filter(|w| w.level != target.level)
        .filter(eligible);

    let mut candidates: Vec<&Word> = same_level.chain(other_levels).collect();
    candidates.shuffle(rng);

    let mut seen: HashSet<&str> = HashSet::from([correct]);
    let mut distractors: Vec<&str> = Vec::with_capacity(needed);
    take_distinct(&candidates, field, needed, &mut seen, &mut distractors);

    if distractors.len() < needed {
        let mut fallback: Vec<&Word> = bank.all().iter().filter(|w| w.id != target.id).collect();
        fallback.shuffle(rng);
        take_distinct(&fallback, field, needed, &mut seen, &mut distractors);
    }

    let mut options: Vec<String> = std::iter::once(correct)
        .chain(distractors)
        .map(str::to_string)
        .collect();
    options.shuffle(rng);

    let correct_index = options.iter().position(|o| o == correct).unwrap_or(0);
    (options, correct_index)
}

fn take_distinct<'a>(
    pool: &[&'a Word],
    field: WordField,
    needed: usize,
    seen: &mut HashSet<&'a str>,
    out: &mut Vec<&'a str>,
) {
    for word in pool {
        if out.len() >= needed {
            break;
        }
        let value = field.value(word);
        if seen.insert(value) {
            out.push(value);
        }
    }
}

// ============================================================
// Tests
// ============================================================
