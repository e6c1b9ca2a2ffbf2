//! One sitting of questions
//!
//! Drives a batch of questions, reports each answer to the progress store
//! exactly once, and fires best-effort feedback (speech, haptics) whose
//! outcome the session never looks at.

use serde::{Deserialize, Serialize};

use crate::progress::ProgressStore;
use crate::storage::WordProgress;

use super::{QuestionGenerator, QuizQuestion};

/// Questions per session unless configured otherwise
pub const DEFAULT_QUIZ_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haptic {
    Success,
    Error,
}

/// Side-effect hooks invoked on answers; all fire-and-forget
pub trait AnswerFeedback {
    /// Pronounce `hanzi`
    fn speak(&self, _hanzi: &str) {}

    fn haptic(&self, _kind: Haptic) {}
}

/// Feedback that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl AnswerFeedback for NoFeedback {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_index: usize,
    pub progress: Option<WordProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub wrong: usize,
    pub accuracy_percent: u32,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    selected: Option<usize>,
    answered_count: usize,
    correct_count: usize,
    complete: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let complete = questions.is_empty();
        Self {
            questions,
            current: 0,
            selected: None,
            answered_count: 0,
            correct_count: 0,
            complete,
        }
    }

    /// Picks `size` words from the store and turns them into questions
    pub fn start(store: &mut ProgressStore, generator: &mut QuestionGenerator, size: usize) -> Self {
        let word_ids = store.quiz_words(size);
        let questions = generator.generate_questions(&word_ids);
        tracing::info!(requested = size, questions = questions.len(), "quiz session started");
        Self::new(questions)
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Zero-based position of the current question
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&QuizQuestion> {
        if self.complete {
            return None;
        }
        self.questions.get(self.current)
    }

    /// Option picked for the current question, if answered
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Answers the current question
    ///
    /// Returns `None` when there is no current question or it was already
    /// answered; the store is only updated on the first answer.
    pub fn answer(
        &mut self,
        option_index: usize,
        store: &mut ProgressStore,
        feedback: &dyn AnswerFeedback,
    ) -> Option<AnswerOutcome> {
        if self.selected.is_some() {
            return None;
        }
        let question = self.current()?;
        let correct = question.is_correct(option_index);
        let correct_index = question.correct_index;
        let word_id = question.word.id.clone();
        let hanzi = question.word.hanzi.clone();

        self.selected = Some(option_index);
        self.answered_count += 1;
        if correct {
            self.correct_count += 1;
        }

        let settings = store.settings();
        if settings.vibration_enabled {
            feedback.haptic(if correct { Haptic::Success } else { Haptic::Error });
        }
        if correct && settings.sound_enabled {
            feedback.speak(&hanzi);
        }

        let progress = store.update_word_progress(&word_id, correct);
        Some(AnswerOutcome {
            correct,
            correct_index,
            progress,
        })
    }

    /// Moves past an answered question; returns `false` if the current
    /// question is unanswered or the session is over
    pub fn advance(&mut self) -> bool {
        if self.complete || self.selected.is_none() {
            return false;
        }
        self.selected = None;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        } else {
            self.complete = true;
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Results so far; unanswered questions count as neither right nor wrong
    pub fn summary(&self) -> QuizSummary {
        let answered = self.answered_count;
        let accuracy_percent = if answered > 0 {
            ((self.correct_count as f64 / answered as f64) * 100.0).round() as u32
        } else {
            0
        };
        QuizSummary {
            total: self.questions.len(),
            answered,
            correct: self.correct_count,
            wrong: answered - self.correct_count,
            accuracy_percent,
        }
    }
}
