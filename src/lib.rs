//! # hsk-srs - HSK vocabulary trainer core
//!
//! Spaced-repetition scheduling, progress persistence and multiple-choice
//! question generation for Chinese HSK vocabulary.
//!
//! ## Modules
//!
//! - [`words`] - read-only word catalog (HSK levels 1-3 compiled in)
//! - [`storage`] - persisted models, key-value stores and the write-behind persister
//! - [`progress`] - the progress store, SRS tier transitions and review scheduling
//! - [`quiz`] - question generation with distractors, and quiz sessions
//! - [`config`] - environment-driven configuration
//! - [`logging`] - tracing subscriber setup
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use hsk_srs::{MemoryStore, Persister, ProgressStore, QuestionGenerator, QuizSession, WordBank};
//!
//! let bank = WordBank::global();
//! let persister = Persister::inline(Arc::new(MemoryStore::new()));
//! let mut store = ProgressStore::load(bank.clone(), persister);
//! let mut generator = QuestionGenerator::new(bank);
//!
//! let session = QuizSession::start(&mut store, &mut generator, 10);
//! assert_eq!(session.len(), 10);
//! ```

pub mod config;
pub mod logging;
pub mod progress;
pub mod quiz;
pub mod storage;
pub mod words;

pub use config::Config;
pub use progress::{DayBoundary, LevelStats, OverallStats, ProgressStore};
pub use quiz::{
    AnswerFeedback, AnswerOutcome, Haptic, NoFeedback, QuestionGenerator, QuizQuestion,
    QuizSession, QuizSummary, QuizType,
};
pub use storage::{
    DailyCounter, DailyStats, FileStore, KeyValueStore, MemoryStore, PersistedState, Persister,
    Settings, SettingsPatch, StorageError, StorageResult, WordProgress,
};
pub use words::{Example, HskLevel, Word, WordBank, WordBankError};
