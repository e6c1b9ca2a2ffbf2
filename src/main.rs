use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use hsk_srs::config::Config;
use hsk_srs::logging;
use hsk_srs::quiz::{question_display, question_text};
use hsk_srs::{
    AnswerFeedback, FileStore, Haptic, HskLevel, Persister, ProgressStore, QuestionGenerator,
    QuizSession, WordBank,
};

/// Terminal stand-in for speech and vibration
struct TerminalFeedback;

impl AnswerFeedback for TerminalFeedback {
    fn speak(&self, hanzi: &str) {
        tracing::debug!(%hanzi, "speak");
    }

    fn haptic(&self, kind: Haptic) {
        if kind == Haptic::Error {
            // terminal bell
            eprint!("\x07");
        }
    }
}

#[derive(Parser)]
#[command(name = "hsk-quiz", about = "HSK vocabulary quiz with spaced repetition", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Run one quiz session (default)
    Quiz,

    /// Show today's, this week's and per-level progress
    Stats,

    /// List the words answered wrong most often
    Wrong,

    /// Clear word progress and daily stats; settings and exclusions stay
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config);

    let command = cli.command.unwrap_or(Command::Quiz);

    let bank = load_word_bank(&config);
    let persister = Persister::spawn_with_key(
        Arc::new(FileStore::new(&config.data_dir)),
        &config.storage_key,
    );
    let mut store = ProgressStore::open(Arc::clone(&bank), persister)
        .await
        .with_day_boundary(config.day_boundary);

    tracing::info!(
        command = ?command,
        data_dir = %config.data_dir.display(),
        words = bank.total_count(),
        "hsk-quiz starting"
    );

    let result = match command {
        Command::Quiz => run_quiz(&mut store, bank, config.quiz_size),
        Command::Stats => print_stats(&store),
        Command::Wrong => print_wrong(&store),
        Command::Reset => {
            store.reset_all_progress();
            println!("All progress cleared.");
            Ok(())
        }
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "terminal I/O failed");
    }

    store.flush().await;
}

fn load_word_bank(config: &Config) -> Arc<WordBank> {
    match &config.word_bank_path {
        Some(path) => match WordBank::from_path(path) {
            Ok(bank) => Arc::new(bank),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "custom word bank unusable, using builtin"
                );
                WordBank::global()
            }
        },
        None => WordBank::global(),
    }
}

fn run_quiz(store: &mut ProgressStore, bank: Arc<WordBank>, size: usize) -> io::Result<()> {
    let mut generator = QuestionGenerator::new(bank);
    let mut session = QuizSession::start(store, &mut generator, size);
    if session.is_empty() {
        println!("Nothing to study: every word at the selected levels is learned or excluded.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut stdout = io::stdout();
    let show_pinyin = store.settings().show_pinyin;

    while let Some(question) = session.current().cloned() {
        println!();
        println!(
            "[{}/{}] {}  ({})",
            session.position() + 1,
            session.len(),
            question.quiz_type.name(),
            question.word.level
        );
        println!("{}", question_text(&question));
        println!("    {}", question_display(&question));
        for (idx, option) in question.options.iter().enumerate() {
            println!("  {}. {}", idx + 1, option);
        }

        let choice = loop {
            print!("> ");
            stdout.flush()?;
            let Some(line) = lines.next() else {
                println!();
                tracing::info!(answered = session.position(), "quiz abandoned");
                return Ok(());
            };
            match line?.trim().parse::<usize>() {
                Ok(n) if (1..=question.options.len()).contains(&n) => break n - 1,
                _ => println!("Enter a number from 1 to {}", question.options.len()),
            }
        };

        if let Some(outcome) = session.answer(choice, store, &TerminalFeedback) {
            if outcome.correct {
                println!("Correct!");
            } else {
                println!("Wrong. Answer: {}", question.correct_answer());
            }
            let word = &question.word;
            if show_pinyin {
                println!("  {} [{}] {}", word.hanzi, word.pinyin, word.meaning);
            } else {
                println!("  {} {}", word.hanzi, word.meaning);
            }
            if let Some(example) = &word.example {
                println!("  {}", example.sentence);
                if show_pinyin {
                    println!("  {}", example.pinyin);
                }
                println!("  {}", example.meaning);
            }
        }
        session.advance();
    }

    let summary = session.summary();
    println!();
    println!(
        "Done: {}/{} correct ({}%)",
        summary.correct, summary.total, summary.accuracy_percent
    );
    Ok(())
}

fn print_stats(store: &ProgressStore) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let today = store.today_stats();
    let goal = store.settings().daily_goal;

    writeln!(out, "Today ({})", today.date)?;
    writeln!(
        out,
        "  answered {}/{}  correct {}  new {}  reviewed {}",
        today.questions_answered,
        goal,
        today.correct_answers,
        today.new_words_learned,
        today.words_reviewed
    )?;

    writeln!(out, "Last 7 days")?;
    for day in store.recent_daily_stats(7) {
        writeln!(
            out,
            "  {}  {:>3} answered  {:>3} correct",
            day.date, day.questions_answered, day.correct_answers
        )?;
    }

    writeln!(out, "Levels")?;
    for level in HskLevel::all() {
        let stats = store.level_stats(level);
        if stats.total_words == 0 {
            continue;
        }
        let marker = if store.settings().is_level_selected(level) { "*" } else { " " };
        writeln!(
            out,
            " {marker}{}  learned {}/{}  mastered {}",
            level, stats.learned_words, stats.total_words, stats.mastered_words
        )?;
    }

    let overall = store.overall_stats();
    writeln!(
        out,
        "Overall: {} tracked, {} mastered, {} answered, {}% accuracy",
        overall.words_tracked,
        overall.words_mastered,
        overall.total_questions,
        overall.accuracy_percent
    )?;
    Ok(())
}

fn print_wrong(store: &ProgressStore) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let wrong = store.most_wrong_words();
    if wrong.is_empty() {
        writeln!(out, "No mistakes yet.")?;
        return Ok(());
    }
    for wp in wrong {
        let Some(word) = store.bank().get_by_id(&wp.word_id) else {
            continue;
        };
        writeln!(
            out,
            "{:>3} wrong  {:>3} right  {} [{}] {}",
            wp.wrong_count, wp.correct_count, word.hanzi, word.pinyin, word.meaning
        )?;
    }
    Ok(())
}
