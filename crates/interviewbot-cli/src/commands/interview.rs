//! The `interviewbot interview` command.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use interviewbot_core::engine::{InterviewEngine, SessionContext};
use interviewbot_core::model::{Question, QuestionCount};
use interviewbot_core::report::{PersistStatus, SessionOutcome};
use interviewbot_core::scoring::PolicyKind;
use interviewbot_core::supplier::QuestionSupplier;
use interviewbot_core::traits::LlmProvider;
use interviewbot_providers::config::{load_config_from, ScoringConfig};
use interviewbot_providers::{create_provider, InterviewConfig};

use super::open_configured_store;

/// Answers that end the interview early.
const QUIT_WORDS: [&str; 3] = ["quit", "exit", "stop"];

pub struct InterviewArgs {
    pub candidate: Option<String>,
    pub questions: i64,
    pub policy: Option<PolicyKind>,
    pub threshold: Option<f64>,
    pub database: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub no_generate: bool,
    pub transcript: Option<PathBuf>,
    pub markdown: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: InterviewArgs) -> Result<()> {
    let count = QuestionCount::new(args.questions)?;
    if let Some(t) = args.threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&t),
            "threshold must be between 0.0 and 1.0"
        );
    }

    let config = load_config_from(args.config.as_deref())?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let candidate = match args.candidate {
        Some(name) => name,
        None => prompt(&mut input, &mut output, "Enter your name: ")?.unwrap_or_default(),
    };

    let store = open_configured_store(&config, args.database.as_deref()).await?;
    let generator = if args.no_generate {
        None
    } else {
        build_generator(&config, args.provider.as_deref())
    };

    let supplier = QuestionSupplier::new(
        store.clone(),
        generator,
        config.generation_settings(args.model.as_deref()),
    );
    let scoring = ScoringConfig {
        policy: args.policy.unwrap_or(config.scoring.policy),
        threshold: args.threshold.unwrap_or(config.scoring.threshold),
    };
    let engine = InterviewEngine::new(supplier, store, scoring.build());

    let ctx = engine.start(&candidate, count).await?;
    if ctx.supply.is_degraded() {
        eprintln!(
            "Warning: could not top up the question bank ({:?}).",
            ctx.supply.status
        );
    }
    if ctx.questions.is_empty() {
        anyhow::bail!("no questions available. Seed some with `interviewbot seed --bank <path>`");
    }
    if ctx.is_short() {
        eprintln!(
            "Warning: only {} of {} requested questions are available.",
            ctx.questions.len(),
            count
        );
    }

    writeln!(
        output,
        "\nWelcome, {}! You will be asked {} questions. Type 'quit' to stop early.\n",
        ctx.candidate,
        ctx.questions.len()
    )?;
    let answers = collect_answers(&ctx, &mut input, &mut output)?;

    let outcome = engine.finish(&ctx, &answers).await?;
    print_outcome(&outcome, &mut output)?;

    if let Some(path) = &args.transcript {
        outcome.save_json(path)?;
        eprintln!("Transcript saved to: {}", path.display());
    }
    if let Some(path) = &args.markdown {
        std::fs::write(path, outcome.to_markdown())
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        eprintln!("Summary saved to: {}", path.display());
    }

    Ok(())
}

fn build_generator(config: &InterviewConfig, name: Option<&str>) -> Option<Arc<dyn LlmProvider>> {
    let name = name.unwrap_or(&config.default_provider);
    let Some(provider_config) = config.provider_config(name) else {
        warn!(provider = name, "provider not found in config, question generation disabled");
        return None;
    };
    match create_provider(&provider_config) {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!(provider = name, "question generation disabled: {e:#}");
            None
        }
    }
}

/// Print `text` and read one line without its terminator. `None` on end of
/// input. Other whitespace is kept since it counts toward similarity.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> Result<Option<String>> {
    write!(output, "{text}")?;
    output.flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read answer")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn is_quit_word(answer: &str) -> bool {
    let answer = answer.trim();
    QUIT_WORDS.iter().any(|w| answer.eq_ignore_ascii_case(w))
}

/// Ask each question in turn. Stops at a quit word or end of input, so the
/// result may be shorter than the question list.
pub fn collect_answers<R: BufRead, W: Write>(
    ctx: &SessionContext,
    input: &mut R,
    output: &mut W,
) -> Result<Vec<String>> {
    let total = ctx.questions.len();
    let mut answers = Vec::with_capacity(total);

    for (i, Question { question, .. }) in ctx.questions.iter().enumerate() {
        writeln!(output, "Question {}/{}: {}", i + 1, total, question)?;
        match prompt(input, output, "Your answer: ")? {
            Some(answer) if is_quit_word(&answer) => {
                writeln!(output, "Ending the interview early.")?;
                break;
            }
            Some(answer) => answers.push(answer),
            None => break,
        }
        writeln!(output)?;
    }

    Ok(answers)
}

fn print_outcome<W: Write>(outcome: &SessionOutcome, output: &mut W) -> Result<()> {
    writeln!(output, "\n--- Results for {} ---", outcome.candidate)?;
    for (i, r) in outcome.results.iter().enumerate() {
        writeln!(output, "{}. {}", i + 1, r.question)?;
        writeln!(output, "   Your answer: {}", r.response)?;
        writeln!(output, "   Expected:    {}", r.expected)?;
        writeln!(output, "   Result:      {}", r.evaluation)?;
    }

    let score = &outcome.score;
    writeln!(output, "\nScore: {}/{}", score.score, score.total)?;
    writeln!(output, "Feedback: {}", score.feedback)?;
    writeln!(
        output,
        "Eligibility: {}",
        if score.eligible {
            "Eligible"
        } else {
            "Not Eligible"
        }
    )?;

    match &outcome.persistence {
        PersistStatus::Saved => writeln!(output, "Your responses have been saved.")?,
        PersistStatus::Skipped => writeln!(output, "No answers given, nothing was saved.")?,
        PersistStatus::Failed(e) => eprintln!("Warning: results were not saved: {e}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use interviewbot_core::supplier::{EnsureOutcome, SupplyStatus};

    fn context(n: i64) -> SessionContext {
        SessionContext {
            id: uuid::Uuid::nil(),
            candidate: "Ada".into(),
            requested: QuestionCount::new(5).unwrap(),
            questions: (1..=n)
                .map(|id| Question {
                    id,
                    question: format!("Question {id}?"),
                    answer: format!("Answer {id}"),
                })
                .collect(),
            supply: EnsureOutcome {
                existing: n as u64,
                requested: 0,
                inserted: 0,
                status: SupplyStatus::Sufficient,
            },
            started_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn collects_one_answer_per_question() {
        let ctx = context(3);
        let mut input = io::Cursor::new("first\n  second  \r\n\n");
        let mut out = Vec::new();

        let answers = collect_answers(&ctx, &mut input, &mut out).unwrap();
        assert_eq!(answers, vec!["first", "  second  ", ""]);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Question 3/3: Question 3?"));
    }

    #[test]
    fn quit_word_stops_early() {
        let ctx = context(5);
        let mut input = io::Cursor::new("a stack\n  QUIT \nnever read\n");
        let mut out = Vec::new();

        let answers = collect_answers(&ctx, &mut input, &mut out).unwrap();
        assert_eq!(answers, vec!["a stack"]);
    }

    #[test]
    fn end_of_input_stops_early() {
        let ctx = context(5);
        let mut input = io::Cursor::new("only one\n");
        let mut out = Vec::new();

        assert_eq!(collect_answers(&ctx, &mut input, &mut out).unwrap().len(), 1);
    }

    #[test]
    fn answers_are_scored_as_typed() {
        let ctx = context(1);
        let mut input = io::Cursor::new("   abc   \n");
        let mut out = Vec::new();

        let answers = collect_answers(&ctx, &mut input, &mut out).unwrap();
        assert_eq!(answers, vec!["   abc   "]);

        let policy = PolicyKind::Similarity.build(0.6);
        assert!(!policy.is_correct(&answers[0], "abcdefg"));
        assert!(policy.is_correct("abc", "abcdefg"));
    }

    #[test]
    fn quit_words() {
        assert!(is_quit_word("exit"));
        assert!(is_quit_word("Stop"));
        assert!(!is_quit_word("stopwatch"));
        assert!(is_quit_word(" quit\t"));
        assert!(!is_quit_word(""));
    }
}
