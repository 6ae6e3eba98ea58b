mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;
use viva_core::capture::{AnswerCapture, TranscriptBuffer};
use viva_core::interviewer::{
    Evaluator, HeuristicEvaluator, InterviewerClient, OfflineQuestionSource, QuestionSource,
    ReportSynthesizer,
};
use viva_core::project::Project;
use viva_core::report::{Report, RuleBasedSynthesizer};
use viva_core::session::{Session, SessionOrchestrator, SubmitOutcome};
use viva_core::timer::TimerExpired;
use viva_core::Command;

#[derive(Parser)]
#[command(name = "viva", about = "Timed, project-scoped mock interview driven by a resume")]
struct Cli {
    /// Plain-text resume to interview against
    resume: PathBuf,
    /// Run without OpenAI: generic questions, rule-based scoring and report
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 2. Load Configuration ---
    let config =
        Config::from_env(args.offline).context("Failed to load application configuration")?;

    // --- 3. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded. Starting interview service...");

    let resume_text = std::fs::read_to_string(&args.resume)
        .with_context(|| format!("Failed to read resume from {}", args.resume.display()))?;

    // --- 4. Wire Capabilities ---
    let questions: Arc<dyn QuestionSource>;
    let evaluator: Arc<dyn Evaluator>;
    let synthesizer: Arc<dyn ReportSynthesizer>;
    let mut extraction_client: Option<Arc<InterviewerClient>> = None;

    if args.offline {
        tracing::info!("Running offline: generic questions and rule-based scoring");
        questions = Arc::new(OfflineQuestionSource);
        evaluator = Arc::new(HeuristicEvaluator);
        synthesizer = Arc::new(RuleBasedSynthesizer);
    } else {
        let api_key = config
            .openai_api_key
            .clone()
            .context("OPENAI_API_KEY is required for online runs")?;
        let client = Arc::new(InterviewerClient::new(api_key, config.chat_model.clone()));
        questions = client.clone();
        evaluator = client.clone();
        synthesizer = client.clone();
        extraction_client = Some(client);
    }

    // --- 5. Extract Projects ---
    let projects: Vec<Project> = match &extraction_client {
        Some(client) => match client.extract_projects(&resume_text).await {
            Ok(projects) => {
                tracing::info!(count = projects.len(), "extracted projects from resume");
                projects
            }
            Err(error) => {
                tracing::warn!(%error, "project extraction failed; using placeholder project");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    // --- 6. Build the Session ---
    let session = Session::new(resume_text, projects)?;
    for project in session.projects() {
        tracing::info!(project = %project.name, "interview will cover");
    }

    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);
    let (timer_tx, mut timer_rx) = mpsc::channel::<TimerExpired>(8);
    let capture = TranscriptBuffer::new();
    let mut orchestrator = SessionOrchestrator::new(
        session,
        questions,
        evaluator,
        synthesizer,
        Arc::new(capture.clone()),
        command_tx,
        timer_tx,
        Duration::from_secs(config.answer_seconds),
    );

    println!(
        "Speak your answers by typing; each line extends your transcript. \
         Submit with an empty line. You have {}s per question.",
        config.answer_seconds
    );

    orchestrator.start_interview().await?;

    // --- 7. Event Loop ---
    // One serialized mutation point: commands from the orchestrator, timer
    // expiries, and stdin all land here, and every submit funnels through
    // the orchestrator's single submit path.
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(command) = command_rx.recv() => match command {
                Command::PresentQuestion(question) => {
                    let number = orchestrator.evaluations().len() + 1;
                    let budget = orchestrator.session().total_question_budget();
                    println!("\nQuestion {number}/{budget}: {question}");
                    println!("({}s on the clock)", orchestrator.time_remaining_seconds());
                }
                Command::SessionComplete(message) => {
                    println!("\n{message}");
                    break;
                }
            },
            Some(expired) = timer_rx.recv() => {
                if let SubmitOutcome::Recorded { evaluation, .. } =
                    orchestrator.handle_timeout(expired).await
                {
                    println!("\nTime is up; submitted what you had so far.");
                    println!("Recorded ({}): {}", evaluation.score, evaluation.reasoning);
                }
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        let answer = capture.transcript();
                        if let SubmitOutcome::Recorded { evaluation, .. } =
                            orchestrator.submit_answer(&answer).await
                        {
                            println!("Recorded ({}): {}", evaluation.score, evaluation.reasoning);
                        }
                    } else {
                        capture.push_segment(&line);
                    }
                }
                Ok(None) => {
                    // EOF: submit the transcript in hand; any remaining
                    // questions resolve through their timers.
                    tracing::info!("stdin closed; remaining questions auto-submit on timeout");
                    stdin_open = false;
                    let answer = capture.transcript();
                    orchestrator.submit_answer(&answer).await;
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to read stdin; disabling manual input");
                    stdin_open = false;
                }
            },
            else => break,
        }
    }

    // --- 8. Final Report ---
    let report = orchestrator.generate_report().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    println!("\nFinal Interview Report");
    println!("Verdict: {}", report.verdict);
    println!("{}", report.summary);
    println!("\nStrengths:");
    for strength in &report.strengths {
        println!("  - {strength}");
    }
    println!("\nGaps:");
    for gap in &report.gaps {
        println!("  - {gap}");
    }
}
