use std::sync::Arc;

use clap::Parser;
use exam_core::model::{StudentId, TestId};
use services::{AttemptRunner, AttemptService, AttemptView, Clock, PortalConfig};
use storage::{AssessmentStore, HttpAssessmentStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod input;
mod render;

use input::{Input, parse_line};

/// Take a timed test from the exam portal in the terminal.
#[derive(Parser, Debug)]
#[command(name = "exam-portal", version, about, long_about = None)]
struct Cli {
    /// Test to take.
    #[arg(long)]
    test: String,

    /// Student taking the test (falls back to EXAM_STUDENT_ID).
    #[arg(long)]
    student: Option<String>,

    /// REST base URL (falls back to EXAM_API_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token (falls back to EXAM_API_TOKEN).
    #[arg(long)]
    token: Option<String>,

    /// Log filter, overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug)]
struct MissingStudent;

impl std::fmt::Display for MissingStudent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("no student id: pass --student or set EXAM_STUDENT_ID")
    }
}

impl std::error::Error for MissingStudent {}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn resolve_config(cli: &Cli) -> Result<(PortalConfig, StudentId), Box<dyn std::error::Error>> {
    let mut config = PortalConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(token) = &cli.token {
        config.api_token = Some(token.clone());
    }
    if let Some(student) = &cli.student {
        config.student_id = Some(StudentId::new(student.clone()));
    }
    let student = config.student_id.clone().ok_or(MissingStudent)?;
    Ok((config, student))
}

/// Print each snapshot that changed beyond the countdown, plus the one-minute
/// and ten-second warnings, until the runner goes away.
async fn render_views<F>(mut views: watch::Receiver<AttemptView>, mut draw: F)
where
    F: FnMut(&AttemptView),
{
    let mut shown: Option<AttemptView> = None;
    loop {
        let view = views.borrow_and_update().clone();
        if should_redraw(shown.as_ref(), &view) {
            draw(&view);
            shown = Some(view);
        }
        if views.changed().await.is_err() {
            break;
        }
    }
    let last = views.borrow().clone();
    if should_redraw(shown.as_ref(), &last) {
        draw(&last);
    }
}

fn should_redraw(shown: Option<&AttemptView>, view: &AttemptView) -> bool {
    let warn_now = matches!(view.remaining_secs, 60 | 10) && view.phase.accepts_input();
    shown.is_none_or(|s| view.differs_beyond_countdown(s) || (warn_now && s != view))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let (config, student) = resolve_config(&cli)?;

    let http = Arc::new(HttpAssessmentStore::new(config.http_store())?);
    let store: Arc<dyn AssessmentStore> = http.clone();
    let service = AttemptService::new(Clock::default(), store);

    // A failed load leaves nothing behind; re-running the command is the retry.
    let controller = service.load_test(student, &TestId::new(cli.test)).await?;
    let (runner, handle) = AttemptRunner::new(controller, config.tick_every);

    let renderer = tokio::spawn(render_views(handle.subscribe(), render::print_view));

    let mut task = tokio::spawn(runner.run());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", render::HELP);

    let controller = loop {
        tokio::select! {
            finished = &mut task => break finished?,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    drop(handle);
                    break task.await?;
                };
                let options = handle.view().question.options;
                match parse_line(&line, &options) {
                    Input::Command(command) => {
                        let _ = handle.send(command).await;
                    }
                    Input::Token(token) => {
                        http.set_bearer_token(token);
                        println!("Session token updated. Enter `s` to submit.");
                    }
                    Input::Help => println!("{}", render::HELP),
                    Input::Quit => {
                        drop(handle);
                        break task.await?;
                    }
                    Input::Unknown(raw) => println!("unknown input: {raw:?} (h for help)"),
                }
            }
        }
    };

    // The runner dropped its sender on return, so this ends once the final
    // snapshot has been printed.
    renderer.await?;
    if !controller.phase().is_terminal() {
        warn!(
            test_id = %controller.test().id(),
            answered = controller.answers().len(),
            "left the test before it was submitted"
        );
        println!("You left before submitting; this attempt was not saved.");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
