use exam_core::model::{AttemptPhase, SubmitFailure};
use services::AttemptView;

pub const HELP: &str = "\
  1..N      choose option
  n / p     next / previous question
  g <N>     go to question N
  f         flag question for review
  s         submit
  token <T> use a new session token after signing in again
  q         leave (unsubmitted answers are lost)";

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_remaining(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

pub fn print_view(view: &AttemptView) {
    let q = &view.question;
    println!();
    println!(
        "{}  [{}/{}]  answered {}/{}  time left {}{}",
        view.title,
        view.cursor + 1,
        view.progress.total,
        view.progress.answered,
        view.progress.total,
        format_remaining(view.remaining_secs),
        if q.flagged { "  (flagged)" } else { "" }
    );
    println!("{}", q.prompt);
    if let Some(image) = &q.image {
        println!("  image: {image}");
    }
    for (i, option) in q.options.iter().enumerate() {
        let marker = if q.selected.as_deref() == Some(option.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("  {marker} {}. {option}", i + 1);
    }
    print_phase(view);
}

fn print_phase(view: &AttemptView) {
    match view.phase {
        AttemptPhase::InProgress => {}
        AttemptPhase::Submitting => println!("Submitting..."),
        AttemptPhase::Failed => match view.last_failure {
            Some(SubmitFailure::AuthExpired) => println!(
                "Your session expired and the attempt is NOT saved yet. \
                 Sign in again, enter `token <T>`, then `s` to retry."
            ),
            _ => println!("Submission failed; your answers are kept. Enter `s` to retry."),
        },
        AttemptPhase::Submitted => {
            let detail = view
                .receipt
                .as_ref()
                .and_then(|r| r.result.score)
                .map(|score| format!(" Score: {score}."))
                .unwrap_or_default();
            println!("Attempt submitted.{detail}");
        }
    }
}
