mod controller;
mod progress;
mod runner;
mod view;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptError;
pub use controller::{AttemptController, PendingSubmission, SubmissionReceipt, SubmitOutcome};
pub use progress::AttemptProgress;
pub use runner::{AttemptCommand, AttemptHandle, AttemptRunner};
pub use view::{AttemptView, QuestionView};
pub use workflow::AttemptService;
