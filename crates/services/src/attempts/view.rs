use exam_core::model::{AttemptPhase, QuestionId, SubmitFailure, TestId};

use super::controller::{AttemptController, SubmissionReceipt};
use super::progress::AttemptProgress;
use crate::error::AttemptError;

/// The question under the cursor, with the student's current choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub image: Option<String>,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub flagged: bool,
}

/// Presentation-agnostic snapshot of an attempt.
///
/// No pre-formatted strings; the UI decides how to render the countdown and
/// failure states.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptView {
    pub test_id: TestId,
    pub title: String,
    pub phase: AttemptPhase,
    pub cursor: usize,
    pub question: QuestionView,
    pub remaining_secs: u64,
    pub progress: AttemptProgress,
    pub can_submit: bool,
    pub last_failure: Option<SubmitFailure>,
    pub last_error: Option<AttemptError>,
    pub receipt: Option<SubmissionReceipt>,
}

impl AttemptView {
    #[must_use]
    pub fn from_controller(controller: &AttemptController) -> Self {
        let state = controller.state();
        let question = controller.current_question();

        Self {
            test_id: controller.test().id().clone(),
            title: controller.test().title().to_owned(),
            phase: controller.phase(),
            cursor: controller.cursor(),
            question: QuestionView {
                id: question.id().clone(),
                prompt: question.prompt().to_owned(),
                image: question.image().map(|url| url.as_str().to_owned()),
                options: question.options().to_vec(),
                selected: state.answer_for(question.id()).map(str::to_owned),
                flagged: state.is_flagged(question.id()),
            },
            remaining_secs: controller.remaining_secs(),
            progress: controller.progress(),
            can_submit: controller.can_submit_manually(),
            last_failure: controller.last_failure(),
            last_error: controller.last_error().cloned(),
            receipt: controller.receipt().cloned(),
        }
    }

    /// True if anything other than the countdown differs from `other`.
    #[must_use]
    pub fn differs_beyond_countdown(&self, other: &AttemptView) -> bool {
        self.phase != other.phase
            || self.cursor != other.cursor
            || self.question != other.question
            || self.progress != other.progress
            || self.last_error != other.last_error
    }
}
