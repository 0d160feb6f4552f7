use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use exam_core::model::{
    AttemptPhase, AttemptState, AttemptSubmission, NavDirection, Question, QuestionId,
    SubmissionResult, SubmitFailure, SubmitTrigger, TestDefinition,
};
use exam_core::{Clock, SessionClock};
use storage::{AssessmentStore, StoreError};
use tracing::{debug, info, warn};

use super::progress::AttemptProgress;
use super::view::AttemptView;
use crate::error::AttemptError;

//
// ─── SUBMISSION TYPES ──────────────────────────────────────────────────────────
//

/// Proof that the gate admitted a submission.
///
/// Only one exists per attempt at a time; it must be handed back to
/// [`AttemptController::finish_submission`] with the store's answer.
#[derive(Debug)]
#[must_use = "a pending submission must be delivered and finished"]
pub struct PendingSubmission {
    trigger: SubmitTrigger,
    payload: AttemptSubmission,
}

impl PendingSubmission {
    #[must_use]
    pub fn trigger(&self) -> SubmitTrigger {
        self.trigger
    }

    #[must_use]
    pub fn payload(&self) -> &AttemptSubmission {
        &self.payload
    }
}

/// Record of the delivery that moved the attempt to `Submitted`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub trigger: SubmitTrigger,
    pub result: SubmissionResult,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(SubmissionReceipt),
    /// The gate absorbed the call: a submission is in flight or already done.
    Ignored,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Owns one student's attempt: answers, flags, cursor, countdown, and the
/// exactly-once submit protocol.
///
/// All mutation goes through `&mut self`, so the phase check and the move to
/// `Submitting` happen in one step that nothing can interleave with.
pub struct AttemptController {
    store: Arc<dyn AssessmentStore>,
    clock: Clock,
    countdown: SessionClock,
    state: AttemptState,
    last_error: Option<AttemptError>,
    receipt: Option<SubmissionReceipt>,
}

impl AttemptController {
    /// Build a controller around a freshly loaded attempt and start its countdown.
    ///
    /// Returns true as the second element when the countdown expired on start.
    pub(crate) fn start(
        store: Arc<dyn AssessmentStore>,
        clock: Clock,
        state: AttemptState,
    ) -> (Self, bool) {
        let mut countdown = SessionClock::new();
        let expired = countdown
            .start(state.test().duration_seconds())
            .is_some();
        let controller = Self {
            store,
            clock,
            countdown,
            state,
            last_error: None,
            receipt: None,
        };
        (controller, expired)
    }

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        self.state.test()
    }

    #[must_use]
    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.state.cursor()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        self.state.current_question()
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, String> {
        self.state.answers()
    }

    #[must_use]
    pub fn flags(&self) -> &BTreeSet<QuestionId> {
        self.state.flags()
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<SubmitFailure> {
        self.state.last_failure()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&AttemptError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn receipt(&self) -> Option<&SubmissionReceipt> {
        self.receipt.as_ref()
    }

    /// Share of answered questions. Informational only; never gates expiry.
    #[must_use]
    pub fn completion(&self) -> f64 {
        self.state.completion()
    }

    /// Whether a UI should enable its submit button.
    ///
    /// `submit(Manual)` itself only consults the phase gate.
    #[must_use]
    pub fn can_submit_manually(&self) -> bool {
        matches!(self.phase(), AttemptPhase::InProgress | AttemptPhase::Failed)
            && !self.state.answers().is_empty()
    }

    #[must_use]
    pub fn progress(&self) -> AttemptProgress {
        AttemptProgress::from_state(&self.state)
    }

    #[must_use]
    pub fn view(&self) -> AttemptView {
        AttemptView::from_controller(self)
    }

    //
    // ─── INPUT ─────────────────────────────────────────────────────────────
    //

    /// Select `option` for `question`. Ignored unless the attempt is in progress.
    pub fn answer(&mut self, question: &QuestionId, option: &str) -> bool {
        let applied = self.state.answer(question, option);
        if !applied {
            debug!(
                question_id = %question,
                phase = %self.phase(),
                "answer ignored"
            );
        }
        applied
    }

    /// Select `option` for the question under the cursor.
    pub fn answer_current(&mut self, option: &str) -> bool {
        let question = self.current_question().id().clone();
        self.answer(&question, option)
    }

    pub fn toggle_flag(&mut self, question: &QuestionId) -> bool {
        let applied = self.state.toggle_flag(question);
        if !applied {
            debug!(question_id = %question, phase = %self.phase(), "flag toggle ignored");
        }
        applied
    }

    pub fn toggle_current_flag(&mut self) -> bool {
        let question = self.current_question().id().clone();
        self.toggle_flag(&question)
    }

    pub fn navigate(&mut self, direction: NavDirection) -> bool {
        self.state.navigate(direction)
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        self.state.jump_to(index)
    }

    //
    // ─── CLOCK ─────────────────────────────────────────────────────────────
    //

    /// Advance the countdown by one second without acting on expiry.
    ///
    /// Returns true exactly once, on the tick that reaches zero. Callers that
    /// use this instead of [`AttemptController::tick`] must dispatch
    /// `submit(SubmitTrigger::Expiry)` themselves.
    pub fn tick_clock(&mut self) -> bool {
        self.countdown.tick().is_some()
    }

    /// Advance the countdown by one second, submitting if time ran out.
    ///
    /// # Errors
    ///
    /// Returns the submission error when the expiry-driven submit fails.
    pub async fn tick(&mut self) -> Result<Option<SubmitOutcome>, AttemptError> {
        if !self.tick_clock() {
            return Ok(None);
        }
        info!(test_id = %self.test().id(), "time is up; submitting attempt");
        self.submit(SubmitTrigger::Expiry).await.map(Some)
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────
    //

    /// Deliver the attempt, at most once.
    ///
    /// A call made while a submission is in flight or already accepted returns
    /// `SubmitOutcome::Ignored` without contacting the store. From `Failed`,
    /// only a manual trigger retries.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AuthExpired` when the store rejects the credential
    /// and `AttemptError::SubmitFailed` for other delivery failures. Either way
    /// the attempt is left in `Failed` with its answers intact.
    pub async fn submit(&mut self, trigger: SubmitTrigger) -> Result<SubmitOutcome, AttemptError> {
        let Some(pending) = self.begin_submission(trigger) else {
            return Ok(SubmitOutcome::Ignored);
        };
        let result = self.deliver(&pending).await;
        self.finish_submission(pending, result)
    }

    /// Send an admitted submission to the store.
    ///
    /// Takes `&self`, so a driver can publish the `Submitting` state between
    /// [`AttemptController::begin_submission`] and this call.
    pub async fn deliver(
        &self,
        pending: &PendingSubmission,
    ) -> Result<SubmissionResult, StoreError> {
        self.store.submit_attempt(pending.payload()).await
    }

    /// First half of [`AttemptController::submit`]: pass the gate, stop the
    /// countdown, and snapshot the payload.
    pub fn begin_submission(&mut self, trigger: SubmitTrigger) -> Option<PendingSubmission> {
        let Some(payload) = self.state.begin_submission(trigger) else {
            debug!(
                test_id = %self.test().id(),
                %trigger,
                phase = %self.phase(),
                "submit ignored"
            );
            return None;
        };
        self.countdown.stop();
        self.last_error = None;

        info!(
            test_id = %payload.test_id(),
            student_id = %payload.student_id(),
            %trigger,
            answered = payload.answers().len(),
            remaining_secs = self.countdown.remaining_secs(),
            "submitting attempt"
        );
        Some(PendingSubmission { trigger, payload })
    }

    /// Second half of [`AttemptController::submit`]: apply the store's answer.
    ///
    /// A `Conflict` from the store means it already holds this attempt, so the
    /// attempt is treated as submitted.
    ///
    /// # Errors
    ///
    /// Same as [`AttemptController::submit`].
    pub fn finish_submission(
        &mut self,
        pending: PendingSubmission,
        result: Result<SubmissionResult, StoreError>,
    ) -> Result<SubmitOutcome, AttemptError> {
        let result = match result {
            Ok(result) => result,
            Err(StoreError::Conflict) => {
                info!(
                    test_id = %pending.payload.test_id(),
                    "store already holds this attempt; treating as submitted"
                );
                SubmissionResult::already_recorded()
            }
            Err(StoreError::Unauthorized) => {
                return Err(self.fail(SubmitFailure::AuthExpired, AttemptError::AuthExpired));
            }
            Err(err) => {
                return Err(self.fail(SubmitFailure::Network, AttemptError::SubmitFailed(err)));
            }
        };

        let submitted_at = self.clock.now();
        let marked = self.state.mark_submitted(submitted_at);
        debug_assert!(marked, "finish_submission outside Submitting");

        info!(
            test_id = %pending.payload.test_id(),
            trigger = %pending.trigger,
            submission_id = result.submission_id.as_deref().unwrap_or("-"),
            "attempt submitted"
        );
        let receipt = SubmissionReceipt {
            trigger: pending.trigger,
            result,
            submitted_at,
        };
        self.receipt = Some(receipt.clone());
        Ok(SubmitOutcome::Submitted(receipt))
    }

    fn fail(&mut self, failure: SubmitFailure, error: AttemptError) -> AttemptError {
        let marked = self.state.mark_failed(failure);
        debug_assert!(marked, "submission failed outside Submitting");
        warn!(
            test_id = %self.test().id(),
            ?failure,
            error = %error,
            answered = self.state.answers().len(),
            "attempt submission failed; answers kept for retry"
        );
        self.last_error = Some(error.clone());
        error
    }
}

impl fmt::Debug for AttemptController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptController")
            .field("test_id", self.test().id())
            .field("phase", &self.phase())
            .field("cursor", &self.cursor())
            .field("answered", &self.answers().len())
            .field("flagged", &self.flags().len())
            .field("remaining_secs", &self.remaining_secs())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use exam_core::model::{AvailabilityWindow, StudentId, TestId};
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::InMemoryAssessmentStore;

    fn build_test(questions: usize, minutes: i64) -> TestDefinition {
        let questions = (1..=questions)
            .map(|i| {
                Question::new(
                    QuestionId::new(format!("q{i}")),
                    format!("Question {i}"),
                    vec!["a".into(), "b".into()],
                )
                .unwrap()
            })
            .collect();
        let window =
            AvailabilityWindow::new(fixed_now(), fixed_now() + ChronoDuration::hours(1)).unwrap();
        TestDefinition::new(TestId::new("t1"), "Quiz", questions, minutes, window).unwrap()
    }

    fn build_controller(
        questions: usize,
        minutes: i64,
    ) -> (AttemptController, InMemoryAssessmentStore) {
        let store = InMemoryAssessmentStore::new();
        let test = build_test(questions, minutes);
        store.insert_test(test.clone()).unwrap();
        let state = AttemptState::new(test, StudentId::new("s1"), fixed_now());
        let (controller, expired) =
            AttemptController::start(Arc::new(store.clone()), fixed_clock(), state);
        assert!(!expired);
        (controller, store)
    }

    fn q(id: &str) -> QuestionId {
        QuestionId::new(id)
    }

    #[tokio::test]
    async fn manual_then_expiry_submits_once() {
        let (mut controller, store) = build_controller(2, 1);
        for _ in 0..59 {
            assert!(controller.tick().await.unwrap().is_none());
        }

        let pending = controller.begin_submission(SubmitTrigger::Manual).unwrap();
        // The expiry tick lands while the manual submission is in flight.
        assert!(controller.tick().await.unwrap().is_none());
        assert_eq!(
            controller.submit(SubmitTrigger::Expiry).await.unwrap(),
            SubmitOutcome::Ignored
        );

        let result = store.submit_attempt(pending.payload()).await;
        let outcome = controller.finish_submission(pending, result).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(ref r) if r.trigger == SubmitTrigger::Manual));
        assert_eq!(store.submit_calls().unwrap(), 1);
        assert_eq!(controller.remaining_secs(), 1);
    }

    #[tokio::test]
    async fn expiry_then_manual_submits_once() {
        let (mut controller, store) = build_controller(2, 1);
        let mut expired = None;
        for _ in 0..60 {
            if let Some(outcome) = controller.tick().await.unwrap() {
                expired = Some(outcome);
            }
        }
        assert!(matches!(expired, Some(SubmitOutcome::Submitted(_))));

        let again = controller.submit(SubmitTrigger::Manual).await.unwrap();
        assert_eq!(again, SubmitOutcome::Ignored);
        assert_eq!(store.submit_calls().unwrap(), 1);
        assert_eq!(controller.phase(), AttemptPhase::Submitted);
        assert_eq!(controller.receipt().unwrap().trigger, SubmitTrigger::Expiry);
    }

    #[tokio::test]
    async fn network_failure_then_manual_retry() {
        let (mut controller, store) = build_controller(3, 10);
        controller.answer(&q("q1"), "a");
        controller.answer(&q("q2"), "b");
        store
            .fail_next_submit(StoreError::Connection("reset by peer".into()))
            .unwrap();

        let err = controller.submit(SubmitTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, AttemptError::SubmitFailed(StoreError::Connection(_))));
        assert_eq!(controller.phase(), AttemptPhase::Failed);
        assert_eq!(controller.last_failure(), Some(SubmitFailure::Network));
        assert_eq!(controller.last_error(), Some(&err));
        let answers_before = controller.answers().clone();

        let outcome = controller.submit(SubmitTrigger::Manual).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(controller.phase(), AttemptPhase::Submitted);
        assert!(controller.last_error().is_none());
        assert_eq!(controller.answers(), &answers_before);
        assert_eq!(store.submit_calls().unwrap(), 2);

        assert_eq!(
            controller.submit(SubmitTrigger::Manual).await.unwrap(),
            SubmitOutcome::Ignored
        );
        assert_eq!(store.submit_calls().unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_attempt_does_not_resubmit_on_its_own() {
        let (mut controller, store) = build_controller(1, 10);
        store
            .fail_next_submit(StoreError::Http { status: 503 })
            .unwrap();
        let _ = controller.submit(SubmitTrigger::Manual).await;

        for _ in 0..700 {
            assert!(controller.tick().await.unwrap().is_none());
        }
        assert_eq!(
            controller.submit(SubmitTrigger::Expiry).await.unwrap(),
            SubmitOutcome::Ignored
        );
        assert_eq!(store.submit_calls().unwrap(), 1);
        assert_eq!(controller.phase(), AttemptPhase::Failed);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_expired_and_keeps_answers() {
        let (mut controller, store) = build_controller(2, 10);
        controller.answer(&q("q1"), "b");
        store.fail_next_submit(StoreError::Unauthorized).unwrap();

        let err = controller.submit(SubmitTrigger::Manual).await.unwrap_err();
        assert_eq!(err, AttemptError::AuthExpired);
        assert!(err.requires_reauth());
        assert_eq!(controller.last_failure(), Some(SubmitFailure::AuthExpired));
        assert_eq!(controller.answers().get(&q("q1")).map(String::as_str), Some("b"));

        let outcome = controller.submit(SubmitTrigger::Manual).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        let delivered = store.submissions().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].answers().get(&q("q1")).map(String::as_str), Some("b"));
    }

    #[tokio::test]
    async fn conflict_after_lost_response_counts_as_submitted() {
        let (mut controller, store) = build_controller(1, 10);
        store.lose_next_submit_response().unwrap();

        assert!(controller.submit(SubmitTrigger::Manual).await.is_err());
        let outcome = controller.submit(SubmitTrigger::Manual).await.unwrap();

        let SubmitOutcome::Submitted(receipt) = outcome else {
            panic!("expected submitted outcome");
        };
        assert!(receipt.result.already_recorded);
        assert_eq!(controller.phase(), AttemptPhase::Submitted);
        assert_eq!(store.submissions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submitted_attempt_is_frozen() {
        let (mut controller, _store) = build_controller(3, 10);
        controller.answer(&q("q1"), "a");
        controller.toggle_flag(&q("q2"));
        controller.navigate(NavDirection::Next);
        controller.submit(SubmitTrigger::Manual).await.unwrap();

        let answers = controller.answers().clone();
        let flags = controller.flags().clone();
        let remaining = controller.remaining_secs();

        assert!(!controller.answer(&q("q3"), "b"));
        assert!(!controller.answer_current("b"));
        assert!(!controller.toggle_flag(&q("q3")));
        assert!(!controller.navigate(NavDirection::Next));
        assert!(!controller.navigate(NavDirection::Previous));
        for _ in 0..5 {
            assert!(controller.tick().await.unwrap().is_none());
        }

        assert_eq!(controller.answers(), &answers);
        assert_eq!(controller.flags(), &flags);
        assert_eq!(controller.cursor(), 1);
        assert_eq!(controller.remaining_secs(), remaining);
    }

    #[test]
    fn submit_button_hint_follows_answers_and_phase() {
        let (mut controller, _store) = build_controller(2, 10);
        assert!(!controller.can_submit_manually());
        controller.answer_current("a");
        assert!(controller.can_submit_manually());
        assert!((controller.completion() - 0.5).abs() < f64::EPSILON);

        let _pending = controller.begin_submission(SubmitTrigger::Manual).unwrap();
        assert!(!controller.can_submit_manually());
    }

    #[test]
    fn zero_duration_reports_expiry_on_start() {
        let store = InMemoryAssessmentStore::new();
        let state = AttemptState::new(build_test(1, 0), StudentId::new("s1"), fixed_now());
        let (controller, expired) = AttemptController::start(Arc::new(store), fixed_clock(), state);
        assert!(expired);
        assert_eq!(controller.remaining_secs(), 0);
    }
}
