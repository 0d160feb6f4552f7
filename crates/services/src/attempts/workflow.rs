use std::sync::Arc;

use exam_core::model::{AttemptState, StudentId, SubmitTrigger, TestId};
use storage::AssessmentStore;
use tracing::{info, warn};

use super::controller::AttemptController;
use crate::error::AttemptError;
use crate::Clock;

/// Starts attempts against an assessment store.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    store: Arc<dyn AssessmentStore>,
}

impl AttemptService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn AssessmentStore>) -> Self {
        Self { clock, store }
    }

    /// Fetch `test_id` and start a timed attempt for `student_id`.
    ///
    /// Nothing is created on failure, so the caller can simply call again. A
    /// test with no time allowance is submitted before this returns; a failure
    /// of that submission is recorded on the returned controller.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::LoadFailed` if the store cannot deliver the test and
    /// `AttemptError::NotAvailable` if it is outside its availability window.
    pub async fn load_test(
        &self,
        student_id: StudentId,
        test_id: &TestId,
    ) -> Result<AttemptController, AttemptError> {
        let test = self.store.fetch_test(test_id).await.map_err(|err| {
            warn!(test_id = %test_id, error = %err, "failed to load test");
            AttemptError::LoadFailed(err)
        })?;

        let now = self.clock.now();
        let window = *test.window();
        if !window.contains(now) {
            warn!(test_id = %test_id, "test requested outside its availability window");
            return Err(AttemptError::NotAvailable {
                starts_at: window.starts_at(),
                ends_at: window.ends_at(),
            });
        }

        info!(
            test_id = %test_id,
            student_id = %student_id,
            questions = test.len(),
            duration_minutes = test.duration_minutes(),
            "attempt started"
        );
        let state = AttemptState::new(test, student_id, now);
        let (mut controller, expired) =
            AttemptController::start(Arc::clone(&self.store), self.clock, state);

        if expired {
            warn!(test_id = %test_id, "test has no time allowance; submitting immediately");
            // The outcome is kept on the controller (phase, last_error).
            let _ = controller.submit(SubmitTrigger::Expiry).await;
        }
        Ok(controller)
    }
}
