use async_trait::async_trait;
use exam_core::model::{AttemptSubmission, StudentId, SubmissionResult, TestDefinition, TestId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by assessment store adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    /// The bearer credential was missing, expired, or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// The store already holds a submission for this (student, test) pair.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unexpected status {status}")]
    Http { status: u16 },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized)
    }
}

/// Backend contract consumed by an attempt.
///
/// The core calls `submit_attempt` sequentially, never concurrently, for a given
/// attempt; the store stays the source of truth for whether a submission exists.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Fetch the full, ordered definition of a test.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the test is unknown,
    /// `StoreError::Unauthorized` if the credential is rejected, or other
    /// transport errors.
    async fn fetch_test(&self, id: &TestId) -> Result<TestDefinition, StoreError>;

    /// Persist the final answers of an attempt.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a submission already exists for the pair,
    /// `StoreError::Unauthorized` if the credential is rejected, or other
    /// transport errors.
    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, StoreError>;
}

//
// ─── IN-MEMORY STORE ───────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    tests: HashMap<TestId, TestDefinition>,
    recorded: HashSet<(StudentId, TestId)>,
    submissions: Vec<AttemptSubmission>,
    fetch_failures: VecDeque<StoreError>,
    submit_failures: VecDeque<SubmitScript>,
    fetch_calls: usize,
    submit_calls: usize,
}

enum SubmitScript {
    Fail(StoreError),
    /// Record the submission, then report a transport error to the caller.
    LoseResponse,
}

/// In-memory store for tests and prototyping.
///
/// Enforces one submission per (student, test) pair and can be scripted to fail
/// upcoming calls.
#[derive(Clone, Default)]
pub struct InMemoryAssessmentStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAssessmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a test definition.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn insert_test(&self, test: TestDefinition) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard.tests.insert(test.id().clone(), test);
        Ok(())
    }

    /// Make the next `fetch_test` call fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn fail_next_fetch(&self, error: StoreError) -> Result<(), StoreError> {
        self.lock()?.fetch_failures.push_back(error);
        Ok(())
    }

    /// Make the next `submit_attempt` call fail with `error` without recording it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn fail_next_submit(&self, error: StoreError) -> Result<(), StoreError> {
        self.lock()?
            .submit_failures
            .push_back(SubmitScript::Fail(error));
        Ok(())
    }

    /// Record the next submission but answer with a connection error, as if
    /// the response was lost on the way back.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn lose_next_submit_response(&self) -> Result<(), StoreError> {
        self.lock()?
            .submit_failures
            .push_back(SubmitScript::LoseResponse);
        Ok(())
    }

    /// Submissions the store accepted, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn submissions(&self) -> Result<Vec<AttemptSubmission>, StoreError> {
        Ok(self.lock()?.submissions.clone())
    }

    /// Number of `fetch_test` calls received, failed ones included.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn fetch_calls(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.fetch_calls)
    }

    /// Number of `submit_attempt` calls received, failed ones included.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the internal lock is poisoned.
    pub fn submit_calls(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.submit_calls)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl AssessmentStore for InMemoryAssessmentStore {
    async fn fetch_test(&self, id: &TestId) -> Result<TestDefinition, StoreError> {
        let mut guard = self.lock()?;
        guard.fetch_calls += 1;
        if let Some(error) = guard.fetch_failures.pop_front() {
            return Err(error);
        }
        guard.tests.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn submit_attempt(
        &self,
        submission: &AttemptSubmission,
    ) -> Result<SubmissionResult, StoreError> {
        let mut guard = self.lock()?;
        guard.submit_calls += 1;
        let lose_response = match guard.submit_failures.pop_front() {
            Some(SubmitScript::Fail(error)) => return Err(error),
            Some(SubmitScript::LoseResponse) => true,
            None => false,
        };

        if !guard.tests.contains_key(submission.test_id()) {
            return Err(StoreError::NotFound);
        }
        let key = (
            submission.student_id().clone(),
            submission.test_id().clone(),
        );
        if !guard.recorded.insert(key) {
            return Err(StoreError::Conflict);
        }
        guard.submissions.push(submission.clone());
        let receipt = SubmissionResult::accepted(format!("sub-{}", guard.submissions.len()));

        if lose_response {
            return Err(StoreError::Connection("response lost".into()));
        }
        Ok(receipt)
    }
}
