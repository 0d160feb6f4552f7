use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{QuestionId, TestId};
use crate::model::question::Question;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WindowError {
    #[error("availability window ends before it starts")]
    InvalidTimeRange,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestDefinitionError {
    #[error("test has no questions")]
    NoQuestions,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

//
// ─── AVAILABILITY WINDOW ──────────────────────────────────────────────────────
//

/// Period during which a test may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl AvailabilityWindow {
    /// # Errors
    ///
    /// Returns `WindowError::InvalidTimeRange` if `ends_at` is before `starts_at`.
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<Self, WindowError> {
        if ends_at < starts_at {
            return Err(WindowError::InvalidTimeRange);
        }
        Ok(Self { starts_at, ends_at })
    }

    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    /// Inclusive on both ends.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.starts_at <= at && at <= self.ends_at
    }
}

//
// ─── TEST DEFINITION ──────────────────────────────────────────────────────────
//

/// A test as fetched from the backend. Read-only for the lifetime of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    id: TestId,
    title: String,
    questions: Vec<Question>,
    duration_minutes: i64,
    window: AvailabilityWindow,
}

impl TestDefinition {
    /// Build a definition, checking that it can back an attempt.
    ///
    /// `duration_minutes` is taken as delivered; a non-positive value yields an
    /// attempt that expires on start.
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError::NoQuestions` for an empty question list and
    /// `TestDefinitionError::DuplicateQuestion` when two questions share an id.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        questions: Vec<Question>,
        duration_minutes: i64,
        window: AvailabilityWindow,
    ) -> Result<Self, TestDefinitionError> {
        if questions.is_empty() {
            return Err(TestDefinitionError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(TestDefinitionError::DuplicateQuestion(question.id().clone()));
            }
        }

        Ok(Self {
            id,
            title: title.into(),
            questions,
            duration_minutes,
            window,
        })
    }

    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false for a constructed definition; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    #[must_use]
    pub fn duration_seconds(&self) -> i64 {
        self.duration_minutes.saturating_mul(60)
    }

    #[must_use]
    pub fn window(&self) -> &AvailabilityWindow {
        &self.window
    }
}
