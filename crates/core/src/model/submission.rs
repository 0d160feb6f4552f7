use std::collections::BTreeMap;

use crate::model::ids::{QuestionId, StudentId, TestId};

/// Final answer payload for one attempt. Flags are never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSubmission {
    test_id: TestId,
    student_id: StudentId,
    answers: BTreeMap<QuestionId, String>,
}

impl AttemptSubmission {
    #[must_use]
    pub fn new(
        test_id: TestId,
        student_id: StudentId,
        answers: BTreeMap<QuestionId, String>,
    ) -> Self {
        Self {
            test_id,
            student_id,
            answers,
        }
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, String> {
        &self.answers
    }
}

/// What the backend reported after accepting a submission.
///
/// `score` is computed server-side and only carried for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionResult {
    pub submission_id: Option<String>,
    pub score: Option<f64>,
    pub already_recorded: bool,
}

impl SubmissionResult {
    #[must_use]
    pub fn accepted(submission_id: impl Into<String>) -> Self {
        Self {
            submission_id: Some(submission_id.into()),
            score: None,
            already_recorded: false,
        }
    }

    /// The store already held a submission for this (student, test) pair.
    #[must_use]
    pub fn already_recorded() -> Self {
        Self {
            submission_id: None,
            score: None,
            already_recorded: true,
        }
    }
}
