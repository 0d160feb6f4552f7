use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::ids::{QuestionId, StudentId};
use crate::model::question::Question;
use crate::model::submission::AttemptSubmission;
use crate::model::test_definition::TestDefinition;

//
// ─── PHASE ────────────────────────────────────────────────────────────────────
//

/// Coarse lifecycle of an attempt.
///
/// `InProgress -> Submitting -> Submitted` with a `Submitting -> Failed -> Submitting`
/// retry loop. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptPhase {
    InProgress,
    Submitting,
    Submitted,
    Failed,
}

impl AttemptPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptPhase::Submitted)
    }

    #[must_use]
    pub fn accepts_input(self) -> bool {
        matches!(self, AttemptPhase::InProgress)
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttemptPhase::InProgress => "in_progress",
            AttemptPhase::Submitting => "submitting",
            AttemptPhase::Submitted => "submitted",
            AttemptPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What asked for the attempt to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTrigger::Manual => f.write_str("manual"),
            SubmitTrigger::Expiry => f.write_str("expiry"),
        }
    }
}

/// Why the last submission left the attempt in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmitFailure {
    Network,
    AuthExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

//
// ─── ATTEMPT STATE ────────────────────────────────────────────────────────────
//

/// Mutable aggregate for one student's run through a test.
///
/// Every mutation is phase-gated: operations that arrive in the wrong phase are
/// absorbed and report `false` rather than failing.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptState {
    test: TestDefinition,
    student_id: StudentId,
    cursor: usize,
    answers: BTreeMap<QuestionId, String>,
    flags: BTreeSet<QuestionId>,
    phase: AttemptPhase,
    last_failure: Option<SubmitFailure>,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

impl AttemptState {
    #[must_use]
    pub fn new(test: TestDefinition, student_id: StudentId, started_at: DateTime<Utc>) -> Self {
        Self {
            test,
            student_id,
            cursor: 0,
            answers: BTreeMap::new(),
            flags: BTreeSet::new(),
            phase: AttemptPhase::InProgress,
            last_failure: None,
            started_at,
            submitted_at: None,
        }
    }

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        debug_assert!(self.cursor < self.test.len(), "cursor out of range");
        &self.test.questions()[self.cursor]
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, String> {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, question: &QuestionId) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    #[must_use]
    pub fn flags(&self) -> &BTreeSet<QuestionId> {
        &self.flags
    }

    #[must_use]
    pub fn is_flagged(&self, question: &QuestionId) -> bool {
        self.flags.contains(question)
    }

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    #[must_use]
    pub fn last_failure(&self) -> Option<SubmitFailure> {
        self.last_failure
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// Fraction of questions with an answer, in `0.0..=1.0`.
    #[must_use]
    pub fn completion(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.answers.len() as f64 / self.test.len() as f64;
        ratio
    }

    /// Record `option` for `question`.
    ///
    /// Ignored outside `InProgress`, for unknown questions, and for options the
    /// question does not offer.
    pub fn answer(&mut self, question: &QuestionId, option: &str) -> bool {
        if !self.phase.accepts_input() {
            return false;
        }
        let Some(q) = self.test.question(question) else {
            return false;
        };
        if !q.offers(option) {
            return false;
        }
        self.answers.insert(question.clone(), option.to_owned());
        true
    }

    /// Flip the review flag on `question`. Ignored outside `InProgress`.
    pub fn toggle_flag(&mut self, question: &QuestionId) -> bool {
        if !self.phase.accepts_input() || self.test.question(question).is_none() {
            return false;
        }
        if !self.flags.remove(question) {
            self.flags.insert(question.clone());
        }
        true
    }

    /// Move the cursor one step, holding position at either end.
    ///
    /// Returns true if the cursor moved.
    pub fn navigate(&mut self, direction: NavDirection) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        let last = self.test.len() - 1;
        let target = match direction {
            NavDirection::Previous => self.cursor.saturating_sub(1),
            NavDirection::Next => (self.cursor + 1).min(last),
        };
        self.move_cursor(target)
    }

    /// Jump straight to the question at `index`. Out-of-range indices are ignored.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if self.phase.is_terminal() || index >= self.test.len() {
            return false;
        }
        self.move_cursor(index)
    }

    fn move_cursor(&mut self, target: usize) -> bool {
        let moved = target != self.cursor;
        self.cursor = target;
        debug_assert!(self.cursor < self.test.len(), "cursor out of range");
        moved
    }

    /// The submit gate: check the phase and enter `Submitting` in one step.
    ///
    /// Returns the payload to deliver, or `None` when the trigger must be
    /// absorbed (already submitting/submitted, or an expiry after a failure).
    pub fn begin_submission(&mut self, trigger: SubmitTrigger) -> Option<AttemptSubmission> {
        let allowed = match self.phase {
            AttemptPhase::InProgress => true,
            AttemptPhase::Failed => trigger == SubmitTrigger::Manual,
            AttemptPhase::Submitting | AttemptPhase::Submitted => false,
        };
        if !allowed {
            return None;
        }

        self.phase = AttemptPhase::Submitting;
        self.last_failure = None;
        Some(AttemptSubmission::new(
            self.test.id().clone(),
            self.student_id.clone(),
            self.answers.clone(),
        ))
    }

    /// `Submitting -> Submitted`. Any other phase is left untouched.
    pub fn mark_submitted(&mut self, at: DateTime<Utc>) -> bool {
        if self.phase != AttemptPhase::Submitting {
            return false;
        }
        self.phase = AttemptPhase::Submitted;
        self.submitted_at = Some(at);
        true
    }

    /// `Submitting -> Failed`. Any other phase is left untouched.
    pub fn mark_failed(&mut self, failure: SubmitFailure) -> bool {
        if self.phase != AttemptPhase::Submitting {
            return false;
        }
        self.phase = AttemptPhase::Failed;
        self.last_failure = Some(failure);
        true
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
