use exam_core::model::AttemptState;

/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub flagged: usize,
    pub completion: f64,
}

impl AttemptProgress {
    #[must_use]
    pub fn from_state(state: &AttemptState) -> Self {
        let total = state.test().len();
        let answered = state.answers().len();
        Self {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            flagged: state.flags().len(),
            completion: state.completion(),
        }
    }
}
