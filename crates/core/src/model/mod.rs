mod attempt;
mod ids;
mod question;
mod submission;
mod test_definition;

pub use ids::{QuestionId, StudentId, TestId};

pub use attempt::{AttemptPhase, AttemptState, NavDirection, SubmitFailure, SubmitTrigger};
pub use question::{Question, QuestionError};
pub use submission::{AttemptSubmission, SubmissionResult};
pub use test_definition::{AvailabilityWindow, TestDefinition, TestDefinitionError, WindowError};
