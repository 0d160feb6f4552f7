#![forbid(unsafe_code)]

pub mod attempts;
pub mod config;
pub mod error;

pub use exam_core::Clock;

pub use attempts::{
    AttemptCommand, AttemptController, AttemptHandle, AttemptProgress, AttemptRunner,
    AttemptService, AttemptView, PendingSubmission, QuestionView, SubmissionReceipt,
    SubmitOutcome,
};
pub use config::PortalConfig;
pub use error::{AttemptError, ConfigError};
