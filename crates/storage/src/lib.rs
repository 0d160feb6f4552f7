#![forbid(unsafe_code)]

pub mod http;
pub mod repository;

pub use http::{HttpAssessmentStore, HttpStoreConfig};
pub use repository::{AssessmentStore, InMemoryAssessmentStore, StoreError};
