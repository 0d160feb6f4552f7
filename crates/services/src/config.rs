use std::env;
use std::time::Duration;

use exam_core::model::StudentId;
use storage::HttpStoreConfig;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_TICK_MILLIS: u64 = 1_000;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Runtime settings for an exam session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub student_id: Option<StudentId>,
    pub tick_every: Duration,
    pub request_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_token: None,
            student_id: None,
            tick_every: Duration::from_millis(DEFAULT_TICK_MILLIS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PortalConfig {
    /// Read `EXAM_API_BASE_URL`, `EXAM_API_TOKEN`, `EXAM_STUDENT_ID`,
    /// `EXAM_TICK_MILLIS` and `EXAM_REQUEST_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`PortalConfig::from_env`] with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("EXAM_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let api_token = non_empty("EXAM_API_TOKEN");
        let student_id = non_empty("EXAM_STUDENT_ID").map(StudentId::new);
        let tick_millis = parse_positive("EXAM_TICK_MILLIS", non_empty("EXAM_TICK_MILLIS"))?
            .unwrap_or(DEFAULT_TICK_MILLIS);
        let timeout_secs =
            parse_positive("EXAM_REQUEST_TIMEOUT_SECS", non_empty("EXAM_REQUEST_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            base_url,
            api_token,
            student_id,
            tick_every: Duration::from_millis(tick_millis),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    #[must_use]
    pub fn http_store(&self) -> HttpStoreConfig {
        let config = HttpStoreConfig::new(self.base_url.clone()).with_timeout(self.request_timeout);
        match &self.api_token {
            Some(token) => config.with_bearer_token(token.clone()),
            None => config,
        }
    }
}

fn parse_positive(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}
