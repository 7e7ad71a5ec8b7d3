//! Tracker-neutral types shared between issue tracker adapters and their host.

use issuegate_config::validate_required;
pub use issuegate_config::{Configuration, ConfigurationError, FieldSpec};
use serde::Serialize;
use thiserror::Error;

const TITLE_MESSAGE_LIMIT: usize = 100;
const TRUNCATION_MARKER: &str = "...";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IssueError {
    #[error("{tracker} project '{project}' was not found")]
    ProjectNotFound {
        tracker: &'static str,
        project: String,
    },

    #[error("{tracker} rejected the issue: {message}")]
    ValidationRejected {
        tracker: &'static str,
        message: String,
    },

    /// Unreachable tracker or refused credentials. Carries no transport detail.
    #[error("Could not create an issue with {tracker}. Please check your credentials and site URL.")]
    AuthOrTransport { tracker: &'static str },

    #[error("failed to render issue body: {0}")]
    BodyRender(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    pub reporter: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub app_name: String,
    pub environment: String,
    pub location: String,
    pub message: String,
    pub error_class: Option<String>,
    pub url: Option<String>,
    pub occurrences: u64,
    pub first_noticed_at: Option<String>,
    pub last_noticed_at: Option<String>,
}

impl IssueRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            reporter: None,
        }
    }

    pub fn reported_by(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = Some(reporter.into());
        self
    }

    pub fn from_problem(problem: &Problem, body: String) -> Self {
        Self::new(problem_title(problem), body)
    }
}

pub fn problem_title(problem: &Problem) -> String {
    format!(
        "[{}][{}] {}",
        problem.environment,
        problem.location,
        truncate_chars(&problem.message, TITLE_MESSAGE_LIMIT)
    )
}

fn truncate_chars(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let keep = limit.saturating_sub(TRUNCATION_MARKER.len());
    let mut out = value.chars().take(keep).collect::<String>();
    out.push_str(TRUNCATION_MARKER);
    out
}

pub trait IssueTracker {
    fn label(&self) -> &'static str;

    fn note(&self) -> &'static str;

    fn fields(&self) -> &'static [FieldSpec];

    /// Minimum signal that the adapter can attempt work. Does not imply `validate` is clean.
    fn is_configured(&self, config: &Configuration) -> bool;

    fn validate(&self, config: &Configuration) -> Vec<ConfigurationError> {
        validate_required(self.fields(), config)
    }

    fn create_issue(&self, config: &Configuration, request: &IssueRequest)
        -> Result<String, IssueError>;

    fn comments_allowed(&self) -> bool;

    /// Link to the tracker itself, or `None` when the site is not configured.
    fn issue_tracker_home_url(&self, config: &Configuration) -> Option<String>;
}
