//! Jira adapter: files error-tracker problems as Jira issues over the REST API.

mod body;
mod client;

use std::time::Duration;

use issuegate_domain::{Configuration, FieldSpec, IssueError, IssueRequest, IssueTracker};
use regex::Regex;
use tracing::{debug, info};

pub use body::BodyTemplate;
pub use client::{JiraSession, NewIssue, RemoteIssue, RemoteProject};

pub const LABEL: &str = "jira";
pub const NOTE: &str =
    "Please configure Jira by entering your username, password and Jira install url.";
pub const ISSUE_TYPE_ID: &str = "3";
pub const DEFAULT_PRIORITY: &str = "Major";

pub const FIELDS: [FieldSpec; 6] = [
    FieldSpec::required("username", "Username", "Your username"),
    FieldSpec::required("password", "Password", "Your password"),
    FieldSpec::required("site", "JIRA Install URL", "e.g. https://example.net"),
    FieldSpec::optional("context_path", "Context Path", "Context Path if any"),
    FieldSpec::required("project_id", "Project ID", "Your project id to track issues"),
    FieldSpec::optional("priority", "Priority", "Issue priority, defaults to Major"),
];

#[derive(Clone, Debug)]
pub struct JiraIssueTracker {
    timeout: Duration,
}

impl Default for JiraIssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JiraIssueTracker {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(client::REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl IssueTracker for JiraIssueTracker {
    fn label(&self) -> &'static str {
        LABEL
    }

    fn note(&self) -> &'static str {
        NOTE
    }

    fn fields(&self) -> &'static [FieldSpec] {
        &FIELDS
    }

    fn is_configured(&self, config: &Configuration) -> bool {
        !config.is_blank("project_id")
    }

    fn create_issue(
        &self,
        config: &Configuration,
        request: &IssueRequest,
    ) -> Result<String, IssueError> {
        let base = self
            .issue_tracker_home_url(config)
            .ok_or(IssueError::AuthOrTransport {
                tracker: client::TRACKER_NAME,
            })?;
        let project_id = config
            .value("project_id")
            .ok_or_else(|| IssueError::ProjectNotFound {
                tracker: client::TRACKER_NAME,
                project: String::new(),
            })?;
        if let Some(reporter) = request.reporter.as_deref() {
            debug!(reporter, "creating Jira issue on behalf of reporter");
        }

        let session = JiraSession::with_timeout(
            config.value("username").unwrap_or_default(),
            config.get("password").unwrap_or_default(),
            &base,
            self.timeout,
        )?;
        let project = session.find_project(project_id)?;
        let issue = session.create_issue(&NewIssue {
            summary: sanitize_summary(&request.title),
            description: request.body.clone(),
            project_id: project.id,
            issue_type_id: ISSUE_TYPE_ID.to_string(),
            priority: config
                .value("priority")
                .unwrap_or(DEFAULT_PRIORITY)
                .to_string(),
        })?;

        info!(key = %issue.key, project = %project.key, "created Jira issue");
        Ok(browse_url(&base, &issue.key))
    }

    fn comments_allowed(&self) -> bool {
        false
    }

    fn issue_tracker_home_url(&self, config: &Configuration) -> Option<String> {
        let site = config.value("site")?;
        Some(base_url(site, config.value("context_path").unwrap_or_default()))
    }
}

pub fn base_url(site: &str, context_path: &str) -> String {
    let site = normalize_site(site);
    let context = context_path.trim().trim_matches('/');
    if context.is_empty() {
        site
    } else {
        format!("{site}/{context}")
    }
}

pub fn browse_url(base_url: &str, issue_key: &str) -> String {
    format!("{}/browse/{}", base_url.trim_end_matches('/'), issue_key)
}

pub fn sanitize_summary(title: &str) -> String {
    let line_breaks = Regex::new(r"[\r\n]+").expect("regex");
    line_breaks.replace_all(title, " ").to_string()
}

fn normalize_site(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
