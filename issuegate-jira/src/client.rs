use std::{collections::BTreeMap, time::Duration};

use issuegate_domain::IssueError;
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    StatusCode, Url,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub(crate) const TRACKER_NAME: &str = "Jira";
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;
const API_SEGMENTS: [&str; 3] = ["rest", "api", "2"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteProject {
    pub id: String,
    pub key: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteIssue {
    pub id: String,
    pub key: String,
}

/// Fields submitted when filing an issue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewIssue {
    pub summary: String,
    pub description: String,
    pub project_id: String,
    pub issue_type_id: String,
    pub priority: String,
}

impl NewIssue {
    pub fn to_payload(&self) -> Value {
        json!({
            "fields": {
                "summary": self.summary,
                "description": self.description,
                "project": {"id": self.project_id},
                "issuetype": {"id": self.issue_type_id},
                "priority": {"name": self.priority},
            }
        })
    }
}

/// Basic-auth handle scoped to a single adapter call.
pub struct JiraSession {
    api_base: Url,
    http: Client,
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct ProjectPayload {
    id: String,
    key: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct CreatedIssuePayload {
    id: String,
    key: String,
}

#[derive(Default, Deserialize)]
struct ErrorPayload {
    #[serde(rename = "errorMessages", default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, Value>,
}

impl JiraSession {
    pub fn authenticate(username: &str, password: &str, base_url: &str) -> Result<Self, IssueError> {
        Self::with_timeout(
            username,
            password,
            base_url,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        username: &str,
        password: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, IssueError> {
        let mut api_base = Url::parse(base_url).map_err(|error| {
            debug!(error = %error, "invalid Jira base URL");
            auth_or_transport()
        })?;
        api_base
            .path_segments_mut()
            .map_err(|()| auth_or_transport())?
            .pop_if_empty()
            .extend(API_SEGMENTS);

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_failure)?;

        Ok(Self {
            api_base,
            http,
            user: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn find_project(&self, project_id: &str) -> Result<RemoteProject, IssueError> {
        let endpoint = self.endpoint(&["project", project_id])?;
        debug!(project_id, "resolving Jira project");

        let response = self
            .with_auth(self.http.get(endpoint))
            .send()
            .map_err(transport_failure)?;

        match response.status() {
            status if status.is_success() => {
                let payload: ProjectPayload = response.json().map_err(transport_failure)?;
                Ok(RemoteProject {
                    id: payload.id,
                    key: payload.key,
                    name: payload.name,
                })
            }
            StatusCode::NOT_FOUND => {
                warn!(project_id, "Jira project not found");
                Err(IssueError::ProjectNotFound {
                    tracker: TRACKER_NAME,
                    project: project_id.to_string(),
                })
            }
            status => Err(unexpected_status(status, "project lookup")),
        }
    }

    pub fn create_issue(&self, issue: &NewIssue) -> Result<RemoteIssue, IssueError> {
        let endpoint = self.endpoint(&["issue"])?;
        debug!(project_id = %issue.project_id, "submitting Jira issue");

        let response = self
            .with_auth(self.http.post(endpoint))
            .json(&issue.to_payload())
            .send()
            .map_err(transport_failure)?;

        match response.status() {
            status if status.is_success() => {
                let payload: CreatedIssuePayload = response.json().map_err(transport_failure)?;
                Ok(RemoteIssue {
                    id: payload.id,
                    key: payload.key,
                })
            }
            StatusCode::BAD_REQUEST => {
                let message = rejection_message(response);
                warn!(message = %message, "Jira rejected issue payload");
                Err(IssueError::ValidationRejected {
                    tracker: TRACKER_NAME,
                    message,
                })
            }
            status => Err(unexpected_status(status, "issue create")),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IssueError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| auth_or_transport())?
            .extend(segments);
        Ok(url)
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.password))
    }
}

fn rejection_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    let payload = serde_json::from_str::<ErrorPayload>(&body).unwrap_or_default();
    let message = aggregate_error_messages(&payload);
    if message.is_empty() {
        format!("request failed with status {}", status.as_u16())
    } else {
        message
    }
}

/// General messages first, then `field: message` pairs in field order.
fn aggregate_error_messages(payload: &ErrorPayload) -> String {
    let general = payload
        .error_messages
        .iter()
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty());
    let per_field = payload
        .errors
        .iter()
        .map(|(field, message)| match message.as_str() {
            Some(text) => format!("{field}: {}", text.trim()),
            None => format!("{field}: {message}"),
        });

    general.chain(per_field).collect::<Vec<_>>().join("; ")
}

fn unexpected_status(status: StatusCode, operation: &str) -> IssueError {
    warn!(status = %status, operation, "Jira request failed");
    auth_or_transport()
}

fn transport_failure(error: reqwest::Error) -> IssueError {
    debug!(error = %error, "Jira transport failure");
    auth_or_transport()
}

fn auth_or_transport() -> IssueError {
    IssueError::AuthOrTransport {
        tracker: TRACKER_NAME,
    }
}
