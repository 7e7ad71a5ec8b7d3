use std::{
    net::TcpListener,
    thread,
    time::{Duration, Instant},
};

use issuegate_domain::{Configuration, IssueError, IssueRequest, IssueTracker, Problem};
use issuegate_jira::{BodyTemplate, JiraIssueTracker};
use mockito::{Matcher, Server};
use serde_json::json;

const BASIC_AUTH: &str = "Basic YWxpY2U6c2VjcmV0";
const TRANSPORT_MESSAGE: &str =
    "Could not create an issue with Jira. Please check your credentials and site URL.";

fn config_for(site: &str) -> Configuration {
    Configuration::new()
        .with("username", "alice")
        .with("password", "secret")
        .with("site", site)
        .with("project_id", "DEMO")
}

fn tracker() -> JiraIssueTracker {
    JiraIssueTracker::with_timeout(Duration::from_secs(5))
}

fn project_body() -> String {
    json!({"id": "10000", "key": "DEMO", "name": "Demo"}).to_string()
}

#[test]
fn creates_issue_and_returns_browse_url() {
    let mut server = Server::new();
    let project = server
        .mock("GET", "/rest/api/2/project/DEMO")
        .match_header("authorization", BASIC_AUTH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(project_body())
        .create();
    let issue = server
        .mock("POST", "/rest/api/2/issue")
        .match_header("authorization", BASIC_AUTH)
        .match_body(Matcher::Json(json!({
            "fields": {
                "summary": "Line1 Line2 Line3",
                "description": "stack trace\nline two",
                "project": {"id": "10000"},
                "issuetype": {"id": "3"},
                "priority": {"name": "Major"}
            }
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "10001", "key": "DEMO-7", "self": "ignored"}).to_string())
        .create();

    let request = IssueRequest::new("Line1\nLine2\rLine3", "stack trace\nline two");
    let url = tracker()
        .create_issue(&config_for(&format!("{}/", server.url())), &request)
        .expect("issue url");

    assert_eq!(url, format!("{}/browse/DEMO-7", server.url()));
    project.assert();
    issue.assert();
}

#[test]
fn honors_context_path_and_configured_priority() {
    let mut server = Server::new();
    let project = server
        .mock("GET", "/jira/rest/api/2/project/DEMO")
        .with_status(200)
        .with_body(project_body())
        .create();
    let issue = server
        .mock("POST", "/jira/rest/api/2/issue")
        .match_body(Matcher::PartialJson(json!({
            "fields": {"priority": {"name": "Blocker"}}
        })))
        .with_status(201)
        .with_body(json!({"id": "10002", "key": "DEMO-8"}).to_string())
        .create();

    let config = config_for(&server.url())
        .with("context_path", "/jira/")
        .with("priority", "Blocker");
    let url = tracker()
        .create_issue(&config, &IssueRequest::new("title", "body"))
        .expect("issue url");

    assert_eq!(url, format!("{}/jira/browse/DEMO-8", server.url()));
    project.assert();
    issue.assert();
}

#[test]
fn files_rendered_problem_body() {
    let mut server = Server::new();
    server
        .mock("GET", "/rest/api/2/project/DEMO")
        .with_status(200)
        .with_body(project_body())
        .create();
    let issue = server
        .mock("POST", "/rest/api/2/issue")
        .match_body(Matcher::PartialJson(json!({
            "fields": {"summary": "[staging][users#show] RecordNotFound"}
        })))
        .with_status(201)
        .with_body(json!({"id": "10003", "key": "DEMO-9"}).to_string())
        .create();

    let template = BodyTemplate::new().expect("template");
    let problem = Problem {
        app_name: "shop".to_string(),
        environment: "staging".to_string(),
        location: "users#show".to_string(),
        message: "RecordNotFound".to_string(),
        occurrences: 3,
        ..Problem::default()
    };
    let request = template.issue_request(&problem, None).expect("request");

    let url = tracker()
        .create_issue(&config_for(&server.url()), &request)
        .expect("issue url");

    assert!(url.ends_with("/browse/DEMO-9"));
    issue.assert();
}

#[test]
fn aggregates_tracker_field_errors() {
    let mut server = Server::new();
    server
        .mock("GET", "/rest/api/2/project/DEMO")
        .with_status(200)
        .with_body(project_body())
        .create();
    server
        .mock("POST", "/rest/api/2/issue")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "errorMessages": [],
                "errors": {"priority": "invalid value"}
            })
            .to_string(),
        )
        .create();

    let error = tracker()
        .create_issue(&config_for(&server.url()), &IssueRequest::new("t", "b"))
        .expect_err("expected rejection");

    assert!(matches!(error, IssueError::ValidationRejected { .. }));
    assert!(error.to_string().contains("priority: invalid value"));
}

#[test]
fn reports_missing_project() {
    let mut server = Server::new();
    let issue = server.mock("POST", "/rest/api/2/issue").expect(0).create();
    server
        .mock("GET", "/rest/api/2/project/DEMO")
        .with_status(404)
        .with_body(json!({"errorMessages": ["No project could be found with key 'DEMO'."]}).to_string())
        .create();

    let error = tracker()
        .create_issue(&config_for(&server.url()), &IssueRequest::new("t", "b"))
        .expect_err("expected missing project");

    assert_eq!(
        error,
        IssueError::ProjectNotFound {
            tracker: "Jira",
            project: "DEMO".to_string(),
        }
    );
    issue.assert();
}

#[test]
fn hides_rejected_credentials_behind_fixed_message() {
    let mut server = Server::new();
    server
        .mock("GET", "/rest/api/2/project/DEMO")
        .with_status(401)
        .with_body("Unauthorized: bad password for alice")
        .create();

    let error = tracker()
        .create_issue(&config_for(&server.url()), &IssueRequest::new("t", "b"))
        .expect_err("expected auth failure");

    assert_eq!(error.to_string(), TRANSPORT_MESSAGE);
}

#[test]
fn hides_server_errors_on_submit_behind_fixed_message() {
    let mut server = Server::new();
    server
        .mock("GET", "/rest/api/2/project/DEMO")
        .with_status(200)
        .with_body(project_body())
        .create();
    server
        .mock("POST", "/rest/api/2/issue")
        .with_status(503)
        .create();

    let error = tracker()
        .create_issue(&config_for(&server.url()), &IssueRequest::new("t", "b"))
        .expect_err("expected transport failure");

    assert_eq!(error.to_string(), TRANSPORT_MESSAGE);
}

#[test]
fn hides_connection_failures_behind_fixed_message() {
    let error = tracker()
        .create_issue(&config_for("http://127.0.0.1:1"), &IssueRequest::new("t", "b"))
        .expect_err("expected connection failure");

    assert_eq!(error, IssueError::AuthOrTransport { tracker: "Jira" });
    assert_eq!(error.to_string(), TRANSPORT_MESSAGE);
    assert!(!error.to_string().contains("127.0.0.1"));
}

#[test]
fn gives_up_on_unresponsive_tracker_after_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener");
    let address = listener.local_addr().expect("address");
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });

    let started = Instant::now();
    let error = JiraIssueTracker::with_timeout(Duration::from_millis(300))
        .create_issue(
            &config_for(&format!("http://{address}")),
            &IssueRequest::new("t", "b"),
        )
        .expect_err("expected timeout");

    assert_eq!(error, IssueError::AuthOrTransport { tracker: "Jira" });
    assert!(started.elapsed() < Duration::from_secs(3));
}
