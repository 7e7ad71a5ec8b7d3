use issuegate_domain::IssueTracker;
use issuegate_jira::JiraIssueTracker;

pub const AVAILABLE: [&str; 1] = [issuegate_jira::LABEL];

pub fn tracker_for(name: &str) -> Option<Box<dyn IssueTracker>> {
    match name.trim().to_ascii_lowercase().as_str() {
        issuegate_jira::LABEL => Some(Box::new(JiraIssueTracker::new())),
        _ => None,
    }
}
