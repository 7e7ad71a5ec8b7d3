use handlebars::{no_escape, Handlebars};
use issuegate_domain::{IssueError, IssueRequest, Problem};

const TEMPLATE_NAME: &str = "issue_body";
const TEMPLATE_SOURCE: &str = include_str!("../templates/issue_body.hbs");

/// Compiled issue body template. Build once at startup and share by reference.
pub struct BodyTemplate {
    registry: Handlebars<'static>,
}

impl BodyTemplate {
    pub fn new() -> Result<Self, IssueError> {
        let mut registry = Handlebars::new();
        // Jira wiki markup, not HTML.
        registry.register_escape_fn(no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, TEMPLATE_SOURCE)
            .map_err(|error| IssueError::BodyRender(error.to_string()))?;
        Ok(Self { registry })
    }

    pub fn render(&self, problem: &Problem) -> Result<String, IssueError> {
        self.registry
            .render(TEMPLATE_NAME, problem)
            .map_err(|error| IssueError::BodyRender(error.to_string()))
    }

    pub fn issue_request(
        &self,
        problem: &Problem,
        reporter: Option<&str>,
    ) -> Result<IssueRequest, IssueError> {
        let mut request = IssueRequest::from_problem(problem, self.render(problem)?);
        request.reporter = reporter.map(str::to_string);
        Ok(request)
    }
}
