mod cli_args;
mod registry;
mod telemetry;

use std::{process::ExitCode, time::Instant};

use anyhow::{anyhow, Result};
use cli_args::{parse_invocation, print_help, Command, Invocation};
use issuegate_config::Configuration;
use issuegate_domain::{IssueError, IssueRequest, IssueTracker};
use issuegate_jira::BodyTemplate;
use telemetry::Telemetry;
use tracing::error;

fn main() -> ExitCode {
    let telemetry = Telemetry::from_env();
    telemetry::init_logging(telemetry);

    match parse_invocation().and_then(|invocation| run(invocation, telemetry)) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn run(invocation: Invocation, telemetry: Telemetry) -> Result<ExitCode> {
    if invocation.command == Command::Help {
        print_help();
        return Ok(ExitCode::SUCCESS);
    }

    let tracker = registry::tracker_for(&invocation.tracker).ok_or_else(|| {
        anyhow!(
            "unknown issue tracker '{}' (available: {})",
            invocation.tracker,
            registry::AVAILABLE.join(", ")
        )
    })?;

    if invocation.command == Command::Fields {
        print_fields(tracker.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let config = match invocation.config_path.as_deref() {
        Some(path) => Configuration::load_from_path(path, tracker.label())?,
        None => Configuration::load_default(tracker.label())?,
    };

    match invocation.command {
        Command::Check => Ok(check(tracker.as_ref(), &config)),
        Command::Home => match tracker.issue_tracker_home_url(&config) {
            Some(url) => {
                println!("{url}");
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("{} site is not configured", tracker.label());
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Create {
            title,
            body,
            reporter,
            open,
        } => {
            let mut request = IssueRequest::new(title, body);
            request.reporter = reporter;
            Ok(file_issue(tracker.as_ref(), &config, &request, open, telemetry))
        }
        Command::Report {
            problem,
            reporter,
            open,
        } => {
            let template = BodyTemplate::new()?;
            let request = template.issue_request(&problem, reporter.as_deref())?;
            Ok(file_issue(tracker.as_ref(), &config, &request, open, telemetry))
        }
        Command::Fields | Command::Help => Ok(ExitCode::SUCCESS),
    }
}

fn print_fields(tracker: &dyn IssueTracker) {
    println!("{}", tracker.note());
    for field in tracker.fields() {
        let requirement = if field.optional { "optional" } else { "required" };
        println!(
            "{:<14} {:<18} {:<9} {}",
            field.key, field.label, requirement, field.placeholder
        );
    }
}

fn check(tracker: &dyn IssueTracker, config: &Configuration) -> ExitCode {
    let configured = tracker.is_configured(config);
    let errors = tracker.validate(config);

    println!("configured: {}", if configured { "yes" } else { "no" });
    for error in &errors {
        match error.field {
            Some(field) => println!("  {field}: {}", error.message),
            None => println!("  {}", error.message),
        }
    }

    if configured && errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn file_issue(
    tracker: &dyn IssueTracker,
    config: &Configuration,
    request: &IssueRequest,
    open: bool,
    telemetry: Telemetry,
) -> ExitCode {
    if !tracker.is_configured(config) {
        eprintln!(
            "{} is not configured; run `issuegate check` for details",
            tracker.label()
        );
        return ExitCode::FAILURE;
    }

    let started = Instant::now();
    match tracker.create_issue(config, request) {
        Ok(url) => {
            telemetry.emit_success("create_issue", started.elapsed());
            println!("{url}");
            if open {
                if let Err(error) = webbrowser::open(&url) {
                    error!(error = %error, "failed to open browser");
                }
            }
            ExitCode::SUCCESS
        }
        Err(issue_error) => {
            report_failure(&issue_error, started, telemetry);
            ExitCode::FAILURE
        }
    }
}

fn report_failure(issue_error: &IssueError, started: Instant, telemetry: Telemetry) {
    let message = issue_error.to_string();
    telemetry.emit_failure("create_issue", started.elapsed(), &message);
    eprintln!("{message}");
}
