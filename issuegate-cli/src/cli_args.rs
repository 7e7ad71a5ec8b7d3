use std::{env, path::PathBuf};

use anyhow::{anyhow, bail, Result};
use issuegate_domain::Problem;

const DEFAULT_TRACKER: &str = "jira";

#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub tracker: String,
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Fields,
    Check,
    Home,
    Create {
        title: String,
        body: String,
        reporter: Option<String>,
        open: bool,
    },
    Report {
        problem: Problem,
        reporter: Option<String>,
        open: bool,
    },
    Help,
}

pub fn parse_invocation() -> Result<Invocation> {
    parse_args(env::args().skip(1))
}

pub fn print_help() {
    println!("issuegate - file error-tracker problems in an issue tracker");
    println!("Usage:");
    println!("  issuegate [--config <path>] [--tracker <name>] <command> [options]");
    println!("Commands:");
    println!("  fields                          List the tracker's configuration fields");
    println!("  check                           Report whether the configuration is usable");
    println!("  home                            Print the tracker home URL");
    println!("  create --title <t> [--body <b>] File an issue with the given text");
    println!("  report --environment <e> --location <l> --message <m>");
    println!("                                  File an issue for an error-tracker problem");
    println!("Options:");
    println!("  --config <path>      Configuration file (default ~/.config/issuegate/config.yaml)");
    println!("  --tracker <name>     Tracker adapter to use (default jira)");
    println!("  --reporter <name>    Identity reporting the issue");
    println!("  --open               Open the created issue in a browser");
    println!("  --app <name>, --error-class <c>, --url <u>, --occurrences <n>,");
    println!("  --first-noticed <ts>, --last-noticed <ts>   Extra problem details for report");
}

fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut config_path = None;
    let mut tracker = DEFAULT_TRACKER.to_string();
    let mut command_name: Option<String> = None;
    let mut title = None;
    let mut body = None;
    let mut reporter = None;
    let mut open = false;
    let mut problem = Problem::default();
    let mut environment = None;
    let mut location = None;
    let mut message = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value_for = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(value_for("--config")?)),
            "--tracker" => tracker = value_for("--tracker")?,
            "--title" => title = Some(value_for("--title")?),
            "--body" => body = Some(value_for("--body")?),
            "--reporter" => reporter = Some(value_for("--reporter")?),
            "--environment" => environment = Some(value_for("--environment")?),
            "--location" => location = Some(value_for("--location")?),
            "--message" => message = Some(value_for("--message")?),
            "--app" => problem.app_name = value_for("--app")?,
            "--error-class" => problem.error_class = Some(value_for("--error-class")?),
            "--url" => problem.url = Some(value_for("--url")?),
            "--occurrences" => {
                let raw = value_for("--occurrences")?;
                problem.occurrences = raw
                    .parse()
                    .map_err(|_| anyhow!("--occurrences expects a number, got '{raw}'"))?;
            }
            "--first-noticed" => problem.first_noticed_at = Some(value_for("--first-noticed")?),
            "--last-noticed" => problem.last_noticed_at = Some(value_for("--last-noticed")?),
            "--open" => open = true,
            "--help" | "-h" => command_name = Some("help".to_string()),
            other if other.starts_with('-') => bail!("Unknown argument: {other}"),
            other => {
                if let Some(previous) = &command_name {
                    bail!("Unexpected command '{other}' after '{previous}'");
                }
                command_name = Some(other.to_string());
            }
        }
    }

    let command = match command_name.as_deref() {
        None | Some("help") => Command::Help,
        Some("fields") => Command::Fields,
        Some("check") => Command::Check,
        Some("home") => Command::Home,
        Some("create") => Command::Create {
            title: title.ok_or_else(|| anyhow!("create requires --title"))?,
            body: body.unwrap_or_default(),
            reporter,
            open,
        },
        Some("report") => {
            problem.environment =
                environment.ok_or_else(|| anyhow!("report requires --environment"))?;
            problem.location = location.ok_or_else(|| anyhow!("report requires --location"))?;
            problem.message = message.ok_or_else(|| anyhow!("report requires --message"))?;
            Command::Report {
                problem,
                reporter,
                open,
            }
        }
        Some(other) => bail!("Unknown command: {other}"),
    };

    Ok(Invocation {
        config_path,
        tracker,
        command,
    })
}
