//! `quarry list`: print every repository of the configured connection.

use std::process::ExitCode;

use clap::ValueEnum;
use quarry::{BitbucketCloudSource, Repo, rate_limits};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::progress::LoggingReporter;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Options for the list command.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ListArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Also list repositories of this team (repeatable)
    #[arg(short, long = "team")]
    pub teams: Vec<String>,

    /// Clone over SSH instead of HTTPS
    #[arg(long)]
    pub ssh: bool,

    /// Disable proactive rate limiting (may cause API throttling)
    #[arg(short = 'R', long)]
    pub no_rate_limit: bool,
}

/// Handle the list command.
///
/// Repositories that were fetched are printed even when some queries
/// failed; the failures go to stderr and make the exit status non-zero.
pub(crate) async fn handle_list(
    args: ListArgs,
    config: Config,
    cancel: CancellationToken,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let svc = config.external_service();
    let urn = svc.urn();

    let mut connection = config.bitbucket;
    connection.teams.extend(args.teams);
    if args.ssh {
        connection.git_url_type = quarry::GitUrlType::Ssh;
    }
    if args.no_rate_limit {
        connection.requests_per_second = None;
    } else if connection.requests_per_second.is_none() {
        connection.requests_per_second = Some(rate_limits::BITBUCKET_CLOUD_DEFAULT_RPS);
    }

    let source = BitbucketCloudSource::new(svc, connection, None)?;
    let reporter = LoggingReporter::new().into_callback();

    let listing = source.list_repos(&cancel, Some(&reporter)).await;

    match args.output {
        OutputFormat::Table => print_table(&listing.repos, &urn),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing.repos)?),
    }

    match listing.error {
        None => Ok(ExitCode::SUCCESS),
        Some(err) => {
            eprintln!(
                "{} of the queries failed; the listing above is incomplete.",
                err.len()
            );
            for cause in err.errors() {
                eprintln!("  - {}", cause);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

#[derive(Debug, tabled::Tabled)]
struct RepoRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Fork")]
    fork: String,
    #[tabled(rename = "Clone URL")]
    clone_url: String,
}

impl RepoRow {
    fn new(repo: &Repo, urn: &str) -> Self {
        Self {
            name: repo.name.clone(),
            fork: if repo.fork { "yes" } else { "" }.to_string(),
            clone_url: repo.clone_url(urn).map(redact_password).unwrap_or_default(),
        }
    }
}

fn print_table(repos: &[Repo], urn: &str) {
    if repos.is_empty() {
        println!("No repositories found.");
        return;
    }

    let rows: Vec<RepoRow> = repos.iter().map(|r| RepoRow::new(r, urn)).collect();
    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    println!("{}", table);
    println!("{} repositories", repos.len());
}

/// Replace the password of a URL with `***` for display.
///
/// Anything that does not parse as a URL with a password is returned as is.
fn redact_password(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };
    if url.password().is_none() || url.set_password(Some("***")).is_err() {
        return raw.to_string();
    }
    url.to_string()
}
