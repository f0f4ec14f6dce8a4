use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use gh_client::{
    client::{self, GithubClient},
    config::{default_config_path, load_config},
    domain::{
        AuthenticatedUser, Issue, ListOptions, PullRequest, RateLimitInfo, Repository, StateFilter,
    },
    logging::{LoggingConfig, init_logging},
};
use serde::Serialize;

/// Query the GitHub REST API with automatic pagination and retries
#[derive(Parser)]
#[command(name = "gh-client", version, about)]
struct Cli {
    /// Configuration file (default: <config dir>/gh-client.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Give up on the whole command after this many seconds, retries included
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the authenticated user
    Whoami,
    /// Show the remaining core request quota
    RateLimit,
    /// List repositories of OWNER you can push to
    Repos { owner: String },
    /// List issues of OWNER/REPO
    Issues {
        owner: String,
        repo: String,
        /// open, closed or all
        #[arg(long, default_value = "open")]
        state: StateFilter,
    },
    /// List pull requests of OWNER/REPO
    Pulls {
        owner: String,
        repo: String,
        /// open, closed or all
        #[arg(long, default_value = "open")]
        state: StateFilter,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum Output {
    User(AuthenticatedUser),
    RateLimit(RateLimitInfo),
    Repositories(Vec<Repository>),
    Issues(Vec<Issue>),
    PullRequests(Vec<PullRequest>),
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let app_config = load_config(&config_path)?.with_env_overrides()?;

    let mut logging = LoggingConfig::from_env(app_config.log_level.as_deref());
    if cli.debug {
        logging = logging.with_level("debug");
    }
    let _log_guard = init_logging(&logging)?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), path = %config_path.display(), "gh-client starting");

    let client = GithubClient::new(app_config.client_config()?)?;

    let output = match cli.timeout {
        Some(secs) => client::with_deadline(Duration::from_secs(secs), run(&client, cli.command)).await?,
        None => run(&client, cli.command).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &GithubClient, command: Command) -> client::Result<Output> {
    let output = match command {
        Command::Whoami => Output::User(client.test_connection().await?),
        Command::RateLimit => Output::RateLimit(client.get_rate_limit_info().await?),
        Command::Repos { owner } => Output::Repositories(client.list_repositories(&owner).await?),
        Command::Issues { owner, repo, state } => {
            let options = ListOptions::default().with_state(state);
            Output::Issues(client.get_issues(&owner, &repo, &options).await?)
        },
        Command::Pulls { owner, repo, state } => {
            let options = ListOptions::default().with_state(state);
            Output::PullRequests(client.get_pull_requests(&owner, &repo, &options).await?)
        },
    };
    Ok(output)
}
