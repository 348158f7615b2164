mod config;
mod fame;
mod pr;
mod report;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// github-fame: summarize contributions to a GitHub repository by adding up
/// the lines changed in each author's pull requests.
#[derive(Parser, Debug)]
#[command(name = "github-fame", version, about)]
struct Cli {
    /// GitHub repository, as 'owner/repo' or https://github.com/owner/repo
    repository: String,

    /// GitHub API token; raises the rate limit and gives access to private repositories
    #[arg(short, long)]
    token: Option<String>,

    /// Include only pull requests created by this user (uses the search API, max 1000 results)
    #[arg(short = 'a', long, value_name = "LOGIN")]
    filter_author: Option<String>,

    /// Do not apply the default exclusion globs (package-lock.json, *min.js, *min.css)
    #[arg(short = 'd', long)]
    disable_default_exclude_globs: bool,

    /// Exclude files matching this glob (repeatable or comma-separated)
    #[arg(short = 'e', long, value_name = "GLOB", value_delimiter = ',')]
    exclude_glob: Vec<String>,

    /// Exclude a pull request by number (repeatable or comma-separated)
    #[arg(long, value_name = "NUMBER", value_delimiter = ',')]
    exclude_pr: Vec<u64>,

    /// Include pull requests that were closed without merging
    #[arg(long)]
    include_unmerged: bool,

    /// List every changed file per author and log each counted or ignored file
    #[arg(short, long)]
    verbose: bool,

    /// Optional output file path for a markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Command-line globs first, then config globs, then the defaults.
    fn exclude_globs(&self, config: &config::Config) -> Result<fame::ExcludeGlobs, fame::FameError> {
        let mut patterns: Vec<String> = self.exclude_glob.clone();
        patterns.extend(config.exclude.globs.iter().cloned());
        if !self.disable_default_exclude_globs && !config.exclude.disable_default_globs {
            patterns.extend(fame::DEFAULT_EXCLUDE_GLOBS.iter().map(|g| g.to_string()));
        }
        fame::ExcludeGlobs::new(patterns.as_slice())
    }

    fn selection(&self, config: &config::Config) -> pr::Selection {
        let mut exclude_prs = self.exclude_pr.clone();
        exclude_prs.extend(config.exclude.prs.iter().copied());
        pr::Selection {
            filter_author: self.filter_author.clone(),
            exclude_prs,
            include_unmerged: self.include_unmerged,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "github_fame=debug"
    } else {
        "github_fame=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let repo = pr::RepoId::parse(&cli.repository)?;
    let _main_span = info_span!("github_fame", repo = %repo).entered();

    info!("loading configuration");
    let config = config::Config::load()?;

    let globs = cli.exclude_globs(&config)?;
    info!(globs = ?globs.patterns(), "using exclude globs");
    let selection = cli.selection(&config);

    let client = pr::GitHubClient::new(config.api_url(), config.github_token(cli.token.as_deref()))?;

    let pulls = pr::enumerate(&client, &repo, &selection).await?;
    debug!(prs = ?pulls.iter().map(|p| p.number).collect::<Vec<_>>(), "pull requests to analyze");

    let totals = fame::collect(&client, &repo, &pulls, &globs).await?;
    if totals.is_empty() {
        warn!("no pull requests matched; check the repository name and filters");
    }

    info!("generating report");
    let built_report = report::build(&totals, &repo, pulls.len(), &globs);
    report::output(&built_report, cli.output.as_deref(), cli.verbose)?;
    info!(authors = built_report.authors.len(), "done");

    Ok(())
}
