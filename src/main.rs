use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use curtis::client::Client;
use curtis::commands;
use curtis::config::{
    load_config, DEFAULT_AGE_OF_ISSUES_TO_MARK_AS_SEEN, DEFAULT_AGE_OF_ISSUES_TO_RESOLVE,
    DEFAULT_TREND_PERIOD, DEFAULT_TREND_THRESHOLD, MAX_AGE_DAYS,
};
use curtis::filters::{IncludeMode, TitleFilter};
use curtis::prompt::TerminalPrompt;
use curtis::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "curtis")]
#[command(about = "Triage issues of a Sentry server in bulk")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./curtis.ini, then ~/.curtis.ini)
    #[arg(long, global = true, env = "CURTIS_CONFIG")]
    config_file: Option<PathBuf>,

    /// Site section to use from the configuration file
    #[arg(long, global = true, env = "CURTIS_SITE")]
    site: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TitleArgs {
    /// Regular expression issue titles must match (repeatable)
    #[arg(short = 'f', long = "include")]
    include: Vec<String>,

    /// Regular expression excluding matching titles (repeatable)
    #[arg(short = 'e', long = "exclude")]
    exclude: Vec<String>,

    /// How several --include patterns combine
    #[arg(long, value_enum, default_value_t = IncludeMode::All)]
    include_mode: IncludeMode,
}

impl TitleArgs {
    fn filter(&self) -> Result<TitleFilter> {
        TitleFilter::new(self.include.as_slice(), self.exclude.as_slice(), self.include_mode)
            .context("Invalid title pattern")
    }
}

/// Ages are whole days between 0 and [`MAX_AGE_DAYS`].
fn age_days() -> clap::builder::RangedI64ValueParser<i64> {
    clap::value_parser!(i64).range(0..=MAX_AGE_DAYS)
}

#[derive(Subcommand)]
enum Commands {
    /// Show assigned issues
    AssignedIssues,

    /// Show assigned issues grouped by assignee
    AssignedIssuesByAssignee,

    /// Browse recent unseen issues, opening them in the browser
    BrowseUnseenIssues {
        /// Only issues seen within this many days
        #[arg(long, default_value_t = DEFAULT_AGE_OF_ISSUES_TO_MARK_AS_SEEN, value_parser = age_days())]
        age: i64,
        #[command(flatten)]
        titles: TitleArgs,
    },

    /// Show reviewed issues whose event rate is growing
    CheckTrends {
        /// Comparison window: 1h to 12h, or 1d to 7d
        #[arg(long, default_value = DEFAULT_TREND_PERIOD)]
        period: String,
        /// Issues whose ratio stays below this are not shown
        #[arg(long, default_value_t = DEFAULT_TREND_THRESHOLD)]
        threshold: f64,
        #[command(flatten)]
        titles: TitleArgs,
    },

    /// Mark issues not seen for a while as seen
    MarkAsSeen {
        /// Age in days
        #[arg(long, default_value_t = DEFAULT_AGE_OF_ISSUES_TO_MARK_AS_SEEN, value_parser = age_days())]
        age: i64,
    },

    /// Merge issues sharing project, metadata and culprit
    MergeIssues,

    /// Show unassigned unresolved issues
    NeedsTriage,

    /// Resolve outdated issues
    ResolveIssues {
        /// Age in days
        #[arg(long, default_value_t = DEFAULT_AGE_OF_ISSUES_TO_RESOLVE, value_parser = age_days())]
        age: i64,
    },

    /// Delete outdated issues; commented issues are kept
    RemoveIssues {
        /// Age in days
        #[arg(long, default_value_t = DEFAULT_AGE_OF_ISSUES_TO_RESOLVE, value_parser = age_days())]
        age: i64,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = load_config(cli.config_file.as_deref(), cli.site.as_deref())?;
    debug!(site = %config.site, url = %config.url, "using site");
    let transport = HttpTransport::new(&config.token, config.timeout)?;
    let client = Client::new(transport, &config.url)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::AssignedIssues => commands::assigned::run(&client, &mut out),

        Commands::AssignedIssuesByAssignee => commands::assigned::by_assignee(&client, &mut out),

        Commands::BrowseUnseenIssues { age, titles } => {
            let filter = titles.filter()?;
            let mut prompt = TerminalPrompt::new();
            commands::browse::run(
                &client,
                &mut out,
                &mut prompt,
                |url: &str| webbrowser::open(url),
                age,
                filter,
            )
        }

        Commands::CheckTrends {
            period,
            threshold,
            titles,
        } => commands::check_trends::run(&client, &mut out, &period, threshold, titles.filter()?),

        Commands::MarkAsSeen { age } => commands::mark_seen::run(&client, &mut out, age),

        Commands::MergeIssues => commands::merge::run(&client, &mut out),

        Commands::NeedsTriage => commands::triage::run(&client, &mut out),

        Commands::ResolveIssues { age } => commands::resolve::run(&client, &mut out, age),

        Commands::RemoveIssues { age } => commands::remove::run(&client, &mut out, age),
    }
}
