// Twitch Tools - Main Entry Point
//
// Command-line front end for:
// - follow listings (paginated, resumable)
// - user lookups
// - rate-limited bulk chat commands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;
use twitch_tools::chat::TwitchChatSession;
use twitch_tools::config::Config;
use twitch_tools::console;
use twitch_tools::dispatch::{
    normalize_targets, BatchDispatcher, BatchJob, BatchReport, CommandTemplate,
};
use twitch_tools::helix::{FollowOrigin, FollowQuery, HelixClient, UserQuery};
use twitch_tools::output::{self, FollowCsv, UserSort};
use twitch_tools::pagination::{PaginationEngine, PaginationState, Termination};
use twitch_tools::rate_limit::RateLimitConfig;

/// Twitch Tools: follows, user info and bulk moderation
#[derive(Parser, Debug)]
#[command(name = "twitch-tools")]
#[command(version)]
#[command(about = "Command-line tools for Twitch follows, user lookups and bulk chat commands", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Origin {
    /// Channels the user follows
    From,
    /// Users following the channel
    To,
}

impl From<Origin> for FollowOrigin {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::From => FollowOrigin::From,
            Origin::To => FollowOrigin::To,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a list of follows
    Follows {
        /// `from`: channels the user follows, `to`: the channel's followers
        #[arg(value_enum)]
        origin: Origin,

        /// User login (or ID with --is-id)
        user: String,

        /// The user argument is a user ID rather than a login
        #[arg(short = 'i', long)]
        is_id: bool,

        /// Number of follows to fetch
        #[arg(short, long, default_value_t = 100)]
        limit: usize,

        /// Cursor to start fetching from
        #[arg(long, value_name = "CURSOR")]
        after: Option<String>,

        /// Print the last cursor after a successful run
        #[arg(long)]
        print_cursor: bool,
    },

    /// Print user info; reads users from stdin when none are given
    Info {
        /// User logins (or IDs with --is-id)
        users: Vec<String>,

        /// The users are IDs rather than logins
        #[arg(short = 'i', long)]
        is_id: bool,

        /// Sort results
        #[arg(short, long, value_enum)]
        sort: Option<UserSort>,
    },

    /// Execute a command in a channel for each user read from stdin
    Bantool {
        /// Channel to execute the commands in
        channel: String,

        /// Command to execute (default from config, normally `ban`)
        command: Option<String>,

        /// Command arguments, joined with spaces
        arguments: Vec<String>,

        /// Maximum number of commands per period
        #[arg(short, long)]
        limit: Option<u32>,

        /// Period length in seconds
        #[arg(short, long)]
        period: Option<u64>,

        /// Keep the connection open until `q` is pressed
        #[arg(short, long)]
        wait: bool,

        /// Chat login (overrides TW_LOGIN)
        #[arg(long)]
        login: Option<String>,

        /// Chat token (overrides TW_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config, args.verbose)?;
    info!("🎮 twitch-tools v{} starting...", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping...");
                cancel.cancel();
            }
        });
    }

    match args.command {
        Commands::Follows {
            origin,
            user,
            is_id,
            limit,
            after,
            print_cursor,
        } => {
            run_follows(
                &config,
                FollowsArgs {
                    origin: origin.into(),
                    user,
                    is_id,
                    limit,
                    after,
                    print_cursor,
                },
                &cancel,
            )
            .await
        }
        Commands::Info { users, is_id, sort } => {
            run_info(&config, users, is_id, sort, &cancel).await
        }
        Commands::Bantool {
            channel,
            command,
            arguments,
            limit,
            period,
            wait,
            login,
            token,
            yes,
        } => {
            let command = command.unwrap_or_else(|| config.bantool.command.clone());
            let template = CommandTemplate::new(channel, command, arguments.join(" "));
            let limits = RateLimitConfig::new(
                limit.unwrap_or(config.bantool.limit),
                period.unwrap_or(config.bantool.period_secs),
            );
            run_bantool(
                &config,
                template,
                limits,
                BantoolOptions {
                    wait,
                    login,
                    token,
                    yes,
                },
                &cancel,
            )
            .await
        }
    }
}

/// Initialize tracing on stderr with the configured format
fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
    Ok(())
}

struct FollowsArgs {
    origin: FollowOrigin,
    user: String,
    is_id: bool,
    limit: usize,
    after: Option<String>,
    print_cursor: bool,
}

/// Stream a follow listing as CSV
async fn run_follows(config: &Config, args: FollowsArgs, cancel: &CancellationToken) -> Result<()> {
    let client = HelixClient::new(&config.helix()).context("Failed to create Helix client")?;

    let user_id = if args.is_id {
        args.user
    } else {
        client.resolve_user_id(&args.user).await?
    };
    let query = FollowQuery {
        origin: args.origin,
        user_id,
    };

    let mut csv = FollowCsv::new(io::stdout(), Some(args.limit));
    csv.write_header().context("Failed to write output")?;

    let mut write_error: Option<io::Error> = None;
    let engine = PaginationEngine::new(config.api.page_size);
    let result = engine
        .run(
            |request| client.get_follows(&query, request),
            |_previous, request| client.get_follows(&query, request),
            |page, _state| {
                if write_error.is_none() {
                    if let Err(e) = csv.write_page(page) {
                        error!("Failed to write output: {}", e);
                        write_error = Some(e);
                    }
                }
            },
            PaginationState::should_continue,
            PaginationState::resume(args.after, Some(args.limit)),
            cancel,
        )
        .await;

    match result {
        Ok(report) => {
            info!(
                "Fetched {} follows in {} requests",
                report.state.retrieved(),
                report.state.requests()
            );
            if report.termination == Termination::Cancelled {
                anyhow::bail!("Interrupted after {} follows", report.state.retrieved());
            }
            if let Some(e) = write_error {
                return Err(e).context("Failed to write output");
            }
            if args.print_cursor {
                print_cursor(report.state.cursor());
            }
            Ok(())
        }
        Err(e) => {
            print_cursor(e.resume_cursor());
            Err(anyhow::Error::new(e.source).context(format!(
                "Page request #{} failed after {} follows",
                e.state.requests(),
                e.state.retrieved()
            )))
        }
    }
}

fn print_cursor(cursor: Option<&str>) {
    if let Some(cursor) = cursor {
        println!("Last cursor: {}", cursor);
    }
}

/// Look up one or many users
async fn run_info(
    config: &Config,
    users: Vec<String>,
    is_id: bool,
    sort: Option<UserSort>,
    cancel: &CancellationToken,
) -> Result<()> {
    let users = if users.is_empty() {
        console::read_targets("Enter users:").context("Failed to read users from stdin")?
    } else {
        normalize_targets(users)
    };
    if users.is_empty() {
        anyhow::bail!("No users given");
    }

    let client = HelixClient::new(&config.helix()).context("Failed to create Helix client")?;
    let query = if is_id {
        UserQuery::Ids(users.clone())
    } else {
        UserQuery::Logins(users.clone())
    };

    let mut found = tokio::select! {
        _ = cancel.cancelled() => anyhow::bail!("Interrupted"),
        result = client.get_users(&query) => result?,
    };

    let mut stdout = io::stdout().lock();
    if let [single] = users.as_slice() {
        let user = found
            .first()
            .with_context(|| format!("Could not find user: {}", single))?;
        output::write_user_detail(&mut stdout, user)?;
        return Ok(());
    }

    output::sort_users(&mut found, sort);
    output::write_user_table(&mut stdout, &found)?;
    let missing = output::missing_users(&users, &found, is_id);
    output::write_missing(&mut stdout, &missing)?;
    stdout.flush()?;
    Ok(())
}

struct BantoolOptions {
    wait: bool,
    login: Option<String>,
    token: Option<String>,
    yes: bool,
}

/// Run one chat command per user read from stdin
async fn run_bantool(
    config: &Config,
    template: CommandTemplate,
    limits: RateLimitConfig,
    options: BantoolOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let chat = config.chat(options.login.as_deref(), options.token.as_deref())?;
    let limiter = limits.build().context("Invalid rate limit")?;

    let targets = console::read_targets("Enter usernames:")
        .context("Failed to read usernames from stdin")?;
    let job = BatchJob::new(targets, template, limits);
    if job.is_empty() {
        info!("No users given, nothing to do");
        return Ok(());
    }

    let question = format!(
        "Running command: \"{}\" on {} users, continue?",
        job.template().preview(),
        job.len()
    );
    if !options.yes && !console::confirm(&question, true)? {
        info!("Abort.");
        return Ok(());
    }

    let session = Arc::new(TwitchChatSession::new(chat));
    let dispatcher =
        BatchDispatcher::new(Arc::new(limiter)).with_ready_timeout(config.ready_timeout());

    let hold_open = options.wait && io::stdin().is_terminal();
    let hold_cancel = cancel.clone();
    let hold = async move {
        if hold_open {
            info!("Press q to quit.");
            if let Err(e) = console::wait_for_key('q', hold_cancel).await {
                warn!("Could not read the terminal: {}", e);
            }
        }
    };

    info!(
        "Sending {} commands to #{} ({} per {}s)",
        job.len(),
        job.template().channel(),
        limits.limit,
        limits.period_secs
    );
    match dispatcher.run_with_hold(session, &job, cancel, hold).await {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(e) => {
            if let Some(report) = e.report() {
                print_summary(report);
            }
            Err(e.into())
        }
    }
}

fn print_summary(report: &BatchReport) {
    println!(
        "Sent {} of {} commands ({} failed, {} skipped)",
        report.succeeded(),
        report.total,
        report.admitted() - report.succeeded(),
        report.skipped.len()
    );
    for outcome in report.failed() {
        if let Err(e) = &outcome.result {
            println!("  {}: {}", outcome.target, e);
        }
    }
}
