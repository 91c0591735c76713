//! postsweep - delete every post on your X account except the newest one

use std::sync::Arc;

use clap::Parser;
use libpostsweep::logging::{LogFormat, LoggingConfig};
use libpostsweep::platforms::x::XClient;
use libpostsweep::{Config, DeletionScheduler, Result, RunOutcome, SystemClock};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "postsweep")]
#[command(version)]
#[command(about = "Delete all of your posts except the newest one, waiting out rate limits")]
#[command(long_about = "Delete all of your posts except the newest one, waiting out rate limits.

Credentials are read from the environment (or a .env file in the working
directory): TWITTER_USERNAME, TWITTER_API_KEY, TWITTER_API_SECRET,
TWITTER_ACCESS_TOKEN and TWITTER_ACCESS_TOKEN_SECRET.

Schedule settings can be overridden in a TOML file pointed to by
POSTSWEEP_CONFIG (default: ~/.config/postsweep/config.toml).")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format: text, json or pretty (overrides POSTSWEEP_LOG_FORMAT)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// List the posts that would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Values already in the environment take precedence over .env
    dotenvy::dotenv().ok();

    let mut logging = LoggingConfig::from_env();
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }
    logging.verbose = cli.verbose;
    logging.init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    let mut options = config.scheduler_options();
    options.dry_run = cli.dry_run;

    let client = XClient::from_config(config)?;
    let mut scheduler = DeletionScheduler::new(Box::new(client), Arc::new(SystemClock), options);

    match scheduler.run().await {
        RunOutcome::DryRun { candidates } => {
            for id in &candidates {
                println!("{}", id);
            }
        }
        outcome => info!(?outcome, "Run finished"),
    }

    Ok(())
}
