mod app;
mod cache;
mod config;
mod event;
mod lambda;
mod logging;
mod output;
mod query;
mod reconcile;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "l9s")]
#[command(about = "List AWS Lambda functions, served from a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/l9s/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// AWS profile name, used to namespace the cache
  #[arg(short, long)]
  profile: Option<String>,

  /// AWS region to list functions in
  #[arg(short, long)]
  region: Option<String>,

  /// Minutes before the cached listing is refreshed
  #[arg(long)]
  ttl: Option<u32>,

  /// Always go to the API and never touch the on-disk cache
  #[arg(long)]
  no_cache: bool,

  /// Print JSON instead of a table
  #[arg(long)]
  json: bool,

  /// Only show functions whose name contains this (case-insensitive)
  #[arg(short, long)]
  filter: Option<String>,

  /// Keep running and refresh the listing periodically
  #[arg(short, long)]
  watch: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init()?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line overrides
  if let Some(profile) = args.profile {
    config.aws.profile = profile;
  }
  if let Some(region) = args.region {
    config.aws.region = region;
  }
  if let Some(ttl) = args.ttl {
    config.cache.ttl_minutes = ttl;
  }
  config.validate()?;

  info!(
    profile = %config.aws.profile,
    region = %config.aws.region,
    ttl_minutes = config.cache.ttl_minutes,
    "starting l9s"
  );

  let options = app::RunOptions {
    format: if args.json {
      output::Format::Json
    } else {
      output::Format::Text
    },
    filter: args.filter,
    watch: args.watch,
    no_cache: args.no_cache,
  };

  // Initialize and run the app
  let mut app = app::App::new(&config, options)?;
  app.run().await
}
