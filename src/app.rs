use crate::cache::{CacheEntry, KeyValueStore, NoopStorage, SqliteStorage};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::lambda::client::LambdaClient;
use crate::lambda::fetcher::Fetcher;
use crate::output::{self, Format};
use crate::reconcile::{system_clock, Activation, Reconciler, View};
use color_eyre::Result;
use std::io::{stdout, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(50);

/// Shortest pause between watch-mode cycles
const MIN_WATCH_INTERVAL: Duration = Duration::from_secs(60);

/// How the list is shown
#[derive(Debug, Clone)]
pub struct RunOptions {
  pub format: Format,
  pub filter: Option<String>,
  /// Keep running and refresh every TTL
  pub watch: bool,
  /// Skip the on-disk cache entirely
  pub no_cache: bool,
}

/// Main application state
pub struct App {
  reconciler: Reconciler,
  region: String,
  refresh_every: Duration,
  options: RunOptions,

  /// Last list written to stdout, to avoid repeating it in watch mode
  last_printed: Option<View>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, options: RunOptions) -> Result<Self> {
    let client = LambdaClient::new(config)?;
    let fetcher = Fetcher::new(Arc::new(client), config.cache.max_pages);

    let reconciler = if options.no_cache {
      Self::build_reconciler(fetcher, NoopStorage, config)
    } else {
      Self::build_reconciler(fetcher, SqliteStorage::open()?, config)
    };

    let refresh_every =
      Duration::from_secs(u64::from(config.cache.ttl_minutes) * 60).max(MIN_WATCH_INTERVAL);

    Ok(Self {
      reconciler,
      region: config.aws.region.clone(),
      refresh_every,
      options,
      last_printed: None,
      should_quit: false,
    })
  }

  fn build_reconciler<S: KeyValueStore + 'static>(
    fetcher: Fetcher<LambdaClient>,
    storage: S,
    config: &Config,
  ) -> Reconciler {
    let entry = CacheEntry::new(Arc::new(storage), &config.aws.profile);
    Reconciler::new(fetcher, entry, config.ttl(), system_clock())
  }

  pub async fn run(&mut self) -> Result<ExitCode> {
    let refresh_every = self.options.watch.then_some(self.refresh_every);
    let mut events = EventHandler::new(TICK_RATE, refresh_every);

    self.reconciler.activate();
    let mut exit = ExitCode::SUCCESS;

    // Main loop
    while !self.should_quit {
      match events.next().await {
        Some(Event::Tick) => {
          if self.reconciler.poll() {
            let view = self.reconciler.view();
            debug!(
              count = view.functions.len(),
              source = ?view.source,
              loading = view.loading,
              "view changed"
            );
          }

          if self.reconciler.has_completed_cycle() {
            let view = self.reconciler.view();
            if let Some(code) = self.show(view)? {
              exit = code;
            }
            if !self.options.watch {
              self.should_quit = true;
            }
          }
        }
        Some(Event::Refresh) => {
          if self.reconciler.activate() == Activation::AlreadyRunning {
            info!("previous refresh still running, skipping this one");
          }
        }
        Some(Event::Quit) | None => {
          self.should_quit = true;
        }
      }
    }

    Ok(exit)
  }

  /// Print the view of a finished cycle, unless it was already printed
  fn show(&mut self, view: View) -> Result<Option<ExitCode>> {
    if self.last_printed.as_ref() == Some(&view) {
      return Ok(None);
    }

    let exit = if let Some(state) = view.terminal {
      eprintln!("{}", output::terminal_message(state));
      ExitCode::FAILURE
    } else {
      let kept = output::filter_functions(&view.functions, self.options.filter.as_deref());
      let presented = output::present(&kept, &self.region);

      let mut out = stdout().lock();
      output::write_functions(&mut out, &presented, self.options.format)?;
      out.flush()?;

      info!(
        shown = presented.len(),
        total = view.functions.len(),
        source = ?view.source,
        "printed function list"
      );
      ExitCode::SUCCESS
    };

    self.last_printed = Some(view);
    Ok(Some(exit))
  }
}
