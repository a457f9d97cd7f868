//! The refresh cycle: cache load and remote refresh running side by side.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::policy::{derive_view, needs_refresh, should_write_back, RemoteOutcome, View};
use crate::cache::{CacheEntry, KeyValueStore};
use crate::lambda::error::LambdaError;
use crate::lambda::fetcher::{Fetcher, FunctionsApi};
use crate::lambda::types::{FunctionCollection, FunctionRecord};
use crate::query::{Query, QueryState};

/// Source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Persists a listing that won the write-back decision
type WriteBack = Box<dyn Fn(&[FunctionRecord]) -> Result<()> + Send + Sync>;

pub fn system_clock() -> Clock {
  Arc::new(Utc::now)
}

/// Result of asking for a new cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
  Started,
  /// A cycle is still running; the request was ignored
  AlreadyRunning,
}

/// Coordinates the cached listing of one profile with the remote API.
///
/// Each cycle runs two tracks: one loads the cached listing, the other
/// refreshes it from the API when the cache is older than the TTL. Their
/// latest results feed [`derive_view`]; once both have settled the
/// write-back decision is taken.
pub struct Reconciler {
  cache_track: Query<FunctionCollection, String>,
  remote_track: Query<RemoteOutcome, LambdaError>,
  write_back: WriteBack,

  /// Latest settled cache load, kept across cycles
  cached: Option<FunctionCollection>,
  /// Remote result of the current cycle
  remote: Option<Result<RemoteOutcome, LambdaError>>,
  cache_loaded_this_cycle: bool,
  write_back_decided: bool,
  cycles: u64,
}

impl Reconciler {
  pub fn new<A, S>(fetcher: Fetcher<A>, entry: CacheEntry<S>, ttl: Duration, clock: Clock) -> Self
  where
    A: FunctionsApi + 'static,
    S: KeyValueStore + 'static,
  {
    let cache_entry = entry.clone();
    let cache_track = Query::new(
      move || {
        let entry = cache_entry.clone();
        async move { Ok::<_, String>(entry.load_functions()) }
      },
      || "cache load ended without a result".to_string(),
    );

    let remote_entry = entry.clone();
    let remote_track = Query::new(
      move || {
        let entry = remote_entry.clone();
        let fetcher = fetcher.clone();
        let clock = Arc::clone(&clock);
        async move { refresh_remote(&entry, &fetcher, &clock, ttl).await }
      },
      || LambdaError::Transport("refresh ended without a result".to_string()),
    );

    Self {
      cache_track,
      remote_track,
      write_back: Box::new(move |functions: &[FunctionRecord]| entry.store_functions(functions)),
      cached: None,
      remote: None,
      cache_loaded_this_cycle: false,
      write_back_decided: false,
      cycles: 0,
    }
  }

  /// Start a cycle unless one is already running.
  pub fn activate(&mut self) -> Activation {
    if self.is_cycle_in_progress() {
      debug!("refresh cycle already running, ignoring activation");
      return Activation::AlreadyRunning;
    }

    self.cycles += 1;
    info!(cycle = self.cycles, "starting refresh cycle");

    self.remote = None;
    self.cache_loaded_this_cycle = false;
    self.write_back_decided = false;
    self.cache_track.fetch();
    self.remote_track.fetch();

    Activation::Started
  }

  pub fn is_cycle_in_progress(&self) -> bool {
    self.cache_track.is_loading() || self.remote_track.is_loading()
  }

  /// Whether at least one cycle has run to completion
  pub fn has_completed_cycle(&self) -> bool {
    self.cycles > 0 && !self.is_cycle_in_progress()
  }

  /// Pick up finished tracks. Returns `true` if the view may have changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    if self.cache_track.poll() {
      changed = true;
      self.cache_loaded_this_cycle = true;
      self.cached = Some(match self.cache_track.state() {
        QueryState::Success(functions) => {
          debug!(count = functions.len(), "cache loaded");
          functions.clone()
        }
        QueryState::Error(e) => {
          warn!(error = %e, "cache load failed, treating cache as empty");
          Vec::new()
        }
        _ => Vec::new(),
      });
    }

    if self.remote_track.poll() {
      changed = true;
      self.remote = match self.remote_track.state() {
        QueryState::Success(outcome) => Some(Ok(outcome.clone())),
        QueryState::Error(e) => {
          warn!(error = %e, "remote refresh failed");
          Some(Err(e.clone()))
        }
        _ => None,
      };
    }

    if changed {
      self.decide_write_back();
    }
    changed
  }

  /// Current view, re-derived from the latest track results.
  pub fn view(&self) -> View {
    derive_view(self.cached.as_deref(), self.remote.as_ref())
  }

  fn decide_write_back(&mut self) {
    if self.write_back_decided || !self.cache_loaded_this_cycle {
      return;
    }
    let Some(remote) = &self.remote else {
      return;
    };
    self.write_back_decided = true;

    let Ok(RemoteOutcome::Fetched(fetched)) = remote else {
      return;
    };
    let cached_len = self.cached.as_ref().map_or(0, Vec::len);

    if should_write_back(cached_len, fetched) {
      info!(
        cached = cached_len,
        fetched = fetched.len(),
        "writing fetched functions to cache"
      );
      if let Err(e) = (self.write_back)(fetched) {
        warn!(error = %e, "failed to write functions to cache");
      }
    } else {
      info!(
        cached = cached_len,
        fetched = fetched.len(),
        "keeping cached functions"
      );
    }
  }
}

/// The remote track: fetch the listing unless the cache is still fresh.
async fn refresh_remote<A, S>(
  entry: &CacheEntry<S>,
  fetcher: &Fetcher<A>,
  clock: &Clock,
  ttl: Duration,
) -> Result<RemoteOutcome, LambdaError>
where
  A: FunctionsApi,
  S: KeyValueStore,
{
  let last_fetch = entry.last_fetch();
  if !needs_refresh(last_fetch, clock(), ttl) {
    debug!(?last_fetch, "cache is fresh, skipping remote refresh");
    return Ok(RemoteOutcome::Skipped);
  }

  let functions = fetcher.fetch_all().await?;
  // The listing drained, so the staleness clock resets whatever the
  // write-back decision turns out to be
  if let Err(e) = entry.set_last_fetch(clock()) {
    warn!(error = %e, "failed to record fetch time");
  }
  Ok(RemoteOutcome::Fetched(functions))
}
