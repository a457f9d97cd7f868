//! Decisions of the refresh cycle, as pure functions of the track results.

use chrono::{DateTime, Duration, Utc};

use crate::lambda::error::LambdaError;
use crate::lambda::types::{FunctionCollection, FunctionRecord};

/// What the remote track did this cycle
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
  /// The full listing was fetched
  Fetched(FunctionCollection),
  /// The cache was fresh enough; no request was made
  Skipped,
}

/// Failures that leave nothing to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
  CredentialsExpired,
  NoValidCredentials,
}

/// Where the presented list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// Nothing loaded yet
  None,
  Cache,
  Remote,
}

/// What the consumer should display
#[derive(Debug, Clone, PartialEq)]
pub struct View {
  pub functions: FunctionCollection,
  pub source: Source,
  pub loading: bool,
  pub terminal: Option<TerminalState>,
}

/// Whether the listing should be fetched again.
///
/// A missing timestamp, or one from the future, counts as stale.
pub fn needs_refresh(last_fetch: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
  match last_fetch {
    None => true,
    Some(at) => at > now || now - at >= ttl,
  }
}

/// The remote listing wins only when it has strictly more entries.
pub fn prefers_remote(cached_len: usize, fetched: &[FunctionRecord]) -> bool {
  fetched.len() > cached_len
}

/// Write-back happens for non-empty listings that beat the cached one.
pub fn should_write_back(cached_len: usize, fetched: &[FunctionRecord]) -> bool {
  !fetched.is_empty() && prefers_remote(cached_len, fetched)
}

/// Derive the view from the latest track results.
///
/// `cached` is `None` until the cache track has settled and `remote` is `None`
/// while the remote track is still running. Calling this repeatedly with the
/// same inputs yields the same view.
pub fn derive_view(
  cached: Option<&[FunctionRecord]>,
  remote: Option<&Result<RemoteOutcome, LambdaError>>,
) -> View {
  let cached_len = cached.map_or(0, <[FunctionRecord]>::len);
  let cache_has_data = cached_len > 0;

  let (functions, source) = match (remote, cached) {
    (Some(Ok(RemoteOutcome::Fetched(fetched))), _) if prefers_remote(cached_len, fetched) => {
      (fetched.clone(), Source::Remote)
    }
    (_, Some(cached)) => (cached.to_vec(), Source::Cache),
    (_, None) => (Vec::new(), Source::None),
  };

  let terminal = match (remote, cached) {
    (Some(Err(e)), Some(_)) if !cache_has_data => Some(if e.is_expired_credentials() {
      TerminalState::CredentialsExpired
    } else {
      TerminalState::NoValidCredentials
    }),
    _ => None,
  };

  View {
    functions,
    source,
    loading: remote.is_none() && !cache_has_data,
    terminal,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lambda::fetcher::testing::records;
  use chrono::TimeZone;

  fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
  }

  fn fetched(n: usize) -> Result<RemoteOutcome, LambdaError> {
    Ok(RemoteOutcome::Fetched(records("remote", n)))
  }

  #[test]
  fn test_needs_refresh_without_timestamp() {
    assert!(needs_refresh(None, at(0), Duration::minutes(30)));
  }

  #[test]
  fn test_needs_refresh_at_ttl_boundary() {
    let ttl = Duration::minutes(30);
    assert!(!needs_refresh(Some(at(0)), at(29), ttl));
    assert!(needs_refresh(Some(at(0)), at(30), ttl));
    assert!(needs_refresh(Some(at(0)), at(45), ttl));
  }

  #[test]
  fn test_future_timestamp_is_stale() {
    assert!(needs_refresh(Some(at(10)), at(0), Duration::minutes(30)));
  }

  #[test]
  fn test_zero_ttl_always_refreshes() {
    assert!(needs_refresh(Some(at(5)), at(5), Duration::zero()));
  }

  #[test]
  fn test_presented_length_is_max_of_fetched_and_cached() {
    for cached_len in 0..4 {
      for fetched_len in 0..4 {
        let cached = records("cached", cached_len);
        let remote = fetched(fetched_len);
        let view = derive_view(Some(&cached), Some(&remote));
        assert_eq!(view.functions.len(), cached_len.max(fetched_len));
        let expected = if fetched_len > cached_len {
          Source::Remote
        } else {
          Source::Cache
        };
        assert_eq!(view.source, expected);
      }
    }
  }

  #[test]
  fn test_write_back_rule() {
    assert!(should_write_back(0, &records("r", 4)));
    assert!(should_write_back(3, &records("r", 4)));
    assert!(!should_write_back(4, &records("r", 4)));
    assert!(!should_write_back(5, &records("r", 3)));
    assert!(!should_write_back(0, &[]));
  }

  #[test]
  fn test_skipped_refresh_presents_cache() {
    let cached = records("cached", 2);
    let view = derive_view(Some(&cached), Some(&Ok(RemoteOutcome::Skipped)));
    assert_eq!(view.functions, cached);
    assert_eq!(view.source, Source::Cache);
    assert!(!view.loading);
    assert_eq!(view.terminal, None);
  }

  #[test]
  fn test_remote_error_with_cached_data_degrades_to_cache() {
    let cached = records("cached", 5);
    let remote = Err(LambdaError::ExpiredCredentials("expired".to_string()));
    let view = derive_view(Some(&cached), Some(&remote));
    assert_eq!(view.functions.len(), 5);
    assert_eq!(view.terminal, None);
    assert!(!view.loading);
  }

  #[test]
  fn test_expired_credentials_without_cache() {
    let remote = Err(LambdaError::ExpiredCredentials("expired".to_string()));
    let view = derive_view(Some(&[]), Some(&remote));
    assert_eq!(view.terminal, Some(TerminalState::CredentialsExpired));
  }

  #[test]
  fn test_other_failure_without_cache() {
    for err in [
      LambdaError::MissingCredentials("AWS_ACCESS_KEY_ID is not set".to_string()),
      LambdaError::Transport("connection refused".to_string()),
      LambdaError::PageLimit(100),
    ] {
      let view = derive_view(Some(&[]), Some(&Err(err)));
      assert_eq!(view.terminal, Some(TerminalState::NoValidCredentials));
    }
  }

  #[test]
  fn test_no_terminal_state_before_cache_loads() {
    let remote = Err(LambdaError::Transport("timeout".to_string()));
    let view = derive_view(None, Some(&remote));
    assert_eq!(view.terminal, None);
    assert_eq!(view.source, Source::None);
  }

  #[test]
  fn test_loading_flag() {
    // Nothing settled yet
    assert!(derive_view(None, None).loading);
    // Empty cache, remote still running
    assert!(derive_view(Some(&[]), None).loading);
    // Cached data is enough to stop the spinner
    assert!(!derive_view(Some(&records("c", 1)), None).loading);
    // Remote settled, cache not yet
    assert!(!derive_view(None, Some(&fetched(2))).loading);
  }

  #[test]
  fn test_remote_shown_before_cache_settles() {
    let view = derive_view(None, Some(&fetched(2)));
    assert_eq!(view.source, Source::Remote);
    assert_eq!(view.functions.len(), 2);
  }

  #[test]
  fn test_derive_view_is_idempotent() {
    let cached = records("cached", 1);
    let remote = fetched(3);
    assert_eq!(
      derive_view(Some(&cached), Some(&remote)),
      derive_view(Some(&cached), Some(&remote))
    );
  }
}
