//! Async query abstraction for background data loading.
//!
//! A `Query<T, E>` runs one async operation on a spawned task and hands the
//! result back through a channel. The owner polls it from the event loop, so
//! all state changes happen on the loop's own turn.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new(
//!     move || {
//!         let fetcher = fetcher.clone();
//!         async move { fetcher.fetch_all().await }
//!     },
//!     || LambdaError::Transport("cancelled".to_string()),
//! );
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, re-derive the view
//! }
//! ```

use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T, E> {
  /// Query has not been started
  Idle,
  /// Query is currently running
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed
  Error(E),
}

impl<T, E> QueryState<T, E> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  /// Finished, either way
  pub fn is_settled(&self) -> bool {
    matches!(self, QueryState::Success(_) | QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&E> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Produces the error reported when a task ends without sending a result
type CancelledFn<E> = Box<dyn Fn() -> E + Send + Sync>;

/// Async query with state management.
///
/// Query<T, E> encapsulates:
/// - The fetching logic (via a closure)
/// - Loading/success/error states
/// - Async result handling via channels
pub struct Query<T, E> {
  state: QueryState<T, E>,
  fetcher: FetcherFn<T, E>,
  on_cancelled: CancelledFn<E>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, E>>>,
}

impl<T: Send + 'static, E: Send + 'static> Query<T, E> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` starts a run. `on_cancelled`
  /// supplies the error used if the task dies without producing a result.
  pub fn new<F, Fut, C>(fetcher: F, on_cancelled: C) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    C: Fn() -> E + Send + Sync + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      on_cancelled: Box::new(on_cancelled),
      receiver: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T, E> {
    &self.state
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading. A run, once started,
  /// always runs to completion.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending (the task panicked)
        self.state = QueryState::Error((self.on_cancelled)());
        self.receiver = None;
        true
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<T: std::fmt::Debug, E: std::fmt::Debug> std::fmt::Debug for Query<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
