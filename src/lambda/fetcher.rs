//! Marker-based traversal of the function listing.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::error::LambdaError;
use super::types::{FunctionCollection, FunctionPage};

/// A paginated listing endpoint.
#[async_trait]
pub trait FunctionsApi: Send + Sync {
  /// Fetch one page. `marker` is absent for the first page.
  async fn list_page(&self, marker: Option<&str>) -> Result<FunctionPage, LambdaError>;
}

/// Walks all pages of a [`FunctionsApi`] into one collection.
pub struct Fetcher<A: FunctionsApi> {
  api: Arc<A>,
  max_pages: usize,
}

impl<A: FunctionsApi> Fetcher<A> {
  pub fn new(api: Arc<A>, max_pages: usize) -> Self {
    Self { api, max_pages }
  }

  /// Fetch every page until the API stops returning a marker.
  ///
  /// Returns only complete listings; any failing page aborts the whole
  /// traversal, as does running past `max_pages`.
  pub async fn fetch_all(&self) -> Result<FunctionCollection, LambdaError> {
    let mut all_functions = Vec::new();
    let mut marker: Option<String> = None;
    let mut pages = 0usize;

    loop {
      if pages >= self.max_pages {
        return Err(LambdaError::PageLimit(self.max_pages));
      }

      let page = self.api.list_page(marker.as_deref()).await?;
      pages += 1;
      all_functions.extend(page.functions);

      match page.next_marker {
        Some(next) => marker = Some(next),
        None => break,
      }
    }

    debug!(pages, total = all_functions.len(), "function listing drained");
    Ok(all_functions)
  }
}

impl<A: FunctionsApi> Clone for Fetcher<A> {
  fn clone(&self) -> Self {
    Self {
      api: Arc::clone(&self.api),
      max_pages: self.max_pages,
    }
  }
}

/// Scripted API for tests: serves a fixed sequence of responses.
#[cfg(test)]
pub mod testing {
  use super::*;
  use crate::lambda::types::FunctionRecord;
  use std::collections::VecDeque;
  use std::sync::Mutex;
  use std::time::Duration;

  pub struct ScriptedApi {
    responses: Mutex<VecDeque<Result<FunctionPage, LambdaError>>>,
    markers_seen: Mutex<Vec<Option<String>>>,
    delay: Option<Duration>,
  }

  impl ScriptedApi {
    pub fn new(responses: Vec<Result<FunctionPage, LambdaError>>) -> Self {
      Self {
        responses: Mutex::new(responses.into()),
        markers_seen: Mutex::new(Vec::new()),
        delay: None,
      }
    }

    /// Wait this long before answering each page
    pub fn with_delay(mut self, delay: Duration) -> Self {
      self.delay = Some(delay);
      self
    }

    pub fn calls(&self) -> usize {
      self.markers_seen.lock().unwrap().len()
    }

    pub fn markers_seen(&self) -> Vec<Option<String>> {
      self.markers_seen.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl FunctionsApi for ScriptedApi {
    async fn list_page(&self, marker: Option<&str>) -> Result<FunctionPage, LambdaError> {
      self.markers_seen.lock().unwrap().push(marker.map(String::from));
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      self
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(LambdaError::Transport("script exhausted".to_string())))
    }
  }

  pub fn records(prefix: &str, n: usize) -> Vec<FunctionRecord> {
    (0..n)
      .map(|i| FunctionRecord {
        name: format!("{}-{}", prefix, i),
        description: format!("{} function {}", prefix, i),
        last_modified: "2024-01-01T00:00:00.000+0000".to_string(),
      })
      .collect()
  }

  pub fn page(prefix: &str, n: usize, next: Option<&str>) -> Result<FunctionPage, LambdaError> {
    Ok(FunctionPage {
      functions: records(prefix, n),
      next_marker: next.map(String::from),
    })
  }
}
