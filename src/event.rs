use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  /// Periodic tick for polling the refresh cycle
  Tick,
  /// Time to start another refresh cycle (watch mode)
  Refresh,
  /// Ctrl-C
  Quit,
}

/// Event handler that produces events from a tick timer, an optional refresh
/// timer and the interrupt signal
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration, refresh_every: Option<Duration>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let tick_tx = tx.clone();
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(tick_rate);
      loop {
        interval.tick().await;
        if tick_tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    if let Some(every) = refresh_every {
      let refresh_tx = tx.clone();
      tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first cycle is started by the app itself
        interval.tick().await;
        loop {
          interval.tick().await;
          if refresh_tx.send(Event::Refresh).is_err() {
            break;
          }
        }
      });
    }

    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        let _ = tx.send(Event::Quit);
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_ticks_arrive() {
    let mut events = EventHandler::new(Duration::from_millis(5), None);
    assert_eq!(events.next().await, Some(Event::Tick));
    assert_eq!(events.next().await, Some(Event::Tick));
  }

  #[tokio::test]
  async fn test_refresh_events_in_watch_mode() {
    let mut events = EventHandler::new(Duration::from_millis(5), Some(Duration::from_millis(20)));
    let mut saw_refresh = false;
    for _ in 0..100 {
      if events.next().await == Some(Event::Refresh) {
        saw_refresh = true;
        break;
      }
    }
    assert!(saw_refresh);
  }
}
