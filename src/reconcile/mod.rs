//! Cache reconciliation for the function listing.
//!
//! - `policy`: pure decisions (staleness, which listing to show, what to persist)
//! - `session`: the refresh cycle that runs the cache and remote tracks

mod policy;
mod session;

pub use policy::{TerminalState, View};
pub use session::{system_clock, Activation, Reconciler};
