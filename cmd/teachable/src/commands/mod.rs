//! CLI commands module.

mod classify;
mod stats;
mod util;
mod watch;

pub use classify::ClassifyCommand;
pub use stats::StatsCommand;
pub use watch::WatchCommand;

pub(crate) use util::*;
