pub mod app;
pub mod config;
pub mod normalize;
pub mod reconcile;
pub mod select;
pub mod sink;
pub mod source;
pub mod time_field;
pub mod watch;

use anyhow::Result;
use log::info;

/// Reconcile the configured profiles. `only` restricts the run to the
/// named profiles; empty means all of them.
pub async fn run(only: &[String]) -> Result<()> {
    let app = app::Application::new();
    info!("Initializing sheetcal");
    app.run(only).await
}

/// Run the reference-row watcher for one profile.
pub async fn watch(profile: Option<&str>) -> Result<()> {
    let app = app::Application::new();
    app.watch(profile).await
}

pub fn init_logger(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

// Re-export commonly used types
pub use config::{Config, EventColor, Profile};
pub use normalize::{Event, MANAGED_MARKER};
pub use reconcile::{ReconcileReport, Reconciler, UnresolvedEntry};
pub use sink::{EntryId, SinkEntry, SinkError, SinkGateway};
pub use source::{SourceAdapter, SourceRow};
