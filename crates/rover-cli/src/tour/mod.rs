//! Tour tracking area of the CLI. Progress lives in a snapshot on disk
//! so an interrupted tour picks up where it left off on the next
//! invocation.

mod run;
pub(crate) mod snapshot;

use std::path::PathBuf;

use clap::Subcommand;

pub(crate) use run::{run_tour_complete, run_tour_end, run_tour_start, run_tour_status};
pub(crate) use snapshot::FileStore;

/// Default location of the tour snapshot.
pub(crate) const DEFAULT_STATE_FILE: &str = ".rover-tour.json";

/// Sub-commands available under `tour`.
#[derive(Debug, Subcommand)]
pub enum TourCommands {
    /// Plan a route over a CSV of stops and begin tracking it
    Start {
        /// CSV file with id, name, latitude, longitude columns
        #[arg(long)]
        file: PathBuf,
        /// Replace a tour that is still in progress
        #[arg(long)]
        force: bool,
        /// Where the tour snapshot is kept
        #[arg(long, default_value = DEFAULT_STATE_FILE)]
        state_file: PathBuf,
    },
    /// Show progress of the active tour
    Status {
        /// Where the tour snapshot is kept
        #[arg(long, default_value = DEFAULT_STATE_FILE)]
        state_file: PathBuf,
    },
    /// Mark a stop of the active tour as visited
    Complete {
        /// Id of the visited stop
        #[arg(long)]
        stop: String,
        /// Where the tour snapshot is kept
        #[arg(long, default_value = DEFAULT_STATE_FILE)]
        state_file: PathBuf,
    },
    /// End the active tour and report what was visited
    End {
        /// Where the tour snapshot is kept
        #[arg(long, default_value = DEFAULT_STATE_FILE)]
        state_file: PathBuf,
    },
}
