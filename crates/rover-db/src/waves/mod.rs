//! Database operations for the `waves`, `wave_participants`, and
//! `wave_entries` tables.

mod read;
mod types;
mod write;

pub use read::{
    get_wave, list_chain_averages, list_wave_dashboard, list_wave_participants, list_waves,
};
pub use types::{
    ChainAverageFilters, ChainAverageRow, NewWave, NewWaveParticipant, WaveDashboardFilters,
    WaveDashboardRow, WaveEntryRow, WaveParticipantRow, WaveRow, WaveUpdate,
};
pub use write::{create_wave, delete_wave, record_wave_entry, update_wave};
