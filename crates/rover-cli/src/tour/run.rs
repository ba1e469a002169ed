//! Tour lifecycle commands on top of the snapshot store.

use std::path::Path;

use chrono::{DateTime, Utc};
use rover_routing::{format_elapsed, format_minutes, optimize_route, Itinerary, TourState};

use super::snapshot::{load_active, SnapshotStore, VisitSnapshot};
use crate::plan::{load_stops, print_route};

/// Plan a route over the stops file and persist it as the active tour.
///
/// # Errors
///
/// Returns an error if a tour is already in progress (without `--force`),
/// the file cannot be read or has no stops, or the snapshot cannot be
/// written.
pub(crate) fn run_tour_start(
    store: &dyn SnapshotStore,
    file: &Path,
    force: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    if !force {
        if let Some(active) = load_active(store, now)? {
            if active.itinerary.state() == TourState::InProgress {
                anyhow::bail!(
                    "a tour is already in progress; finish it with `tour end` or pass --force"
                );
            }
        }
    }

    let stops = load_stops(file)?;
    if stops.is_empty() {
        anyhow::bail!("no stops found in '{}'", file.display());
    }

    let route = optimize_route(&stops);
    print_route(&route);

    let mut itinerary = Itinerary::new(route);
    itinerary.start(now);

    let stop_count = itinerary.route().optimized_order.len();
    let total = itinerary.route().total_time;
    store.save(&VisitSnapshot {
        itinerary,
        saved_at: now,
    })?;

    println!();
    println!("tour started: {stop_count} stops, estimated {}", format_minutes(total));
    Ok(())
}

/// Print the state of the active tour, stop by stop.
///
/// # Errors
///
/// Returns an error when the snapshot store cannot be read.
pub(crate) fn run_tour_status(store: &dyn SnapshotStore, now: DateTime<Utc>) -> anyhow::Result<()> {
    let Some(snapshot) = load_active(store, now)? else {
        println!("no active tour; start one with `tour start --file <stops.csv>`");
        return Ok(());
    };

    let itinerary = &snapshot.itinerary;
    let route = itinerary.route();
    let state = match itinerary.state() {
        TourState::NotStarted => "not started",
        TourState::InProgress => "in progress",
        TourState::Completed => "completed",
        TourState::EndedEarly => "ended early",
    };
    println!(
        "tour {state}: {} of {} stops done, {} elapsed",
        itinerary.completed_ids().len(),
        route.optimized_order.len(),
        format_elapsed(itinerary.elapsed(now)),
    );
    println!();
    for id in &route.optimized_order {
        let marker = if itinerary.completed_ids().contains(id) {
            "[x]"
        } else if itinerary.active_stop() == Some(id.as_str()) {
            " > "
        } else {
            "[ ]"
        };
        let name = route
            .markets
            .iter()
            .find(|stop| &stop.id == id)
            .map_or("", |stop| stop.name.as_str());
        println!("{marker} {id:<12}{name}");
    }
    Ok(())
}

/// Mark one stop of the active tour as visited.
///
/// # Errors
///
/// Returns an error when no tour is active, the tour already ended, the
/// stop is not part of the tour, or the snapshot cannot be written.
pub(crate) fn run_tour_complete(
    store: &dyn SnapshotStore,
    stop_id: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let Some(mut snapshot) = load_active(store, now)? else {
        anyhow::bail!("no active tour; start one with `tour start --file <stops.csv>`");
    };

    if snapshot.itinerary.state() != TourState::InProgress {
        anyhow::bail!("the tour is not in progress; start a new one with `tour start`");
    }
    if !snapshot
        .itinerary
        .route()
        .optimized_order
        .iter()
        .any(|id| id == stop_id)
    {
        anyhow::bail!("stop '{stop_id}' is not part of the active tour");
    }
    if !snapshot.itinerary.complete_stop(stop_id, now) {
        println!("stop '{stop_id}' was already completed");
        return Ok(());
    }

    snapshot.saved_at = now;
    let done = snapshot.itinerary.completed_ids().len();
    let total = snapshot.itinerary.route().optimized_order.len();
    let state = snapshot.itinerary.state();
    let next = snapshot.itinerary.active_stop().map(str::to_owned);
    store.save(&snapshot)?;

    if state == TourState::Completed {
        println!("stop '{stop_id}' completed ({done} of {total}); tour complete");
    } else if let Some(next) = next {
        println!("stop '{stop_id}' completed ({done} of {total}); next: {next}");
    }
    Ok(())
}

/// End the active tour early and clear the snapshot.
///
/// # Errors
///
/// Returns an error when the snapshot store cannot be read or cleared.
pub(crate) fn run_tour_end(store: &dyn SnapshotStore, now: DateTime<Utc>) -> anyhow::Result<()> {
    let Some(mut snapshot) = load_active(store, now)? else {
        println!("no active tour");
        return Ok(());
    };

    let summary = snapshot.itinerary.end_early(now);
    let elapsed = format_elapsed(snapshot.itinerary.elapsed(now));
    store.clear()?;

    println!(
        "tour ended after {elapsed}: {} visited, {} open",
        summary.visited.len(),
        summary.not_visited.len()
    );
    if !summary.not_visited.is_empty() {
        println!("not visited: {}", summary.not_visited.join(", "));
    }
    Ok(())
}
