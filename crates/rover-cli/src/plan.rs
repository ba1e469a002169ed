//! Offline route planning over a CSV of stops.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use rover_routing::{format_minutes, optimize_route, Coordinate, Route, Stop};
use serde::Deserialize;

/// One row of a stops file: `id,name,latitude,longitude` under a header
/// row. Coordinates may be left empty.
#[derive(Debug, Deserialize)]
struct StopRecord {
    id: String,
    name: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

fn parse_stops(input: impl Read) -> anyhow::Result<Vec<Stop>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut stops = Vec::new();
    for record in reader.deserialize() {
        let record: StopRecord = record?;
        let id = record.id.trim().to_owned();
        if id.is_empty() {
            continue;
        }
        stops.push(Stop {
            id,
            name: record.name.trim().to_owned(),
            coordinate: record
                .latitude
                .zip(record.longitude)
                .map(|(latitude, longitude)| Coordinate {
                    latitude,
                    longitude,
                }),
        });
    }
    Ok(stops)
}

/// Read a stops file from disk. Rows without an id are dropped; a stop
/// with only one coordinate half counts as unlocated.
pub(crate) fn load_stops(path: &Path) -> anyhow::Result<Vec<Stop>> {
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    parse_stops(file)
}

/// # Errors
///
/// Returns an error if the file cannot be read or contains no stops.
pub(crate) fn run_plan(file: &Path) -> anyhow::Result<()> {
    let stops = load_stops(file)?;
    if stops.is_empty() {
        anyhow::bail!("no stops found in '{}'", file.display());
    }
    let route = optimize_route(&stops);
    print_route(&route);
    Ok(())
}

/// Print the optimized order with per-leg and aggregate estimates.
pub(crate) fn print_route(route: &Route) {
    let legs = route.legs();
    println!("{:<5}{:<12}{:<14}NAME", "POS", "STOP", "DRIVE");
    for (position, id) in route.optimized_order.iter().enumerate() {
        let drive = if position == 0 {
            "\u{2014}".to_owned()
        } else {
            legs.get(position - 1)
                .map_or_else(String::new, |leg| format_minutes(leg.driving_minutes))
        };
        let name = route
            .markets
            .iter()
            .find(|stop| &stop.id == id)
            .map_or("", |stop| stop.name.as_str());
        println!("{:<5}{id:<12}{drive:<14}{name}", position + 1);
    }
    println!();
    println!(
        "driving {}, on site {}, total {}",
        format_minutes(route.total_driving_time),
        format_minutes(route.total_work_time),
        format_minutes(route.total_time),
    );
    let unlocated = route.unlocated();
    if !unlocated.is_empty() {
        println!("no coordinates (appended last): {}", unlocated.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_and_without_coordinates() {
        let sheet = "id,name,latitude,longitude\nM1,Billa Graz,47.07,15.44\nM2,Spar Wien,,\n";
        let stops = parse_stops(sheet.as_bytes()).unwrap();
        assert_eq!(stops.len(), 2);
        assert!(stops[0].coordinate.is_some());
        assert!(stops[1].coordinate.is_none());
    }

    #[test]
    fn skips_rows_without_an_id() {
        let sheet = "id,name,latitude,longitude\n,Billa Graz,47.07,15.44\nM2,Spar Wien,47.1,15.5\n";
        let stops = parse_stops(sheet.as_bytes()).unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].id, "M2");
    }

    #[test]
    fn lone_coordinate_half_is_dropped() {
        let sheet = "id,name,latitude,longitude\nM1,Billa Graz,47.07,\n";
        let stops = parse_stops(sheet.as_bytes()).unwrap();
        assert!(stops[0].coordinate.is_none());
    }

    #[test]
    fn coordinate_columns_may_be_absent() {
        let sheet = "id,name\nM1,Billa Graz\n";
        let stops = parse_stops(sheet.as_bytes()).unwrap();
        assert_eq!(stops.len(), 1);
        assert!(stops[0].coordinate.is_none());
    }
}
