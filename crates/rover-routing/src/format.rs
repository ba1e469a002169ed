use chrono::Duration;

/// Render a minute count the way the tour screens show it: `"2 Std 5 Min"`,
/// or just `"45 Min"` when the hour part is zero.
#[must_use]
pub fn format_minutes(total_minutes: u32) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours} Std {minutes} Min")
    } else {
        format!("{minutes} Min")
    }
}

/// Render an elapsed wall-clock duration, floored to whole minutes.
/// Negative durations render as zero.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = minutes.min(i64::from(u32::MAX)) as u32;
    format_minutes(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_only_below_one_hour() {
        assert_eq!(format_minutes(0), "0 Min");
        assert_eq!(format_minutes(45), "45 Min");
        assert_eq!(format_minutes(59), "59 Min");
    }

    #[test]
    fn hours_and_minutes_from_one_hour_up() {
        assert_eq!(format_minutes(60), "1 Std 0 Min");
        assert_eq!(format_minutes(125), "2 Std 5 Min");
        assert_eq!(format_minutes(600), "10 Std 0 Min");
    }

    #[test]
    fn elapsed_floors_to_whole_minutes() {
        assert_eq!(format_elapsed(Duration::seconds(59)), "0 Min");
        assert_eq!(format_elapsed(Duration::seconds(61)), "1 Min");
        assert_eq!(format_elapsed(Duration::seconds(3_725)), "1 Std 2 Min");
    }

    #[test]
    fn negative_elapsed_renders_as_zero() {
        assert_eq!(format_elapsed(Duration::seconds(-30)), "0 Min");
    }
}
