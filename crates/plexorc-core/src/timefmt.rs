use std::time::Duration;

/// Render a duration as `HH:MM:SS`, the shape the stats file and the loop
/// summaries use. Sub-second remainders are truncated.
pub fn format_hms(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_all_zeros() {
        assert_eq!(format_hms(Duration::ZERO), "00:00:00");
    }

    #[test]
    fn seconds_minutes_hours() {
        assert_eq!(format_hms(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_hms(Duration::from_secs(61)), "00:01:01");
        assert_eq!(format_hms(Duration::from_secs(3 * 3600 + 25 * 60 + 7)), "03:25:07");
    }

    #[test]
    fn hours_can_exceed_two_digits_worth() {
        assert_eq!(format_hms(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn subsecond_truncates() {
        assert_eq!(format_hms(Duration::from_millis(2999)), "00:00:02");
    }
}
