use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Parses a cutoff given on the command line.
///
/// Accepts `"Nd"` (N days before `now`), `"YYYY-MM-DD"` (midnight UTC) or an
/// RFC 3339 timestamp. Returns `None` when the string matches none of them.
pub fn parse_cutoff_at(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Some(days) = s.strip_suffix('d') {
        if let Ok(days) = days.parse::<i64>() {
            if days > 0 {
                return Duration::try_days(days).and_then(|d| now.checked_sub_signed(d));
            }
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// [`parse_cutoff_at`] relative to the current time, with an error message
/// suitable for CLI argument parsing.
pub fn parse_cutoff(s: &str) -> Result<DateTime<Utc>, String> {
    parse_cutoff_at(s, Utc::now()).ok_or_else(|| {
        format!("invalid cutoff '{s}': expected Nd, YYYY-MM-DD or an RFC 3339 timestamp")
    })
}
