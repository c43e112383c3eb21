use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn unix_millis_now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Wall-clock time of day in `HH:MM:SS` (UTC, 24-hour).
pub fn clock_time_now() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_clock_time(since_epoch)
}

/// Format the time-of-day component of a duration since the Unix epoch.
pub fn format_clock_time(since_epoch: Duration) -> String {
    let secs_of_day = since_epoch.as_secs() % 86_400;
    let hours = secs_of_day / 3600;
    let minutes = (secs_of_day % 3600) / 60;
    let seconds = secs_of_day % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
