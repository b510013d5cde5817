//! Human-readable reports for cached records

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::record::CacheEntry;

fn stamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Short report: conditions and temperatures only.
pub fn summary_report(entry: &CacheEntry, now: DateTime<Utc>) -> String {
    let r = entry.record();
    format!(
        "City: {}\n\
         Today's Weather: {}\n\
         Current Temperature: {}°C\n\
         Highest Temperature: {}°C\n\
         Lowest Temperature: {}°C\n\
         Current Date: {}\n\
         Update Date: {}\n",
        r.city,
        r.description,
        r.temperature,
        r.max_temperature,
        r.min_temperature,
        stamp(now),
        stamp(entry.last_refreshed()),
    )
}

/// Full report with humidity, visibility, wind and coordinates.
pub fn detail_report(entry: &CacheEntry, now: DateTime<Utc>) -> String {
    let r = entry.record();
    format!(
        "City: {}\n\
         Today's Weather: {}\n\
         Current Temperature: {}°C\n\
         Highest Temperature: {}°C\n\
         Lowest Temperature: {}°C\n\
         Apparent Temperature: {}°C\n\
         Humidity: {}%\n\
         Visibility: {} m\n\
         Wind Speed: {} m/s\n\
         Longitude: {}°\n\
         Latitude: {}°\n\
         Current Date: {}\n\
         Update Date: {}\n",
        r.city,
        r.description,
        r.temperature,
        r.max_temperature,
        r.min_temperature,
        r.apparent_temperature,
        r.humidity,
        r.visibility,
        r.wind_speed,
        r.longitude,
        r.latitude,
        stamp(now),
        stamp(entry.last_refreshed()),
    )
}
