//! Timestamp lines: UTC always, plus local time when the zone is known.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an IANA timezone id. Unknown ids are logged and yield `None`.
pub fn resolve_timezone(id: &str) -> Option<Tz> {
    match id.trim().parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            tracing::warn!(timezone = %id, "Unknown timezone, rendering UTC only");
            None
        }
    }
}

pub fn utc_line(at: DateTime<Utc>) -> String {
    format!("⏰ Time: {} (UTC)", at.format(TIME_FORMAT))
}

pub fn local_line(at: DateTime<Utc>, tz: Tz) -> String {
    let local = at.with_timezone(&tz);
    format!(
        "🕒 Local Time: {} (UTC{}, {})",
        local.format(TIME_FORMAT),
        local.format("%:z"),
        tz.name()
    )
}

/// The UTC line, followed by a local-time line when `timezone` resolves.
pub fn time_block(at: DateTime<Utc>, timezone: Option<&str>) -> String {
    let utc = utc_line(at);
    match timezone.and_then(resolve_timezone) {
        Some(tz) => format!("{}\n{}", utc, local_line(at, tz)),
        None => utc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_utc_only_without_timezone() {
        let block = time_block(sample_time(), None);
        assert_eq!(block, "⏰ Time: 2025-03-14 08:30:00 (UTC)");
    }

    #[test]
    fn test_local_line_with_offset() {
        let block = time_block(sample_time(), Some("Asia/Jakarta"));
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "⏰ Time: 2025-03-14 08:30:00 (UTC)");
        assert_eq!(
            lines[1],
            "🕒 Local Time: 2025-03-14 15:30:00 (UTC+07:00, Asia/Jakarta)"
        );
    }

    #[test]
    fn test_negative_offset() {
        let block = time_block(sample_time(), Some("America/Sao_Paulo"));
        assert!(block.contains("(UTC-03:00, America/Sao_Paulo)"));
    }

    #[test]
    fn test_invalid_timezone_falls_back_to_utc() {
        let block = time_block(sample_time(), Some("Mars/Olympus_Mons"));
        assert_eq!(block.lines().count(), 1);
        assert!(block.contains("(UTC)"));
    }
}
