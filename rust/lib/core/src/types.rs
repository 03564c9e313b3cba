use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::TrackerError;

/// Current time, truncated to the microsecond precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Truncate a caller-supplied time to stored precision.
pub fn normalize_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

/// Fixed-width RFC 3339 (`2024-05-01T12:00:00.000000Z`).
///
/// Every stored timestamp uses this exact shape, so comparing the text
/// orders the instants.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TrackerError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrackerError::Malformed(format!("bad timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2019, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_timestamp(&a), "2019-03-04T05:06:07.000000Z");
        assert_eq!(format_timestamp(&now()).len(), a.to_rfc3339_opts(SecondsFormat::Micros, true).len());
    }

    #[test]
    fn text_order_matches_time_order() {
        let a = Utc.with_ymd_and_hms(2019, 3, 4, 5, 6, 7).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }

    #[test]
    fn parse_roundtrip_and_offsets() {
        let a = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&a)).unwrap(), a);
        assert_eq!(parse_timestamp("2020-01-02T04:04:05+01:00").unwrap(), a);
        assert!(matches!(parse_timestamp("yesterday"), Err(TrackerError::Malformed(_))));
    }

    #[test]
    fn now_is_already_normalized() {
        let t = now();
        assert_eq!(normalize_timestamp(t), t);
    }
}
