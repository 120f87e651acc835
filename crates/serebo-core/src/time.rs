//! Canonical UTC timestamp strings.
//!
//! The dtstamp format `YEAR:MON:DAY:HOUR:MIN:SEC:MICRO` (no zero padding)
//! is both a storage format and a hash input, so it must be produced
//! byte-identically on every platform.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Current UTC time as a canonical dtstamp string.
pub fn dtstamp() -> String {
    format_dtstamp(Utc::now())
}

/// Canonical dtstamp for a seconds-since-epoch value (e.g. from an NTP
/// exchange). The microsecond field is the literal `00000`; sub-second
/// precision from the wire is discarded. Returns `None` when the value is
/// outside the representable date range.
pub fn dtstamp_from_epoch(epoch_secs: f64) -> Option<String> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let dt = DateTime::<Utc>::from_timestamp(epoch_secs.trunc() as i64, 0)?;
    Some(format!(
        "{}:{}:{}:{}:{}:{}:00000",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    ))
}

fn format_dtstamp(dt: DateTime<Utc>) -> String {
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.timestamp_subsec_micros()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtstamp_has_seven_numeric_fields() {
        let s = dtstamp();
        let parts: Vec<&str> = s.split(':').collect();
        assert_eq!(parts.len(), 7);
        for p in parts {
            p.parse::<u64>().expect("numeric field");
        }
    }

    #[test]
    fn dtstamp_is_not_zero_padded() {
        // 2024-03-05 07:09:02.000412 UTC
        let dt = DateTime::<Utc>::from_timestamp(1_709_622_542, 412_000).unwrap();
        assert_eq!(format_dtstamp(dt), "2024:3:5:7:9:2:412");
    }

    #[test]
    fn epoch_zero_formats_with_literal_micro_field() {
        assert_eq!(dtstamp_from_epoch(0.0).unwrap(), "1970:1:1:0:0:0:00000");
    }

    #[test]
    fn epoch_fraction_is_truncated() {
        assert_eq!(
            dtstamp_from_epoch(86_399.999).unwrap(),
            "1970:1:1:23:59:59:00000"
        );
    }

    #[test]
    fn non_finite_epoch_is_rejected() {
        assert!(dtstamp_from_epoch(f64::NAN).is_none());
        assert!(dtstamp_from_epoch(f64::INFINITY).is_none());
    }
}
