//! Nil-safe conversions between SDK field types and attribute values

use chrono::{DateTime, SecondsFormat, Utc};

pub fn int_ptr_to_i64_ptr(value: Option<i32>) -> Option<i64> {
    value.map(i64::from)
}

/// Narrowing is checked: values outside the `i32` range become `None`
pub fn i64_ptr_to_int_ptr(value: Option<i64>) -> Option<i32> {
    value.and_then(|v| i32::try_from(v).ok())
}

/// RFC 3339 with second precision and a `Z` suffix
pub fn time_to_rfc3339(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn opt_time_to_rfc3339(time: Option<&DateTime<Utc>>) -> Option<String> {
    time.map(time_to_rfc3339)
}

/// Split an availability zone into region and zone letter
/// (`br-se1-a` → `("br-se1", "a")`)
pub fn split_zone(zone: &str) -> Option<(&str, &str)> {
    let (region, letter) = zone.rsplit_once('-')?;
    if region.is_empty() || letter.is_empty() || !region.contains('-') {
        return None;
    }
    Some((region, letter))
}

pub fn region_from_zone(zone: &str) -> Option<&str> {
    split_zone(zone).map(|(region, _)| region)
}
