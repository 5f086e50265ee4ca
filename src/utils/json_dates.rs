//! Deep date normalization for persisted JSON payloads
//!
//! Every payload written to the verification input store passes through
//! [`normalize_dates`] so that persisted JSON never carries a date or
//! datetime in anything but an ISO-8601 string. The walk canonicalizes
//! date-looking strings and converts epoch timestamps found under
//! date-suggesting keys. Persist-boundary callers should not rely on
//! per-agent discipline; they call this once on the assembled payload.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// String formats accepted as datetimes and rewritten to RFC 3339
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// String formats accepted as bare dates and rewritten to `YYYY-MM-DD`
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%Y.%m.%d"];

/// Epoch values are only converted when the key itself suggests a timestamp
fn key_suggests_timestamp(key: &str) -> bool {
    key == "time"
        || key == "date"
        || key == "timestamp"
        || key.ends_with("_at")
        || key.ends_with("_time")
        || key.ends_with("_date")
        || key.ends_with("_timestamp")
}

fn canonicalize_string(value: &str) -> Option<String> {
    // Already ISO-8601 / RFC 3339: keep as-is (no rewrite churn)
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return None;
    }
    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.and_utc().to_rfc3339());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn epoch_to_rfc3339(raw: i64) -> Option<String> {
    // Heuristic ranges: seconds (2001-2286) or milliseconds of the same era
    let (secs, nanos) = if (1_000_000_000..100_000_000_000).contains(&raw) {
        (raw, 0u32)
    } else if (1_000_000_000_000..100_000_000_000_000).contains(&raw) {
        (raw / 1000, ((raw % 1000) * 1_000_000) as u32)
    } else {
        return None;
    };
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.to_rfc3339())
}

fn walk(value: &mut Value, key_hint: Option<&str>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                walk(child, Some(key.as_str()));
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                walk(child, key_hint);
            }
        }
        Value::String(s) => {
            if let Some(canonical) = canonicalize_string(s) {
                *s = canonical;
            }
        }
        Value::Number(n) => {
            if let (Some(key), Some(raw)) = (key_hint, n.as_i64()) {
                if key_suggests_timestamp(key) {
                    if let Some(iso) = epoch_to_rfc3339(raw) {
                        *value = Value::String(iso);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Recursively rewrite all date/datetime scalars in `value` to ISO-8601 strings
pub fn normalize_dates(value: &mut Value) {
    walk(value, None);
}

/// Serialize `data` to JSON and normalize all embedded dates
pub fn to_normalized_json<T: Serialize>(data: &T) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(data)?;
    normalize_dates(&mut value);
    Ok(value)
}
