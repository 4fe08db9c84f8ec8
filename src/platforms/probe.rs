//! Field probing over loosely-typed upstream JSON.
//!
//! Every lookup takes a list of candidate paths (`/`-separated, numeric
//! segments index arrays) and returns the first usable hit. Empty strings
//! and zero counts count as missing so the next candidate gets a chance,
//! which is how the upstream APIs' renamed fields are tolerated.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Native timestamp format of the X/Twitter v1.1 `legacy` objects.
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

pub fn at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

pub fn text(value: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| match at(value, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub fn count(value: &Value, paths: &[&str]) -> Option<u64> {
    paths
        .iter()
        .find_map(|path| at(value, path).and_then(as_count).filter(|n| *n > 0))
}

pub fn float(value: &Value, paths: &[&str]) -> Option<f64> {
    paths.iter().find_map(|path| match at(value, path)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

pub fn array<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Vec<Value>> {
    paths.iter().find_map(|path| at(value, path)?.as_array())
}

/// Reads a counter that may arrive as an integer, a float or a numeric
/// string such as `"12,345"`.
pub fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => {
            let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
            digits.parse::<u64>().ok().or_else(|| {
                digits
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.round() as u64)
            })
        }
        _ => None,
    }
}

pub fn from_unix_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    from_unix_millis((seconds * 1000.0).round() as i64)
}

pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

/// Accepts RFC 3339, the X/Twitter native format and a bare
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, TWITTER_DATE_FORMAT))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
