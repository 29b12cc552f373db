//! Lease duration parsing
//!
//! A lease is written as a bare number of seconds (`"3600"`), an ISO-8601
//! duration (`"PT1H"`, `"P1DT12H"`), or a human readable duration (`"1s"`,
//! `"90s"`, `"1h 30m"`).

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::LockError;

/// Default lease applied when none is configured (one hour)
pub const DEFAULT_LEASE: Duration = Duration::from_secs(3600);

/// Parse a lease duration
pub fn parse_lease(input: &str) -> Result<Duration, LockError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LockError::Config("lease duration is empty".to_string()));
    }

    let lease = if input.bytes().all(|b| b.is_ascii_digit()) {
        let secs = input
            .parse::<u64>()
            .map_err(|e| LockError::Config(format!("invalid lease '{}': {}", input, e)))?;
        Duration::from_secs(secs)
    } else if input.starts_with(['P', 'p']) {
        parse_iso8601(input)?
    } else {
        humantime::parse_duration(input)
            .map_err(|e| LockError::Config(format!("invalid lease '{}': {}", input, e)))?
    };

    if lease.is_zero() {
        return Err(LockError::Config(format!(
            "lease '{}' must be greater than zero",
            input
        )));
    }
    Ok(lease)
}

/// ISO-8601 `PnWnDTnHnMnS` durations; years and months have no fixed
/// length and are rejected
fn parse_iso8601(input: &str) -> Result<Duration, LockError> {
    let invalid = || {
        LockError::Config(format!(
            "invalid lease '{}': expected an ISO-8601 duration such as PT1H",
            input
        ))
    };

    let upper = input.to_ascii_uppercase();
    let body = upper.strip_prefix('P').ok_or_else(invalid)?;
    let (date, time) = match body.split_once('T') {
        Some((_, "")) => return Err(invalid()),
        Some((date, time)) => (date, time),
        None => (body, ""),
    };
    if date.is_empty() && time.is_empty() {
        return Err(invalid());
    }

    const DATE_UNITS: &[(char, u64)] = &[('W', 604_800), ('D', 86_400)];
    const TIME_UNITS: &[(char, u64)] = &[('H', 3_600), ('M', 60), ('S', 1)];

    let mut total = Duration::ZERO;
    for (mut rest, mut units) in [(date, DATE_UNITS), (time, TIME_UNITS)] {
        while !rest.is_empty() {
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
                .ok_or_else(invalid)?;
            let (number, tail) = rest.split_at(end);
            let unit = tail.chars().next().ok_or_else(invalid)?;

            // Units appear at most once and in order
            let position = units
                .iter()
                .position(|(u, _)| *u == unit)
                .ok_or_else(invalid)?;
            let secs_per_unit = units[position].1;
            units = &units[position + 1..];

            let value: f64 = number.replace(',', ".").parse().map_err(|_| invalid())?;
            let part = Duration::try_from_secs_f64(value * secs_per_unit as f64)
                .map_err(|_| invalid())?;
            total = total.checked_add(part).ok_or_else(invalid)?;
            rest = &tail[unit.len_utf8()..];
        }
    }
    Ok(total)
}

/// Serde adapter for lease fields
pub fn deserialize_lease<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lease(&raw).map_err(serde::de::Error::custom)
}
