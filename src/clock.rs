//! Fixed UTC+7 (WIB) time rules.
//!
//! Request date-times may carry an explicit offset (RFC 3339) or be a naive wall
//! clock, which is read as WIB. Comparisons are made on instants, so a naive
//! `date` is "in the future" exactly when it is later than `now_utc + 7h` read as
//! a wall clock.

use serde::{Deserialize, Deserializer, Serializer};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, macros::offset, Date,
    Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

pub const WIB: UtcOffset = offset!(+7);

pub fn now_wib() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(WIB)
}

/// Strictly later than `now`.
pub fn is_future(date: OffsetDateTime, now: OffsetDateTime) -> bool {
    date > now
}

/// Half-open `[start, end)` covering the WIB calendar day.
pub fn day_bounds(day: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.midnight().assume_offset(WIB);
    (start, start + Duration::days(1))
}

pub fn parse_datetime(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt.to_offset(WIB));
    }
    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(raw, with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(raw, without_seconds))
        .map(|naive| naive.assume_offset(WIB))
}

pub fn parse_day(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

/// Serde adapter for request/response date-times.
pub mod wib_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(&dt.to_offset(WIB), s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_datetime(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `YYYY-MM-DD` calendar dates.
pub mod iso_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        let text = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(serde::ser::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(d)?;
        parse_day(&raw).map_err(serde::de::Error::custom)
    }

    /// Optional day; `""` counts as absent.
    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
            match Option::<String>::deserialize(d)?.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(raw) => parse_day(raw).map(Some).map_err(serde::de::Error::custom),
            }
        }
    }
}
