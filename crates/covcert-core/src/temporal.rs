//! # Temporal Primitives
//!
//! Parsing and arithmetic for the two kinds of time values found in
//! health credentials:
//!
//! - **Calendar dates** (`yyyy-MM-dd`): vaccination date, first positive
//!   test date. These have no time of day; they are resolved to local
//!   midnight of an *evaluation calendar* (any [`chrono::TimeZone`]).
//! - **Timestamps** (ISO 8601 with offset): test sample collection and
//!   result times. These are absolute instants.
//!
//! ## Day vs. Hour Arithmetic
//!
//! Day offsets are calendar-day additions in the evaluation calendar:
//! "15 days after 2021-03-20" is local midnight of 2021-04-04 even if a
//! DST transition makes that 359 or 361 wall-clock hours later. Hour
//! offsets are absolute: "72 hours" is always 259 200 seconds. The two are
//! deliberately not required to coincide across a DST transition.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{
    DateTime, Days, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, Offset,
    TimeZone, Utc,
};

use crate::error::ValidationError;

/// Calendar date format used by credential payloads.
pub const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format without fractional seconds (first parse attempt).
const WHOLE_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Timestamp format with fractional seconds (fallback parse attempt).
const FRACTIONAL_SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Parse an ISO 8601 timestamp with an offset or `Z` designator.
///
/// The first attempt accepts whole seconds only; the fallback accepts
/// fractional seconds. Both `2021-09-01T10:00:00Z` and
/// `2021-09-01T10:00:00.123+02:00` parse.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimestamp`] if neither form matches.
pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let normalized = normalize_utc_designator(value.trim());

    DateTime::parse_from_str(&normalized, WHOLE_SECONDS_FORMAT)
        .or_else(|_| DateTime::parse_from_str(&normalized, FRACTIONAL_SECONDS_FORMAT))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// `%:z` does not accept the `Z` designator, so rewrite it as `+00:00`.
fn normalize_utc_designator(value: &str) -> Cow<'_, str> {
    match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(stripped) => Cow::Owned(format!("{stripped}+00:00")),
        None => Cow::Borrowed(value),
    }
}

/// Parse a `yyyy-MM-dd` calendar date.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDate`] for any other shape.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), CALENDAR_DATE_FORMAT).map_err(|_| {
        ValidationError::InvalidDate {
            value: value.to_string(),
        }
    })
}

/// Resolve a calendar date to the UTC instant of local midnight in
/// `calendar`.
///
/// Returns `None` only if the date is out of chrono's representable range.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, calendar: &Tz) -> Option<DateTime<Utc>> {
    resolve_local(calendar, date.and_hms_opt(0, 0, 0)?)
}

/// Add `days` calendar days to `instant`, keeping the local wall-clock time
/// in `calendar`.
///
/// Returns `None` on overflow.
pub fn add_calendar_days<Tz: TimeZone>(
    instant: DateTime<Utc>,
    days: u32,
    calendar: &Tz,
) -> Option<DateTime<Utc>> {
    let local = instant.with_timezone(calendar).naive_local();
    let shifted = local.checked_add_days(Days::new(u64::from(days)))?;
    resolve_local(calendar, shifted)
}

/// Add `hours` absolute hours to `instant`.
///
/// Returns `None` on overflow.
pub fn add_hours(instant: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    instant.checked_add_signed(Duration::hours(i64::from(hours)))
}

/// Map a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Nonexistent
/// times fall in a forward transition gap; they are read with the offset
/// in force before the gap, which moves them forward by the gap's length
/// whether it is one hour (DST) or a whole skipped day.
fn resolve_local<Tz: TimeZone>(calendar: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = calendar.from_local_datetime(&local).earliest() {
        return Some(dt.with_timezone(&Utc));
    }
    let before_gap = local.checked_sub_signed(Duration::days(GAP_LOOKBACK_DAYS))?;
    let offset = calendar.offset_from_utc_datetime(&before_gap).fix();
    let utc = local.checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
    Some(Utc.from_utc_datetime(&utc))
}

/// How far before a nonexistent local time to sample the pre-gap offset.
/// Longer than any skipped span in the time zone database.
const GAP_LOOKBACK_DAYS: i64 = 2;

/// The calendar in which credential dates are interpreted.
///
/// `Local` follows the host time zone database (DST-aware) and is the
/// default, matching how a scanning device reads a printed date. `Utc` and
/// `Fixed` are for servers and tests that need a reproducible calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationCalendar {
    /// Host local time zone.
    #[default]
    Local,
    /// Coordinated Universal Time.
    Utc,
    /// A fixed offset from UTC, without DST.
    Fixed(FixedOffset),
}

impl EvaluationCalendar {
    fn utc_offset() -> FixedOffset {
        Utc.fix()
    }
}

impl FromStr for EvaluationCalendar {
    type Err = ValidationError;

    /// Accepts `local`, `utc`, or an offset such as `+02:00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" | "z" => Ok(Self::Utc),
            other => {
                let sample = format!("2000-01-01T00:00:00{other}");
                DateTime::parse_from_str(&sample, WHOLE_SECONDS_FORMAT)
                    .map(|dt| Self::Fixed(*dt.offset()))
                    .map_err(|e| ValidationError::InvalidTimestamp {
                        value: s.to_string(),
                        reason: format!("not a calendar name or UTC offset: {e}"),
                    })
            }
        }
    }
}

impl TimeZone for EvaluationCalendar {
    type Offset = FixedOffset;

    fn from_offset(offset: &FixedOffset) -> Self {
        Self::Fixed(*offset)
    }

    #[allow(deprecated)]
    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
        match self {
            Self::Local => Local.offset_from_local_date(local),
            Self::Utc => LocalResult::Single(Self::utc_offset()),
            Self::Fixed(offset) => LocalResult::Single(*offset),
        }
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        match self {
            Self::Local => Local.offset_from_local_datetime(local),
            Self::Utc => LocalResult::Single(Self::utc_offset()),
            Self::Fixed(offset) => LocalResult::Single(*offset),
        }
    }

    #[allow(deprecated)]
    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        match self {
            Self::Local => Local.offset_from_utc_date(utc),
            Self::Utc => Self::utc_offset(),
            Self::Fixed(offset) => *offset,
        }
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            Self::Local => Local.offset_from_utc_datetime(utc),
            Self::Utc => Self::utc_offset(),
            Self::Fixed(offset) => *offset,
        }
    }
}
