// 📅 Date Oracle - What calendar day does the viewer believe it is?
//
// One instant, two readings:
// 1. Local date: the calendar day under the viewer's timezone policy
// 2. UTC date:   the calendar day under UTC rules on the same instant
//
// When the two disagree the run is inside the window where date-shift bugs
// show up. That is recorded as data, never raised as an error.

use crate::geometry::TickLabelKind;
use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("instant {0}ms is outside the representable calendar range")]
pub struct InvalidInstant(pub i64);

// ============================================================================
// WEEKDAY TABLES
// ============================================================================

/// Short and long weekday names, both indexed 0 (Sunday) through 6 (Saturday).
#[derive(Debug, PartialEq, Eq)]
pub struct WeekdayTable {
    pub short: [&'static str; 7],
    pub long: [&'static str; 7],
}

static GERMAN: WeekdayTable = WeekdayTable {
    short: ["So", "Mo", "Di", "Mi", "Do", "Fr", "Sa"],
    long: [
        "Sonntag",
        "Montag",
        "Dienstag",
        "Mittwoch",
        "Donnerstag",
        "Freitag",
        "Samstag",
    ],
};

static ENGLISH: WeekdayTable = WeekdayTable {
    short: ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"],
    long: [
        "Sunday",
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
    ],
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayLocale {
    /// Labels as the observed app renders them (So, Mo, Di, ...)
    #[default]
    German,
    English,
}

impl WeekdayLocale {
    pub fn table(self) -> &'static WeekdayTable {
        match self {
            WeekdayLocale::German => &GERMAN,
            WeekdayLocale::English => &ENGLISH,
        }
    }
}

// ============================================================================
// TIMEZONE POLICY
// ============================================================================

/// Which calendar rules define the viewer's "local" day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TzPolicy {
    /// The environment's local timezone
    #[default]
    Local,
    Utc,
    /// A fixed offset, for reproducing a viewer anywhere on the globe
    Fixed(FixedOffset),
}

impl FromStr for TzPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "local" => Ok(TzPolicy::Local),
            "utc" | "z" => Ok(TzPolicy::Utc),
            _ => parse_offset(trimmed)
                .map(TzPolicy::Fixed)
                .ok_or_else(|| format!("unrecognised timezone policy: {:?}", s)),
        }
    }
}

impl TryFrom<String> for TzPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TzPolicy> for String {
    fn from(policy: TzPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for TzPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TzPolicy::Local => write!(f, "local"),
            TzPolicy::Utc => write!(f, "utc"),
            TzPolicy::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

/// Accepts `+HH`, `+HHMM` and `+HH:MM` (and the `-` forms).
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes): (i32, i32) = match digits.len() {
        2 => (digits.parse().ok()?, 0),
        4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => return None,
    };

    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ============================================================================
// TIME POINT
// ============================================================================

/// The expected calendar identity of "now", fixed once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub instant: DateTime<Utc>,
    pub tz: TzPolicy,
    pub local_date: NaiveDate,
    pub utc_date: NaiveDate,

    /// 0 = Sunday ... 6 = Saturday, from `local_date`
    pub weekday_index: u8,

    /// Same convention, from `utc_date`
    pub utc_weekday_index: u8,

    pub short_weekday: String,
    pub long_weekday: String,

    /// True when `local_date != utc_date`
    pub crosses_date_boundary: bool,
}

impl TimePoint {
    /// Build the time point for an instant. Infallible: every `DateTime<Utc>` has a calendar day.
    pub fn from_instant(instant: DateTime<Utc>, tz: TzPolicy, locale: WeekdayLocale) -> Self {
        let local_date = match tz {
            TzPolicy::Local => instant.with_timezone(&Local).date_naive(),
            TzPolicy::Utc => instant.date_naive(),
            TzPolicy::Fixed(offset) => instant.with_timezone(&offset).date_naive(),
        };
        let utc_date = instant.date_naive();

        let weekday_index = local_date.weekday().num_days_from_sunday() as u8;
        let utc_weekday_index = utc_date.weekday().num_days_from_sunday() as u8;

        // Both names come from the same index so they can never disagree
        let table = locale.table();
        let slot = weekday_index as usize;

        TimePoint {
            instant,
            tz,
            local_date,
            utc_date,
            weekday_index,
            utc_weekday_index,
            short_weekday: table.short[slot].to_string(),
            long_weekday: table.long[slot].to_string(),
            crosses_date_boundary: local_date != utc_date,
        }
    }

    /// Day of month of the viewer's local date (1-31)
    pub fn day(&self) -> u32 {
        self.local_date.day()
    }

    /// The axis label a correct chart puts under today's bar.
    pub fn expected_tick_label(&self, kind: TickLabelKind) -> String {
        match kind {
            TickLabelKind::DayOfMonth => self.day().to_string(),
            TickLabelKind::Weekday | TickLabelKind::Any => self.short_weekday.clone(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Local {} = {} ({}) | UTC {} | boundary crossed: {}",
            self.local_date,
            self.long_weekday,
            self.short_weekday,
            self.utc_date,
            if self.crosses_date_boundary { "yes" } else { "no" }
        )
    }
}

/// Compute the expected calendar identity for `now_millis` under `tz`.
pub fn compute_expected(
    now_millis: i64,
    tz: TzPolicy,
    locale: WeekdayLocale,
) -> Result<TimePoint, InvalidInstant> {
    let instant = DateTime::from_timestamp_millis(now_millis).ok_or(InvalidInstant(now_millis))?;
    Ok(TimePoint::from_instant(instant, tz, locale))
}

// ============================================================================
// TESTS
// ============================================================================
