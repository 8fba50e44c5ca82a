//! Calendar arithmetic in one fixed zone.
//!
//! Every window boundary and bucket key is computed from local calendar
//! fields (date, weekday, month) of a single [`CalendarZone`]. Timestamps
//! carrying their own offset are converted into the zone; naive timestamps
//! and bare dates are read as local to it.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

/// Naive datetime layouts accepted for `answer_time`, tried in order.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Date-only layouts, read as the start of that local day.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// First day of a week bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeekStart::Sunday => "sunday",
            WeekStart::Monday => "monday",
        }
    }
}

impl std::str::FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            _ => Err(format!("unknown week start: {}", s)),
        }
    }
}

/// A fixed UTC offset plus the week-start convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarZone {
    offset: FixedOffset,
    week_start: WeekStart,
}

impl Default for CalendarZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl CalendarZone {
    /// UTC with Sunday-start weeks.
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
            week_start: WeekStart::Sunday,
        }
    }

    pub fn new(offset: FixedOffset, week_start: WeekStart) -> Self {
        Self { offset, week_start }
    }

    /// Build a zone from an offset in minutes east of UTC.
    ///
    /// Returns `None` when the offset is out of range.
    pub fn from_offset_minutes(minutes: i32, week_start: WeekStart) -> Option<Self> {
        let seconds = minutes.checked_mul(60)?;
        FixedOffset::east_opt(seconds).map(|offset| Self::new(offset, week_start))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn with_week_start(self, week_start: WeekStart) -> Self {
        Self { week_start, ..self }
    }

    /// Express any instant in this zone.
    pub fn to_zone<Tz: TimeZone>(&self, ts: &DateTime<Tz>) -> DateTime<FixedOffset> {
        ts.with_timezone(&self.offset)
    }

    /// Parse a raw `answer_time` (or date-picker value) into this zone.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.fff]]` with or without a
    /// trailing offset, and bare dates. Anything else is `None`.
    pub fn parse_timestamp(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(self.to_zone(&ts));
        }
        if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(self.to_zone(&ts));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(self.localize(naive));
            }
        }

        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .map(|date| self.start_of_day(date))
    }

    /// Attach this zone's offset to a local wall-clock time.
    fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        DateTime::from_naive_utc_and_offset(naive - self.offset, self.offset)
    }

    /// Local calendar date of an instant.
    pub fn local_date<Tz: TimeZone>(&self, ts: &DateTime<Tz>) -> NaiveDate {
        self.to_zone(ts).date_naive()
    }

    /// First instant of a local day.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        self.localize(date.and_time(NaiveTime::MIN))
    }

    /// Last instant of a local day.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        self.start_of_day(date + Duration::days(1)) - Duration::nanoseconds(1)
    }

    /// Date of the first day of the week containing `date`.
    pub fn start_of_week(&self, date: NaiveDate) -> NaiveDate {
        let day = i64::from(date.weekday().num_days_from_monday());
        let start = i64::from(self.week_start.weekday().num_days_from_monday());
        date - Duration::days((day - start).rem_euclid(7))
    }

    /// Date of the first day of the month containing `date`.
    pub fn start_of_month(date: NaiveDate) -> NaiveDate {
        NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
    }

    /// Whole days elapsed from `then` to `now`, truncated toward zero.
    pub fn days_between<A: TimeZone, B: TimeZone>(&self, now: &DateTime<A>, then: &DateTime<B>) -> i64 {
        self.to_zone(now)
            .signed_duration_since(self.to_zone(then))
            .num_days()
    }

    /// Whole weeks elapsed from `then` to `now`, truncated toward zero.
    pub fn weeks_between<A: TimeZone, B: TimeZone>(&self, now: &DateTime<A>, then: &DateTime<B>) -> i64 {
        self.to_zone(now)
            .signed_duration_since(self.to_zone(then))
            .num_weeks()
    }

    /// Whole calendar months elapsed from `then` to `now`, truncated toward zero.
    ///
    /// A month has elapsed once `now` reaches the same day-of-month and time
    /// as `then` (clamped to the last day of shorter months), so 31 Jan to
    /// 29 Feb is one month but 31 Jan to 28 Feb 2024 is not.
    pub fn months_between<A: TimeZone, B: TimeZone>(&self, now: &DateTime<A>, then: &DateTime<B>) -> i64 {
        let now = self.to_zone(now);
        let then = self.to_zone(then);
        if then > now {
            return -self.months_between(&then, &now);
        }

        let whole = (i64::from(now.year()) - i64::from(then.year())) * 12
            + i64::from(now.month())
            - i64::from(then.month());
        let Ok(months) = u32::try_from(whole) else {
            return whole;
        };

        // Anchor on the later day-of-month so clamping never shortens a month.
        let reached = if then.day() > now.day() {
            then.checked_add_months(Months::new(months))
                .map(|anchor| now >= anchor)
        } else {
            now.checked_sub_months(Months::new(months))
                .map(|anchor| then <= anchor)
        };

        match reached {
            Some(false) => whole - 1,
            _ => whole,
        }
    }
}
