//! Time windows over survey responses.
//!
//! Relative windows compare calendar-unit differences against `now`
//! with a strict `<`, so a response exactly three days old falls outside
//! the three-day window. A custom range is inclusive on both ends and
//! spans whole local days. Anything that cannot be parsed fails closed.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::CalendarZone;
use crate::types::SurveyResponseRecord;

/// Window selector as offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindowKind {
    #[serde(rename = "3days")]
    Last3Days,
    #[serde(rename = "week")]
    LastWeek,
    #[default]
    #[serde(rename = "month")]
    LastMonth,
    #[serde(rename = "3months")]
    Last3Months,
    #[serde(rename = "custom")]
    Custom,
    #[serde(rename = "all")]
    All,
}

impl WindowKind {
    pub const ALL: [WindowKind; 6] = [
        WindowKind::Last3Days,
        WindowKind::LastWeek,
        WindowKind::LastMonth,
        WindowKind::Last3Months,
        WindowKind::Custom,
        WindowKind::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Last3Days => "3days",
            WindowKind::LastWeek => "week",
            WindowKind::LastMonth => "month",
            WindowKind::Last3Months => "3months",
            WindowKind::Custom => "custom",
            WindowKind::All => "all",
        }
    }

    /// Human-readable label for selectors and report headers.
    pub fn label(&self) -> &'static str {
        match self {
            WindowKind::Last3Days => "Last 3 days",
            WindowKind::LastWeek => "Last week",
            WindowKind::LastMonth => "Last month",
            WindowKind::Last3Months => "Last 3 months",
            WindowKind::Custom => "Custom range",
            WindowKind::All => "All time",
        }
    }
}

impl std::str::FromStr for WindowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindowKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown time window: {}", s))
    }
}

/// Inclusive date range picked by the user, kept as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomRange {
    pub start: String,
    pub end: String,
}

impl CustomRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A resolved time window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind")]
pub enum TimeWindow {
    #[serde(rename = "3days")]
    Last3Days,
    #[serde(rename = "week")]
    LastWeek,
    #[serde(rename = "month")]
    LastMonth,
    #[serde(rename = "3months")]
    Last3Months,
    #[serde(rename = "custom")]
    Custom(CustomRange),
    #[serde(rename = "all")]
    All,
}

impl TimeWindow {
    /// Combine a selector with the (possibly stale) custom range.
    ///
    /// The range only takes effect when `kind` is [`WindowKind::Custom`].
    pub fn from_kind(kind: WindowKind, custom: &CustomRange) -> Self {
        match kind {
            WindowKind::Last3Days => TimeWindow::Last3Days,
            WindowKind::LastWeek => TimeWindow::LastWeek,
            WindowKind::LastMonth => TimeWindow::LastMonth,
            WindowKind::Last3Months => TimeWindow::Last3Months,
            WindowKind::Custom => TimeWindow::Custom(custom.clone()),
            WindowKind::All => TimeWindow::All,
        }
    }

    pub fn custom(start: impl Into<String>, end: impl Into<String>) -> Self {
        TimeWindow::Custom(CustomRange::new(start, end))
    }

    pub fn kind(&self) -> WindowKind {
        match self {
            TimeWindow::Last3Days => WindowKind::Last3Days,
            TimeWindow::LastWeek => WindowKind::LastWeek,
            TimeWindow::LastMonth => WindowKind::LastMonth,
            TimeWindow::Last3Months => WindowKind::Last3Months,
            TimeWindow::Custom(_) => WindowKind::Custom,
            TimeWindow::All => WindowKind::All,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Predicate {
    Always,
    Never,
    WithinDays(i64),
    WithinWeeks(i64),
    WithinMonths(i64),
    Between(DateTime<FixedOffset>, DateTime<FixedOffset>),
}

/// A window bound to one `now` and one zone, ready to test timestamps.
///
/// Resolving up front parses custom bounds once per pass instead of once
/// per record.
#[derive(Debug, Clone, Copy)]
pub struct WindowFilter {
    predicate: Predicate,
    now: DateTime<FixedOffset>,
    zone: CalendarZone,
}

impl WindowFilter {
    pub fn new(window: &TimeWindow, now: DateTime<Utc>, zone: CalendarZone) -> Self {
        let predicate = match window {
            TimeWindow::Last3Days => Predicate::WithinDays(3),
            TimeWindow::LastWeek => Predicate::WithinWeeks(1),
            TimeWindow::LastMonth => Predicate::WithinMonths(1),
            TimeWindow::Last3Months => Predicate::WithinMonths(3),
            TimeWindow::All => Predicate::Always,
            TimeWindow::Custom(range) => {
                let start = zone.parse_timestamp(&range.start);
                let end = zone.parse_timestamp(&range.end);
                match (start, end) {
                    (Some(start), Some(end)) => Predicate::Between(
                        zone.start_of_day(start.date_naive()),
                        zone.end_of_day(end.date_naive()),
                    ),
                    _ => {
                        tracing::debug!(
                            start = %range.start,
                            end = %range.end,
                            "Unparseable custom range, excluding every record"
                        );
                        Predicate::Never
                    }
                }
            }
        };

        Self {
            predicate,
            now: zone.to_zone(&now),
            zone,
        }
    }

    /// Whether a (possibly unparseable) timestamp falls inside the window.
    ///
    /// Only the all-time window keeps an unparseable timestamp.
    pub fn accepts_time(&self, at: Option<DateTime<FixedOffset>>) -> bool {
        match (self.predicate, at) {
            (Predicate::Always, _) => true,
            (Predicate::Never, _) | (_, None) => false,
            (Predicate::WithinDays(limit), Some(at)) => self.zone.days_between(&self.now, &at) < limit,
            (Predicate::WithinWeeks(limit), Some(at)) => {
                self.zone.weeks_between(&self.now, &at) < limit
            }
            (Predicate::WithinMonths(limit), Some(at)) => {
                self.zone.months_between(&self.now, &at) < limit
            }
            (Predicate::Between(start, end), Some(at)) => at >= start && at <= end,
        }
    }

    pub fn accepts(&self, record: &SurveyResponseRecord) -> bool {
        self.accepts_time(record.answered_at(&self.zone))
    }
}

/// Keep the records whose `answer_time` falls inside `window`.
///
/// Input order is preserved.
pub fn filter_records<'a, I>(
    records: I,
    window: &TimeWindow,
    now: DateTime<Utc>,
    zone: CalendarZone,
) -> Vec<&'a SurveyResponseRecord>
where
    I: IntoIterator<Item = &'a SurveyResponseRecord>,
{
    let filter = WindowFilter::new(window, now, zone);
    records.into_iter().filter(|r| filter.accepts(r)).collect()
}
