//! Calendar-aligned response counts over time.
//!
//! Buckets are keyed by the first local date of their day, week or month
//! and emitted in calendar order. The series is sparse: buckets without
//! responses are not synthesized.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::calendar::CalendarZone;
use crate::types::SurveyResponseRecord;

/// Label of the single point produced by [`AggregationUnit::All`].
pub const ALL_BUCKET_LABEL: &str = "all";

/// Granularity of the time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationUnit {
    #[default]
    Day,
    Week,
    Month,
    /// The whole window as one point
    All,
}

impl AggregationUnit {
    pub const ALL: [AggregationUnit; 4] = [
        AggregationUnit::Day,
        AggregationUnit::Week,
        AggregationUnit::Month,
        AggregationUnit::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationUnit::Day => "day",
            AggregationUnit::Week => "week",
            AggregationUnit::Month => "month",
            AggregationUnit::All => "all",
        }
    }
}

impl std::str::FromStr for AggregationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| format!("unknown aggregation unit: {}", s))
    }
}

/// One point of a time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucketPoint {
    /// `YYYY-MM-DD` bucket start, or [`ALL_BUCKET_LABEL`]
    pub bucket_label: String,
    pub count: usize,
}

/// Bucket key of an instant, or `None` for [`AggregationUnit::All`].
pub fn bucket_key(
    at: &DateTime<FixedOffset>,
    unit: AggregationUnit,
    zone: &CalendarZone,
) -> Option<NaiveDate> {
    let date = zone.local_date(at);
    match unit {
        AggregationUnit::Day => Some(date),
        AggregationUnit::Week => Some(zone.start_of_week(date)),
        AggregationUnit::Month => Some(CalendarZone::start_of_month(date)),
        AggregationUnit::All => None,
    }
}

/// Count responses to `question_id` per calendar bucket.
///
/// Expects records already narrowed to the active window. With
/// [`AggregationUnit::All`] every matching record counts, including one
/// with an unparseable timestamp; the calendar units skip such records
/// because they have no bucket.
pub fn bucket_records<'a, I>(
    records: I,
    question_id: &str,
    unit: AggregationUnit,
    zone: &CalendarZone,
) -> Vec<TimeBucketPoint>
where
    I: IntoIterator<Item = &'a SurveyResponseRecord>,
{
    let matching = records
        .into_iter()
        .filter(|record| record.question_id == question_id);

    if unit == AggregationUnit::All {
        return vec![TimeBucketPoint {
            bucket_label: ALL_BUCKET_LABEL.to_string(),
            count: matching.count(),
        }];
    }

    let mut buckets: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in matching {
        let Some(at) = record.answered_at(zone) else {
            continue;
        };
        if let Some(key) = bucket_key(&at, unit, zone) {
            *buckets.entry(key).or_insert(0) += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, count)| TimeBucketPoint {
            bucket_label: date.format("%Y-%m-%d").to_string(),
            count,
        })
        .collect()
}
