//! Analytics for survey dashboards.
//!
//! Provides the aggregations a store-level dashboard renders:
//! - Time-window filtering (relative windows, custom date ranges, all time)
//! - Per-question answer distributions
//! - Calendar-aligned time series (day, week, month, or one point)
//! - The feedback table: dedup, sort, column filters, star histogram
//!
//! [`DashboardAnalyticsEngine`] ties these together into one
//! [`DashboardSnapshot`] per render. The individual functions are exported
//! as well for callers that only need one aggregation.
//!
//! All calendar arithmetic goes through a [`CalendarZone`] and an explicit
//! `now`, so results do not depend on the host clock or time zone.

pub mod answers;
pub mod calendar;
pub mod dashboard;
pub mod feedback;
pub mod questions;
pub mod timeseries;
pub mod window;

pub use answers::{aggregate_answers, total_answers, AnswerCount};
pub use calendar::{CalendarZone, WeekStart};
pub use dashboard::{
    DashboardAnalyticsEngine, DashboardControls, DashboardSnapshot, DataStatus, Diagnostics,
    QuestionPanel,
};
pub use feedback::{
    process_feedback, FeedbackField, FeedbackQuery, FeedbackRow, FeedbackTable, SortDirection,
    StarHistogram,
};
pub use questions::{distinct_questions, QuestionOption, QuestionSummary};
pub use timeseries::{
    bucket_key, bucket_records, AggregationUnit, TimeBucketPoint, ALL_BUCKET_LABEL,
};
pub use window::{filter_records, CustomRange, TimeWindow, WindowFilter, WindowKind};
