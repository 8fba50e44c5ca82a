//! Dashboard analytics engine.
//!
//! Holds the record set of the latest fetch and turns it, together with
//! the user's current controls and an explicit `now`, into one read-only
//! [`DashboardSnapshot`] for the presentation layer.
//!
//! ```text
//! records ──► window filter ──┬─► answer counts  (per question)
//!                             └─► time series    (per question)
//! records ──► feedback processor (own window pass) ─► rows + star histogram
//! ```
//!
//! Every snapshot is a pure function of (records, controls, now). Two
//! snapshots over the same engine can be computed from different threads
//! since nothing is mutated while computing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::answers::{aggregate_answers, AnswerCount};
use super::calendar::CalendarZone;
use super::feedback::{
    process_feedback, FeedbackField, FeedbackQuery, FeedbackTable, SortDirection,
};
use super::questions::{distinct_questions, QuestionSummary};
use super::timeseries::{bucket_records, AggregationUnit, TimeBucketPoint};
use super::window::{filter_records, CustomRange, TimeWindow, WindowKind};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::types::SurveyResponseRecord;

// ============================================
// Controls
// ============================================

/// Everything the user can change on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardControls {
    pub window: WindowKind,
    /// Kept while another window is selected so switching back restores it
    pub custom_range: CustomRange,
    pub aggregation_unit: AggregationUnit,
    pub sort_key: FeedbackField,
    pub sort_direction: SortDirection,
    pub field_filters: BTreeMap<FeedbackField, String>,
}

impl Default for DashboardControls {
    fn default() -> Self {
        Self {
            window: WindowKind::LastMonth,
            custom_range: CustomRange::default(),
            aggregation_unit: AggregationUnit::Day,
            sort_key: FeedbackField::AnswerTime,
            sort_direction: SortDirection::Descending,
            field_filters: BTreeMap::new(),
        }
    }
}

impl DashboardControls {
    /// The window the charts and the feedback table use.
    pub fn time_window(&self) -> TimeWindow {
        TimeWindow::from_kind(self.window, &self.custom_range)
    }

    /// Column-header click: re-clicking the active column flips its
    /// direction, a new column starts ascending.
    pub fn sort_by(&mut self, key: FeedbackField) {
        self.sort_direction = if self.sort_key == key {
            self.sort_direction.toggled()
        } else {
            SortDirection::Ascending
        };
        self.sort_key = key;
    }

    /// Set a column filter; an empty query clears it.
    pub fn set_filter(&mut self, field: FeedbackField, query: impl Into<String>) {
        let query = query.into();
        if query.is_empty() {
            self.field_filters.remove(&field);
        } else {
            self.field_filters.insert(field, query);
        }
    }

    pub fn feedback_query(&self, placeholder: &str) -> FeedbackQuery {
        FeedbackQuery {
            window: self.time_window(),
            sort_key: self.sort_key,
            sort_direction: self.sort_direction,
            field_filters: self.field_filters.clone(),
            placeholder: placeholder.to_string(),
        }
    }
}

// ============================================
// Snapshot
// ============================================

/// Whether the fetch produced any records at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStatus {
    /// Zero records: show "no results yet", not a loading or error state
    Empty,
    Ready,
}

/// Charts for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionPanel {
    pub question: QuestionSummary,
    pub answers: Vec<AnswerCount>,
    pub series: Vec<TimeBucketPoint>,
}

/// Data-quality counters for the current pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub total_records: usize,
    /// Records inside the active window
    pub windowed_records: usize,
    /// Records whose `answer_time` does not parse
    pub malformed_timestamps: usize,
    /// Feedback rows dropped as exact duplicates
    pub duplicate_feedback_rows: usize,
}

/// Everything the presentation layer renders in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub status: DataStatus,
    pub generated_at: DateTime<Utc>,
    pub window: TimeWindow,
    pub aggregation_unit: AggregationUnit,
    pub panels: Vec<QuestionPanel>,
    pub feedback: FeedbackTable,
    pub diagnostics: Diagnostics,
}

impl DashboardSnapshot {
    pub fn is_empty(&self) -> bool {
        self.status == DataStatus::Empty
    }

    pub fn panel(&self, question_id: &str) -> Option<&QuestionPanel> {
        self.panels.iter().find(|p| p.question.id == question_id)
    }
}

// ============================================
// Engine
// ============================================

/// Owner of the current record set.
#[derive(Debug, Clone)]
pub struct DashboardAnalyticsEngine {
    records: Vec<SurveyResponseRecord>,
    questions: Vec<QuestionSummary>,
    zone: CalendarZone,
    placeholder: String,
}

impl Default for DashboardAnalyticsEngine {
    fn default() -> Self {
        Self::new(CalendarZone::utc(), "---")
    }
}

impl DashboardAnalyticsEngine {
    pub fn new(zone: CalendarZone, placeholder: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            questions: Vec::new(),
            zone,
            placeholder: placeholder.into(),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(config.zone()?, config.placeholder.clone()))
    }

    /// Replace the record set with the result of a new fetch.
    pub fn load(&mut self, records: Vec<SurveyResponseRecord>) {
        self.questions = distinct_questions(&records);
        self.records = records;

        let malformed = self.malformed_timestamps();
        tracing::info!(
            records = self.records.len(),
            questions = self.questions.len(),
            "Loaded survey results"
        );
        if malformed > 0 {
            tracing::warn!(malformed, "Survey results with unparseable answer_time");
        }
    }

    pub fn records(&self) -> &[SurveyResponseRecord] {
        &self.records
    }

    /// Distinct questions of the loaded set, independent of controls.
    pub fn questions(&self) -> &[QuestionSummary] {
        &self.questions
    }

    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn windowed(&self, controls: &DashboardControls, now: DateTime<Utc>) -> Vec<&SurveyResponseRecord> {
        filter_records(&self.records, &controls.time_window(), now, self.zone)
    }

    fn malformed_timestamps(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.answered_at(&self.zone).is_none())
            .count()
    }

    /// Answer distribution of one question in the active window.
    pub fn answer_counts(
        &self,
        question_id: &str,
        controls: &DashboardControls,
        now: DateTime<Utc>,
    ) -> Vec<AnswerCount> {
        aggregate_answers(self.windowed(controls, now), question_id)
    }

    /// Time series of one question in the active window.
    pub fn time_series(
        &self,
        question_id: &str,
        controls: &DashboardControls,
        now: DateTime<Utc>,
    ) -> Vec<TimeBucketPoint> {
        bucket_records(
            self.windowed(controls, now),
            question_id,
            controls.aggregation_unit,
            &self.zone,
        )
    }

    /// Feedback table and star histogram in the active window.
    pub fn feedback(&self, controls: &DashboardControls, now: DateTime<Utc>) -> FeedbackTable {
        process_feedback(
            &self.records,
            &controls.feedback_query(&self.placeholder),
            now,
            self.zone,
        )
    }

    /// Compute the full snapshot for the current controls.
    pub fn snapshot(&self, controls: &DashboardControls, now: DateTime<Utc>) -> DashboardSnapshot {
        let windowed = self.windowed(controls, now);

        let mut by_question: HashMap<&str, Vec<&SurveyResponseRecord>> = HashMap::new();
        for record in &windowed {
            by_question
                .entry(record.question_id.as_str())
                .or_default()
                .push(*record);
        }

        let panels: Vec<QuestionPanel> = self
            .questions
            .iter()
            .map(|question| {
                let rows = by_question
                    .get(question.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                QuestionPanel {
                    question: question.clone(),
                    answers: aggregate_answers(rows.iter().copied(), &question.id),
                    series: bucket_records(
                        rows.iter().copied(),
                        &question.id,
                        controls.aggregation_unit,
                        &self.zone,
                    ),
                }
            })
            .collect();

        let feedback = self.feedback(controls, now);

        let diagnostics = Diagnostics {
            total_records: self.records.len(),
            windowed_records: windowed.len(),
            malformed_timestamps: self.malformed_timestamps(),
            duplicate_feedback_rows: feedback.duplicates_removed,
        };

        tracing::debug!(
            window = controls.window.as_str(),
            unit = controls.aggregation_unit.as_str(),
            panels = panels.len(),
            feedback_rows = feedback.rows.len(),
            windowed = diagnostics.windowed_records,
            "Computed dashboard snapshot"
        );

        DashboardSnapshot {
            status: if self.records.is_empty() {
                DataStatus::Empty
            } else {
                DataStatus::Ready
            },
            generated_at: now,
            window: controls.time_window(),
            aggregation_unit: controls.aggregation_unit,
            panels,
            feedback,
            diagnostics,
        }
    }
}
