//! Feedback table and star histogram.
//!
//! Feedback rows are the responses to the distinguished first question,
//! carrying a free-text comment and/or a star rating. Processing runs in a
//! fixed order:
//!
//! 1. keep feedback rows only
//! 2. drop exact duplicates, keeping the first occurrence
//! 3. apply the time window shared with the charts
//! 4. count stars into the histogram
//! 5. stable sort on one column
//! 6. apply case-insensitive substring filters per column
//! 7. drop rows with neither comment nor star

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use super::calendar::CalendarZone;
use super::window::{TimeWindow, WindowFilter};
use crate::format::format_answer_time;
use crate::types::SurveyResponseRecord;

// ============================================
// Columns and sort direction
// ============================================

/// A feedback-table column usable as sort key or filter target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackField {
    AnswerTime,
    Comment,
    Star,
    QuestionId,
    Question,
    Answer,
    AnswerOrder,
}

impl FeedbackField {
    pub const ALL: [FeedbackField; 7] = [
        FeedbackField::AnswerTime,
        FeedbackField::Comment,
        FeedbackField::Star,
        FeedbackField::QuestionId,
        FeedbackField::Question,
        FeedbackField::Answer,
        FeedbackField::AnswerOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackField::AnswerTime => "answer_time",
            FeedbackField::Comment => "comment",
            FeedbackField::Star => "star",
            FeedbackField::QuestionId => "question_id",
            FeedbackField::Question => "question",
            FeedbackField::Answer => "answer",
            FeedbackField::AnswerOrder => "answer_order",
        }
    }
}

impl std::str::FromStr for FeedbackField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedbackField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown feedback field: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smaller values first
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }

    /// The opposite direction; re-clicking the active column uses this.
    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" | "asc" => Ok(SortDirection::Ascending),
            "descending" | "desc" => Ok(SortDirection::Descending),
            _ => Err(format!("unknown sort direction: {}", s)),
        }
    }
}

// ============================================
// Query and output
// ============================================

/// Everything the feedback table depends on besides the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackQuery {
    pub window: TimeWindow,
    pub sort_key: FeedbackField,
    pub sort_direction: SortDirection,
    /// Column → substring; every entry must match
    pub field_filters: BTreeMap<FeedbackField, String>,
    /// Display text for an absent comment or star
    pub placeholder: String,
}

impl Default for FeedbackQuery {
    fn default() -> Self {
        Self {
            window: TimeWindow::All,
            sort_key: FeedbackField::AnswerTime,
            sort_direction: SortDirection::Descending,
            field_filters: BTreeMap::new(),
            placeholder: "---".to_string(),
        }
    }
}

/// A feedback record with its display projection resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRow {
    #[serde(flatten)]
    pub record: SurveyResponseRecord,
    #[serde(skip)]
    pub answered_at: Option<DateTime<FixedOffset>>,
    pub answer_time_display: String,
    pub comment_display: String,
    pub star_display: String,
}

impl FeedbackRow {
    fn new(
        record: &SurveyResponseRecord,
        answered_at: Option<DateTime<FixedOffset>>,
        placeholder: &str,
    ) -> Self {
        Self {
            answer_time_display: answered_at
                .as_ref()
                .map(format_answer_time)
                .unwrap_or_else(|| record.answer_time.clone()),
            comment_display: record
                .resolved_comment()
                .unwrap_or(placeholder)
                .to_string(),
            star_display: record
                .resolved_star()
                .map(|s| s.to_string())
                .unwrap_or_else(|| placeholder.to_string()),
            answered_at,
            record: record.clone(),
        }
    }

    /// Text shown in `field`'s column; what filters match against.
    pub fn display_value(&self, field: FeedbackField) -> Cow<'_, str> {
        match field {
            FeedbackField::AnswerTime => Cow::Borrowed(&self.answer_time_display),
            FeedbackField::Comment => Cow::Borrowed(&self.comment_display),
            FeedbackField::Star => Cow::Borrowed(&self.star_display),
            FeedbackField::QuestionId => Cow::Borrowed(&self.record.question_id),
            FeedbackField::Question => Cow::Borrowed(&self.record.question_text),
            FeedbackField::Answer => Cow::Borrowed(&self.record.answer),
            FeedbackField::AnswerOrder => match self.record.answer_order {
                Some(order) => Cow::Owned(order.to_string()),
                None => Cow::Borrowed(""),
            },
        }
    }

    fn matches(&self, field: FeedbackField, query: &str) -> bool {
        self.display_value(field)
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    fn has_content(&self) -> bool {
        self.record.has_feedback_content()
    }
}

/// Star value (1-5) → number of feedback rows in the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StarHistogram(BTreeMap<u8, usize>);

impl StarHistogram {
    fn add(&mut self, star: u8) {
        *self.0.entry(star).or_insert(0) += 1;
    }

    pub fn count(&self, star: u8) -> usize {
        self.0.get(&star).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stars with at least one rating, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.0.iter().map(|(&star, &count)| (star, count))
    }

    /// Fraction of ratings with this star value.
    pub fn share(&self, star: u8) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.count(star) as f64 / total as f64
        }
    }

    /// Mean rating, if any rating exists.
    pub fn average(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let sum: usize = self.iter().map(|(star, n)| star as usize * n).sum();
        Some(sum as f64 / total as f64)
    }
}

/// Processed feedback table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackTable {
    pub rows: Vec<FeedbackRow>,
    pub star_histogram: StarHistogram,
    /// Exact duplicates removed before windowing
    pub duplicates_removed: usize,
}

// ============================================
// Pipeline
// ============================================

/// Build the feedback table for `records`.
pub fn process_feedback(
    records: &[SurveyResponseRecord],
    query: &FeedbackQuery,
    now: DateTime<Utc>,
    zone: CalendarZone,
) -> FeedbackTable {
    let mut seen: HashSet<&SurveyResponseRecord> = HashSet::new();
    let mut unique: Vec<&SurveyResponseRecord> = Vec::new();
    let mut duplicates_removed = 0;

    for record in records.iter().filter(|r| r.is_feedback_question) {
        if seen.insert(record) {
            unique.push(record);
        } else {
            duplicates_removed += 1;
        }
    }

    if duplicates_removed > 0 {
        tracing::debug!(duplicates_removed, "Dropped duplicate feedback rows");
    }

    let filter = WindowFilter::new(&query.window, now, zone);
    let mut rows: Vec<FeedbackRow> = unique
        .into_iter()
        .filter_map(|record| {
            let answered_at = record.answered_at(&zone);
            filter
                .accepts_time(answered_at)
                .then(|| FeedbackRow::new(record, answered_at, &query.placeholder))
        })
        .collect();

    let mut star_histogram = StarHistogram::default();
    for star in rows.iter().filter_map(|row| row.record.resolved_star()) {
        star_histogram.add(star);
    }

    rows.sort_by(|a, b| compare_rows(a, b, query.sort_key, query.sort_direction));

    rows.retain(|row| {
        query
            .field_filters
            .iter()
            .all(|(&field, needle)| row.matches(field, needle))
    });
    rows.retain(FeedbackRow::has_content);

    FeedbackTable {
        rows,
        star_histogram,
        duplicates_removed,
    }
}

fn compare_rows(
    a: &FeedbackRow,
    b: &FeedbackRow,
    key: FeedbackField,
    direction: SortDirection,
) -> Ordering {
    let (ra, rb) = (&a.record, &b.record);
    match key {
        FeedbackField::AnswerTime => compare_present(a.answered_at, b.answered_at, direction),
        FeedbackField::Comment => {
            compare_present(ra.resolved_comment(), rb.resolved_comment(), direction)
        }
        FeedbackField::Star => compare_present(ra.resolved_star(), rb.resolved_star(), direction),
        FeedbackField::AnswerOrder => compare_present(ra.answer_order, rb.answer_order, direction),
        FeedbackField::QuestionId => direction.apply(ra.question_id.cmp(&rb.question_id)),
        FeedbackField::Question => direction.apply(ra.question_text.cmp(&rb.question_text)),
        FeedbackField::Answer => direction.apply(ra.answer.cmp(&rb.answer)),
    }
}

/// Present values compare in `direction`; absent values go last either way.
fn compare_present<T: Ord>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn fb(answer_time: &str, comment: Option<&str>, star: Option<u8>) -> SurveyResponseRecord {
        SurveyResponseRecord::feedback("q1", answer_time, comment, star)
    }

    fn run(records: &[SurveyResponseRecord], query: &FeedbackQuery) -> FeedbackTable {
        process_feedback(records, query, now(), CalendarZone::utc())
    }

    fn comments(table: &FeedbackTable) -> Vec<&str> {
        table
            .rows
            .iter()
            .map(|r| r.comment_display.as_str())
            .collect()
    }

    #[test]
    fn test_only_feedback_rows() {
        let records = vec![
            SurveyResponseRecord::answer("q2", "Q", "Yes", "2024-03-01"),
            fb("2024-03-01", Some("nice"), Some(4)),
        ];
        let table = run(&records, &FeedbackQuery::default());
        assert_eq!(comments(&table), vec!["nice"]);
    }

    #[test]
    fn test_identical_rows_deduplicated() {
        let row = fb("2024-03-01T10:00:00Z", Some("good"), Some(5));
        let records = vec![row.clone(), row];
        let table = run(&records, &FeedbackQuery::default());

        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.duplicates_removed, 1);
        assert_eq!(table.star_histogram.count(5), 1);
    }

    #[test]
    fn test_rows_differing_in_one_field_are_kept() {
        let records = vec![
            fb("2024-03-01T10:00:00Z", Some("good"), Some(5)),
            fb("2024-03-01T10:00:00Z", Some("good"), Some(4)),
        ];
        let table = run(&records, &FeedbackQuery::default());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.duplicates_removed, 0);
    }

    #[test]
    fn test_empty_rows_suppressed_without_filters() {
        let records = vec![
            fb("2024-03-01", Some("good"), Some(5)),
            fb("2024-03-02", Some(""), None),
            fb("2024-03-03", None, None),
        ];
        let table = run(&records, &FeedbackQuery::default());

        assert_eq!(comments(&table), vec!["good"]);
        assert_eq!(table.star_histogram.iter().collect::<Vec<_>>(), vec![(5, 1)]);
    }

    #[test]
    fn test_sparse_rows_shown_with_placeholder() {
        let records = vec![
            fb("2024-03-01", Some("no stars given"), None),
            fb("2024-03-02", None, Some(3)),
        ];
        let table = run(&records, &FeedbackQuery::default());

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].comment_display, "---");
        assert_eq!(table.rows[0].star_display, "3");
        assert_eq!(table.rows[1].star_display, "---");
    }

    #[test]
    fn test_window_applies_to_rows_and_histogram() {
        let records = vec![
            fb("2024-03-14T12:00:00Z", Some("recent"), Some(5)),
            fb("2024-01-01T12:00:00Z", Some("old"), Some(1)),
        ];
        let query = FeedbackQuery {
            window: TimeWindow::LastMonth,
            ..Default::default()
        };
        let table = run(&records, &query);

        assert_eq!(comments(&table), vec!["recent"]);
        assert_eq!(table.star_histogram.count(1), 0);
        assert_eq!(table.star_histogram.total(), 1);
    }

    #[test]
    fn test_histogram_counts_filtered_out_rows() {
        let records = vec![
            fb("2024-03-01", Some("very good"), Some(5)),
            fb("2024-03-02", Some("bad"), Some(1)),
        ];
        let mut query = FeedbackQuery::default();
        query
            .field_filters
            .insert(FeedbackField::Comment, "good".to_string());
        let table = run(&records, &query);

        assert_eq!(comments(&table), vec!["very good"]);
        assert_eq!(table.star_histogram.total(), 2);
    }

    #[test]
    fn test_sort_by_time_both_directions() {
        let records = vec![
            fb("2024-03-02T09:00:00Z", Some("b"), None),
            fb("2024-03-01T09:00:00Z", Some("a"), None),
            // 2024-03-02T03:00Z, between the other two
            fb("2024-03-02T12:00:00+09:00", Some("c"), None),
        ];
        let mut query = FeedbackQuery::default();
        assert_eq!(comments(&run(&records, &query)), vec!["b", "c", "a"]);

        query.sort_direction = SortDirection::Ascending;
        assert_eq!(comments(&run(&records, &query)), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let records = vec![
            fb("2024-03-01", Some("first"), Some(4)),
            fb("2024-03-02", Some("second"), Some(4)),
            fb("2024-03-03", Some("third"), Some(2)),
            fb("2024-03-04", Some("fourth"), Some(4)),
        ];
        let query = FeedbackQuery {
            sort_key: FeedbackField::Star,
            sort_direction: SortDirection::Descending,
            ..Default::default()
        };
        assert_eq!(
            comments(&run(&records, &query)),
            vec!["first", "second", "fourth", "third"]
        );
    }

    #[test]
    fn test_absent_values_sort_last() {
        let records = vec![
            fb("2024-03-01", None, Some(2)),
            fb("2024-03-02", Some("zebra"), None),
            fb("2024-03-03", Some("apple"), None),
        ];
        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let query = FeedbackQuery {
                sort_key: FeedbackField::Comment,
                sort_direction: direction,
                ..Default::default()
            };
            let table = run(&records, &query);
            assert_eq!(table.rows.last().unwrap().comment_display, "---");
        }
    }

    #[test]
    fn test_malformed_time_sorts_last_under_all() {
        let records = vec![
            fb("someday", Some("undated"), None),
            fb("2024-03-01", Some("dated"), None),
        ];
        let table = run(&records, &FeedbackQuery::default());
        assert_eq!(comments(&table), vec!["dated", "undated"]);
        assert_eq!(table.rows[1].answer_time_display, "someday");
    }

    #[test]
    fn test_filters_case_insensitive_and_combined() {
        let records = vec![
            fb("2024-03-01", Some("Very GOOD service"), Some(5)),
            fb("2024-03-02", Some("good food"), Some(3)),
            fb("2024-03-03", Some("bad"), Some(5)),
        ];
        let mut query = FeedbackQuery::default();
        query
            .field_filters
            .insert(FeedbackField::Comment, "good".to_string());
        query
            .field_filters
            .insert(FeedbackField::Star, "5".to_string());

        assert_eq!(comments(&run(&records, &query)), vec!["Very GOOD service"]);
    }

    #[test]
    fn test_filter_on_display_time() {
        let records = vec![
            fb("2024-03-01T10:15:30Z", Some("morning"), None),
            fb("2024-03-01T18:00:00Z", Some("evening"), None),
        ];
        let mut query = FeedbackQuery::default();
        query
            .field_filters
            .insert(FeedbackField::AnswerTime, "2024-03-01 10:15".to_string());
        assert_eq!(comments(&run(&records, &query)), vec!["morning"]);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let records = vec![fb("2024-03-01", Some("x"), None), fb("2024-03-02", None, Some(1))];
        let mut query = FeedbackQuery::default();
        query
            .field_filters
            .insert(FeedbackField::Comment, String::new());
        assert_eq!(run(&records, &query).rows.len(), 2);
    }

    #[test]
    fn test_suppressed_row_never_passes_filter() {
        let records = vec![fb("2024-03-01", None, None)];
        let mut query = FeedbackQuery::default();
        query
            .field_filters
            .insert(FeedbackField::Comment, "-".to_string());
        assert!(run(&records, &query).rows.is_empty());
    }

    #[test]
    fn test_histogram_helpers() {
        let records = vec![
            fb("2024-03-01", None, Some(5)),
            fb("2024-03-02", None, Some(5)),
            fb("2024-03-03", None, Some(2)),
        ];
        let histogram = run(&records, &FeedbackQuery::default()).star_histogram;

        assert_eq!(histogram.total(), 3);
        assert!((histogram.share(5) - 2.0 / 3.0).abs() < 1e-9);
        assert!((histogram.average().unwrap() - 4.0).abs() < 1e-9);
        assert!(StarHistogram::default().average().is_none());
    }

    #[test]
    fn test_star_outside_scale_not_counted() {
        let records = vec![
            fb("2024-03-01", Some("odd"), Some(9)),
            fb("2024-03-02", None, Some(6)),
            fb("2024-03-03", None, Some(4)),
        ];
        let table = run(&records, &FeedbackQuery::default());

        assert_eq!(table.star_histogram.iter().collect::<Vec<_>>(), vec![(4, 1)]);
        assert_eq!(table.star_histogram.average(), Some(4.0));
        // the star-only row with 6 has nothing left to show
        assert_eq!(comments(&table), vec!["---", "odd"]);
        let stars: Vec<_> = table.rows.iter().map(|r| r.star_display.as_str()).collect();
        assert_eq!(stars, vec!["4", "---"]);
    }

    #[test]
    fn test_field_and_direction_names() {
        for field in FeedbackField::ALL {
            assert_eq!(field.as_str().parse::<FeedbackField>().unwrap(), field);
        }
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Ascending);
        assert_eq!(
            SortDirection::Ascending.toggled(),
            SortDirection::Descending
        );
        assert!("sideways".parse::<SortDirection>().is_err());
    }
}
