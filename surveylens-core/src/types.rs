//! Core domain types for surveylens
//!
//! The raw survey-result feed is a flat list of rows, one per
//! question/answer occurrence for one respondent.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Question** | A survey question, identified by `question_id` |
//! | **Answer** | The option label (or text) one respondent gave for a question |
//! | **Feedback row** | A row of the distinguished first question, carrying a free-text comment and/or a star rating |
//! | **Window** | The time range rows must fall into before aggregation |
//!
//! Rows are immutable snapshots of one fetch. Nothing in this crate
//! mutates a record after it has been deserialized.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::analytics::CalendarZone;

/// Ratings a respondent can give.
pub const STAR_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

// ============================================
// Survey response record
// ============================================

/// One survey-response row as delivered by the result feed.
///
/// Field names follow the upstream JSON payload. `answer_time` is kept
/// verbatim and parsed on demand so that a malformed value never aborts
/// deserialization of the whole feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurveyResponseRecord {
    /// Groups rows belonging to the same question
    #[serde(deserialize_with = "string_or_number")]
    pub question_id: String,
    /// Display text of the question
    #[serde(rename = "question", default, deserialize_with = "nullable_text")]
    pub question_text: String,
    /// The respondent's answer text
    #[serde(default, deserialize_with = "nullable_text")]
    pub answer: String,
    /// Display-order hint for the answer option
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_order: Option<i64>,
    /// When the response was submitted
    ///
    /// Epoch milliseconds are normalised to RFC 3339; `null` becomes an
    /// empty string, which never parses.
    #[serde(default, deserialize_with = "lenient_answer_time")]
    pub answer_time: String,
    /// Marks the first question, which carries comment and star
    #[serde(rename = "first_question", default)]
    pub is_feedback_question: bool,
    /// Free-text comment (feedback rows only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Star rating 1-5 (feedback rows only)
    #[serde(
        default,
        deserialize_with = "optional_star",
        skip_serializing_if = "Option::is_none"
    )]
    pub star: Option<u8>,
}

impl SurveyResponseRecord {
    /// Create a plain (non-feedback) answer row.
    pub fn answer(
        question_id: impl Into<String>,
        question_text: impl Into<String>,
        answer: impl Into<String>,
        answer_time: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: question_text.into(),
            answer: answer.into(),
            answer_order: None,
            answer_time: answer_time.into(),
            is_feedback_question: false,
            comment: None,
            star: None,
        }
    }

    /// Create a feedback row of the first question.
    pub fn feedback(
        question_id: impl Into<String>,
        answer_time: impl Into<String>,
        comment: Option<&str>,
        star: Option<u8>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            question_text: String::new(),
            answer: String::new(),
            answer_order: None,
            answer_time: answer_time.into(),
            is_feedback_question: true,
            comment: comment.map(str::to_string),
            star,
        }
    }

    /// Parse `answer_time` into the given calendar zone.
    ///
    /// Returns `None` for a malformed timestamp.
    pub fn answered_at(&self, zone: &CalendarZone) -> Option<DateTime<FixedOffset>> {
        zone.parse_timestamp(&self.answer_time)
    }

    /// The comment if it carries any text.
    pub fn resolved_comment(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.is_empty())
    }

    /// The star rating if it is a valid 1-5 rating.
    pub fn resolved_star(&self) -> Option<u8> {
        self.star.filter(|s| STAR_RANGE.contains(s))
    }

    /// Whether this row has anything to show in the feedback table.
    pub fn has_feedback_content(&self) -> bool {
        self.resolved_comment().is_some() || self.resolved_star().is_some()
    }
}

// ============================================
// Lenient field decoding
// ============================================

/// Scalar that upstream sometimes sends as a number and sometimes as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Text(s) => s,
    })
}

fn nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => String::new(),
        Some(Scalar::Int(n)) => n.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        Some(Scalar::Text(s)) => s,
    })
}

fn lenient_answer_time<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => String::new(),
        Some(Scalar::Int(millis)) => epoch_millis(millis),
        Some(Scalar::Float(f)) if f.is_finite() => epoch_millis(f as i64),
        Some(Scalar::Float(f)) => f.to_string(),
        Some(Scalar::Text(s)) => s,
    })
}

/// Epoch milliseconds as RFC 3339, or the bare number when out of range.
fn epoch_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

/// Star ratings are display data: a value that is not a whole number in
/// `u8` range decodes as absent instead of rejecting the whole feed.
fn optional_star<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let star = match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Int(n)) => Some(n),
        Some(Scalar::Float(f)) if f.fract() == 0.0 => Some(f as i64),
        Some(Scalar::Float(_)) => None,
        Some(Scalar::Text(s)) => s.trim().parse::<i64>().ok(),
    };
    Ok(star.and_then(|n| u8::try_from(n).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_upstream_row() {
        let json = r#"{
            "question_id": 12,
            "question": "How did you hear about us?",
            "answer": "Friend",
            "answer_order": 2,
            "answer_time": "2024-03-01T10:15:00Z",
            "first_question": false
        }"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.question_id, "12");
        assert_eq!(record.question_text, "How did you hear about us?");
        assert_eq!(record.answer_order, Some(2));
        assert!(!record.is_feedback_question);
        assert!(record.comment.is_none());
        assert!(record.star.is_none());
    }

    #[test]
    fn test_deserialize_feedback_row() {
        let json = r#"{
            "question_id": "q1",
            "question": "Overall",
            "answer": "Satisfied",
            "answer_time": "2024-03-01 10:15:00",
            "first_question": true,
            "comment": "Lovely staff",
            "star": "4"
        }"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();

        assert!(record.is_feedback_question);
        assert_eq!(record.resolved_comment(), Some("Lovely staff"));
        assert_eq!(record.resolved_star(), Some(4));
    }

    #[test]
    fn test_null_and_blank_feedback_fields() {
        let json = r#"{
            "question_id": "q1",
            "answer_time": "2024-03-02",
            "first_question": true,
            "comment": "",
            "star": null
        }"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.comment.as_deref(), Some(""));
        assert!(record.resolved_comment().is_none());
        assert!(record.resolved_star().is_none());
        assert!(!record.has_feedback_content());
    }

    #[test]
    fn test_zero_star_is_absent() {
        let record = SurveyResponseRecord::feedback("q1", "2024-03-02", None, Some(0));
        assert!(record.resolved_star().is_none());
        assert!(!record.has_feedback_content());
    }

    #[test]
    fn test_star_outside_rating_scale_is_absent() {
        for raw in ["6", "9", "300", "-1", "4.5", "\"lots\""] {
            let json = format!(
                r#"{{"question_id": "q1", "answer_time": "2024-03-02", "first_question": true, "star": {}}}"#,
                raw
            );
            let record: SurveyResponseRecord = serde_json::from_str(&json).unwrap();
            assert!(record.resolved_star().is_none(), "star {}", raw);
            assert!(!record.has_feedback_content(), "star {}", raw);
        }

        let record = SurveyResponseRecord::feedback("q1", "2024-03-02", None, Some(5));
        assert_eq!(record.resolved_star(), Some(5));
    }

    #[test]
    fn test_null_answer_time_fails_closed() {
        let json = r#"{"question_id": "q1", "answer": "Yes", "answer_time": null}"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.answer_time, "");
        assert!(record.answered_at(&CalendarZone::utc()).is_none());
    }

    #[test]
    fn test_missing_answer_time_fails_closed() {
        let json = r#"{"question_id": "q1", "answer": "Yes"}"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();
        assert!(record.answered_at(&CalendarZone::utc()).is_none());
    }

    #[test]
    fn test_epoch_millis_answer_time() {
        // 2024-03-14T10:00:00Z
        let json = r#"{"question_id": "q1", "answer": "Yes", "answer_time": 1710410400000}"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();

        let at = record.answered_at(&CalendarZone::utc()).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-14T10:00:00+00:00");
    }

    #[test]
    fn test_null_question_and_answer_text() {
        let json = r#"{"question_id": 7, "question": null, "answer": null, "answer_time": "2024-03-01"}"#;
        let record: SurveyResponseRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.question_text, "");
        assert_eq!(record.answer, "");
        assert!(record.answered_at(&CalendarZone::utc()).is_some());
    }

    #[test]
    fn test_serialize_uses_upstream_names() {
        let record = SurveyResponseRecord::feedback("q1", "2024-03-01", Some("good"), Some(5));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["first_question"], true);
        assert_eq!(value["star"], 5);
        assert_eq!(value["comment"], "good");
        assert!(value.get("answer_order").is_none());
    }
}
