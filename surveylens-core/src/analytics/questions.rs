//! Distinct questions of a record set, one chart panel each.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::SurveyResponseRecord;

/// An answer option as observed in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOption {
    pub label: String,
    /// First display-order hint seen for this option
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// A question and the options it was answered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSummary {
    pub id: String,
    pub text: String,
    /// Options in first-seen order
    pub options: Vec<QuestionOption>,
}

impl QuestionSummary {
    /// Options sorted by their order hint; options without one go last.
    ///
    /// Ties keep first-seen order.
    pub fn options_by_display_order(&self) -> Vec<&QuestionOption> {
        let mut options: Vec<&QuestionOption> = self.options.iter().collect();
        options.sort_by_key(|option| (option.order.is_none(), option.order));
        options
    }
}

/// Derive the question list in first-seen order.
///
/// Independent of any window, so panels do not appear and disappear as
/// the user changes filters.
pub fn distinct_questions(records: &[SurveyResponseRecord]) -> Vec<QuestionSummary> {
    let mut questions: Vec<QuestionSummary> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let idx = *positions
            .entry(record.question_id.as_str())
            .or_insert_with(|| {
                questions.push(QuestionSummary {
                    id: record.question_id.clone(),
                    text: record.question_text.clone(),
                    options: Vec::new(),
                });
                questions.len() - 1
            });

        let question = &mut questions[idx];
        match question
            .options
            .iter_mut()
            .find(|option| option.label == record.answer)
        {
            Some(option) => {
                if option.order.is_none() {
                    option.order = record.answer_order;
                }
            }
            None => question.options.push(QuestionOption {
                label: record.answer.clone(),
                order: record.answer_order,
            }),
        }
    }

    questions
}
