//! Per-question answer distributions.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::SurveyResponseRecord;

/// How many times one answer was given for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerCount {
    pub option: String,
    pub count: usize,
}

impl AnswerCount {
    /// Fraction of `total` this answer represents (0.0 when `total` is zero).
    pub fn share(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.count as f64 / total as f64
        }
    }
}

/// Count answers to `question_id`.
///
/// Answers appear in the order they were first encountered, so chart
/// legends stay put when a new answer shows up later in the feed.
pub fn aggregate_answers<'a, I>(records: I, question_id: &str) -> Vec<AnswerCount>
where
    I: IntoIterator<Item = &'a SurveyResponseRecord>,
{
    let mut counts: Vec<AnswerCount> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for record in records {
        if record.question_id != question_id {
            continue;
        }
        match positions.get(record.answer.as_str()) {
            Some(&idx) => counts[idx].count += 1,
            None => {
                positions.insert(record.answer.as_str(), counts.len());
                counts.push(AnswerCount {
                    option: record.answer.clone(),
                    count: 1,
                });
            }
        }
    }

    counts
}

/// Sum of all counts in a distribution.
pub fn total_answers(counts: &[AnswerCount]) -> usize {
    counts.iter().map(|c| c.count).sum()
}
