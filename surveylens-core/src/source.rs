//! Survey-result sources.
//!
//! The dashboard receives a flat JSON array of response rows per
//! (company, shop). [`SurveyResultSource`] is the seam for wherever that
//! array comes from; [`JsonDirSource`] reads it from a local directory.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::SurveyResponseRecord;

/// Parse a survey-result payload.
///
/// A blank payload or a JSON `null` means "no results yet" and yields an
/// empty list.
pub fn parse_records(payload: &str) -> Result<Vec<SurveyResponseRecord>> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<SurveyResponseRecord>> = serde_json::from_str(payload)?;
    Ok(records.unwrap_or_default())
}

/// Where survey results come from.
pub trait SurveyResultSource: Send + Sync {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// All result rows for one shop of one company.
    ///
    /// An unknown company or shop is not an error: it has no results.
    fn fetch(&self, company_id: &str, shop_id: &str) -> Result<Vec<SurveyResponseRecord>>;
}

/// Reads `<root>/<company_id>/<shop_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the result file for a shop, after validating both ids.
    pub fn results_path(&self, company_id: &str, shop_id: &str) -> Result<PathBuf> {
        self.check_id("company", company_id)?;
        self.check_id("shop", shop_id)?;
        Ok(self.root.join(company_id).join(format!("{}.json", shop_id)))
    }

    fn check_id(&self, kind: &str, id: &str) -> Result<()> {
        let bad = id.is_empty()
            || id == "."
            || id.contains("..")
            || id.contains('/')
            || id.contains('\\');
        if bad {
            return Err(Error::Source {
                source_name: self.name().to_string(),
                message: format!("invalid {} id: {:?}", kind, id),
            });
        }
        Ok(())
    }
}

impl SurveyResultSource for JsonDirSource {
    fn name(&self) -> &'static str {
        "json-dir"
    }

    fn fetch(&self, company_id: &str, shop_id: &str) -> Result<Vec<SurveyResponseRecord>> {
        let path = self.results_path(company_id, shop_id)?;

        let payload = match std::fs::read_to_string(&path) {
            Ok(payload) => payload,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No survey results for shop");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records = parse_records(&payload)?;
        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            "Read survey results"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAYLOAD: &str = r#"[
        {"question_id": 1, "question": "Happy?", "answer": "Yes", "answer_order": 1,
         "answer_time": "2024-03-01 10:00:00", "first_question": false},
        {"question_id": "fb", "question": "Comments", "answer": "", "answer_time": "2024-03-01",
         "first_question": true, "comment": "great", "star": 5}
    ]"#;

    #[test]
    fn test_parse_records() {
        let records = parse_records(PAYLOAD).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question_id, "1");
        assert_eq!(records[0].answer_order, Some(1));
        assert!(records[1].is_feedback_question);
        assert_eq!(records[1].star, Some(5));
    }

    #[test]
    fn test_parse_empty_payloads() {
        assert!(parse_records("").unwrap().is_empty());
        assert!(parse_records("  \n").unwrap().is_empty());
        assert!(parse_records("null").unwrap().is_empty());
        assert!(parse_records("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_records("{\"oops\""), Err(Error::Json(_))));
        assert!(parse_records("{}").is_err());
    }

    #[test]
    fn test_fetch_reads_shop_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("acme")).unwrap();
        std::fs::write(dir.path().join("acme/shibuya.json"), PAYLOAD).unwrap();

        let source = JsonDirSource::new(dir.path());
        let records = source.fetch("acme", "shibuya").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_fetch_missing_shop_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirSource::new(dir.path());
        assert!(source.fetch("acme", "nowhere").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirSource::new(dir.path());

        for (company, shop) in [("", "a"), ("acme", ""), ("..", "a"), ("acme", "../x"), ("a/b", "c")] {
            let err = source.fetch(company, shop).unwrap_err();
            assert!(matches!(err, Error::Source { .. }), "{company:?}/{shop:?}");
        }
    }
}
