//! Post records exchanged with the acquisition layer as CSV.

use std::{collections::HashSet, io, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::Result,
    pipeline::{DocumentOutcome, Outcome},
};

/// An ingested post. Engagement counters are carried through verbatim and
/// never interpreted, so `12.0` or `+4` written upstream survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Document {
    #[serde(rename = "post_id")]
    pub id: String,
    pub timestamp: String,
    /// Title and body joined by a newline.
    #[serde(rename = "content")]
    pub text: String,
    /// Lowercased, stopword-free variant produced upstream, if any.
    #[serde(default)]
    pub preprocessed_content: Option<String>,
    #[serde(default)]
    pub likes: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub shares: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            text: text.into(),
            preprocessed_content: None,
            likes: None,
            comments: None,
            shares: None,
        }
    }

    /// Join a title and body the way the acquisition layer does.
    pub fn from_title_body(
        id: impl Into<String>,
        title: &str,
        body: &str,
        timestamp: impl Into<String>,
    ) -> Self {
        Self::new(id, format!("{title}\n{body}"), timestamp)
    }

    /// Upstream cleaned text, when present and non-blank.
    pub fn preprocessed(&self) -> Option<&str> {
        self.preprocessed_content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Read every post of a CSV export. Any malformed row fails the whole read.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let documents = reader
        .deserialize::<Document>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    warn_on_duplicate_ids(&documents);
    info!(path = %path.display(), rows = documents.len(), "read posts");
    Ok(documents)
}

fn warn_on_duplicate_ids(documents: &[Document]) {
    let mut seen = HashSet::new();
    for doc in documents {
        if !seen.insert(doc.id.as_str()) {
            warn!(post_id = %doc.id, "duplicate post id in input");
        }
    }
}

const BASE_COLUMNS: &[&str] = &[
    "post_id",
    "timestamp",
    "content",
    "preprocessed_content",
    "likes",
    "comments",
    "shares",
    "sentiment",
    "risk_level",
    "status",
    "error",
];

const EXPLAIN_COLUMNS: &[&str] = &["high_similarity", "moderate_similarity", "matched_sentence"];

/// Write one row per outcome, failures and skipped posts included.
pub fn write_outcomes<W: io::Write>(
    writer: W,
    outcomes: &[DocumentOutcome],
    explain: bool,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if explain {
        header.extend_from_slice(EXPLAIN_COLUMNS);
    }
    csv.write_record(&header)?;

    for outcome in outcomes {
        csv.write_record(&record(outcome, explain))?;
    }
    csv.flush()?;
    Ok(())
}

/// Convenience wrapper writing to a file, creating parent directories.
pub fn write_outcomes_to_path(path: &Path, outcomes: &[DocumentOutcome], explain: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_outcomes(file, outcomes, explain)?;
    info!(path = %path.display(), rows = outcomes.len(), "wrote classified posts");
    Ok(())
}

fn record(outcome: &DocumentOutcome, explain: bool) -> Vec<String> {
    let doc = &outcome.document;
    let opt = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut fields = vec![
        doc.id.clone(),
        doc.timestamp.clone(),
        doc.text.clone(),
        opt(&doc.preprocessed_content),
        opt(&doc.likes),
        opt(&doc.comments),
        opt(&doc.shares),
    ];

    match &outcome.outcome {
        Outcome::Classified(result) => {
            fields.push(result.sentiment.to_string());
            fields.push(result.risk_level.to_string());
            fields.push(outcome.outcome.status().to_string());
            fields.push(String::new());
        }
        Outcome::Failed(error) => {
            fields.extend([String::new(), String::new()]);
            fields.push(outcome.outcome.status().to_string());
            fields.push(error.clone());
        }
        Outcome::Skipped => {
            fields.extend([String::new(), String::new()]);
            fields.push(outcome.outcome.status().to_string());
            fields.push(String::new());
        }
    }

    if explain {
        let similarity = |value: Option<f32>| value.map(|v| format!("{v:.4}")).unwrap_or_default();
        match &outcome.outcome {
            Outcome::Classified(result) => {
                let assessment = &result.assessment;
                fields.push(similarity(assessment.high_similarity));
                fields.push(similarity(assessment.moderate_similarity));
                fields.push(
                    assessment
                        .matched
                        .as_ref()
                        .map(|m| m.text.clone())
                        .unwrap_or_default(),
                );
            }
            _ => fields.extend([String::new(), String::new(), String::new()]),
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_body_joined_by_newline() {
        let doc = Document::from_title_body("p1", "Rough week", "I need help.", "2024-01-01T00:00:00");
        assert_eq!(doc.text, "Rough week\nI need help.");
    }

    #[test]
    fn blank_preprocessed_content_is_ignored() {
        let mut doc = Document::new("p1", "Hi", "t");
        doc.preprocessed_content = Some("   ".into());
        assert_eq!(doc.preprocessed(), None);
        doc.preprocessed_content = Some("hi".into());
        assert_eq!(doc.preprocessed(), Some("hi"));
    }

    #[test]
    fn optional_columns_may_be_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.csv");
        std::fs::write(
            &path,
            "post_id,timestamp,content\nabc,2024-03-01T10:00:00,\"Title\nBody text.\"\n",
        )
        .unwrap();
        let docs = read_documents(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "abc");
        assert_eq!(docs[0].text, "Title\nBody text.");
        assert_eq!(docs[0].likes, None);
        assert_eq!(docs[0].preprocessed_content, None);
    }

    #[test]
    fn engagement_counters_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.csv");
        std::fs::write(
            &path,
            "post_id,timestamp,content,preprocessed_content,likes,comments,shares\n\
             x1,2024-03-01T10:00:00,Hello,hello,12.0,+4,0\n\
             x2,2024-03-01T11:00:00,Fine day,fine day,3,,n/a\n",
        )
        .unwrap();
        let docs = read_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].likes.as_deref(), Some("12.0"));
        assert_eq!(docs[0].comments.as_deref(), Some("+4"));
        assert_eq!(docs[0].shares.as_deref(), Some("0"));
        assert_eq!(docs[0].preprocessed(), Some("hello"));
        assert_eq!(docs[1].comments, None);
        assert_eq!(docs[1].shares.as_deref(), Some("n/a"));

        let outcomes: Vec<DocumentOutcome> = docs
            .into_iter()
            .map(|doc| DocumentOutcome {
                document: std::sync::Arc::new(doc),
                outcome: Outcome::Skipped,
            })
            .collect();
        let mut buffer = Vec::new();
        write_outcomes(&mut buffer, &outcomes, false).unwrap();
        let written = String::from_utf8(buffer).unwrap();
        assert!(written.contains("x1,2024-03-01T10:00:00,Hello,hello,12.0,+4,0,,,skipped,"));
        assert!(written.contains("x2,2024-03-01T11:00:00,Fine day,fine day,3,,n/a,,,skipped,"));
    }

    #[test]
    fn row_missing_required_column_fails_the_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.csv");
        std::fs::write(&path, "post_id,timestamp,content\nx1,t,Hello\nx2,t\n").unwrap();
        assert!(read_documents(&path).is_err());
    }
}
