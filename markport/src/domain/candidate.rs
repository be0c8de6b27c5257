// src/domain/candidate.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmark produced by one of the export-format parsers, ready for import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBookmark {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source_tags: Vec<String>,
}

impl CandidateBookmark {
    pub fn new<S: Into<String>>(url: S, title: S, created_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: None,
            created_at,
            source_tags: Vec::new(),
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn given_parser_json_when_deserialize_then_reads_camel_case_fields() {
        let json = r#"{
            "url": "https://example.com",
            "title": "Example",
            "createdAt": "2024-03-01T10:00:00Z",
            "sourceTags": ["Rust", "web"]
        }"#;

        let candidate: CandidateBookmark = serde_json::from_str(json).unwrap();

        assert_eq!(candidate.url, "https://example.com");
        assert_eq!(candidate.description, None);
        assert_eq!(candidate.source_tags, vec!["Rust", "web"]);
        assert_eq!(
            candidate.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn given_missing_source_tags_when_deserialize_then_defaults_empty() {
        let json = r#"{"url":"https://a.b","title":"t","createdAt":"2024-01-01T00:00:00Z"}"#;
        let candidate: CandidateBookmark = serde_json::from_str(json).unwrap();
        assert!(candidate.source_tags.is_empty());
    }
}
