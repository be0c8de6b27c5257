// src/domain/dedup.rs
use std::collections::HashSet;

use crate::domain::candidate::CandidateBookmark;
use crate::domain::record::StoredBookmark;
use crate::domain::url::{canonical_url, is_web_url};
use tracing::{debug, instrument};

/// Candidates split against the owner's existing bookmarks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub to_import: Vec<CandidateBookmark>,
    /// Already present remotely, or repeated earlier in the same input
    pub duplicates: Vec<CandidateBookmark>,
    /// No canonical http(s) form
    pub invalid: Vec<CandidateBookmark>,
}

impl DedupOutcome {
    pub fn total(&self) -> usize {
        self.to_import.len() + self.skipped()
    }

    /// Candidates that will not be written: duplicates plus invalid URLs.
    pub fn skipped(&self) -> usize {
        self.duplicates.len() + self.invalid.len()
    }
}

/// Partition candidates into those to import and those to skip.
///
/// Equality is on the canonical URL on both sides. Within the input the first
/// occurrence wins; input order is preserved in every partition.
#[instrument(skip_all, level = "debug", fields(candidates = candidates.len(), existing = existing.len()))]
pub fn partition_candidates(
    candidates: Vec<CandidateBookmark>,
    existing: &[StoredBookmark],
) -> DedupOutcome {
    let mut seen: HashSet<String> = existing
        .iter()
        .filter_map(|bm| canonical_url(&bm.record.subject))
        .collect();

    let mut outcome = DedupOutcome::default();
    for candidate in candidates {
        if !is_web_url(&candidate.url) {
            outcome.invalid.push(candidate);
            continue;
        }
        match canonical_url(&candidate.url) {
            None => outcome.invalid.push(candidate),
            Some(key) => {
                if seen.insert(key) {
                    outcome.to_import.push(candidate);
                } else {
                    outcome.duplicates.push(candidate);
                }
            }
        }
    }

    debug!(
        "Dedup: {} to import, {} duplicates, {} invalid",
        outcome.to_import.len(),
        outcome.duplicates.len(),
        outcome.invalid.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::BookmarkRecord;
    use chrono::Utc;

    fn candidate(url: &str) -> CandidateBookmark {
        CandidateBookmark::new(url, "title", Utc::now())
    }

    fn existing(url: &str) -> StoredBookmark {
        StoredBookmark {
            rkey: "rk".to_string(),
            record: BookmarkRecord {
                subject: url.to_string(),
                title: "existing".to_string(),
                description: None,
                tags: vec![],
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn given_existing_url_with_other_query_when_partition_then_duplicate() {
        let outcome = partition_candidates(
            vec![candidate("https://a.com/x?ref=feed"), candidate("https://b.com/")],
            &[existing("https://a.com/x#section")],
        );

        assert_eq!(outcome.to_import.len(), 1);
        assert_eq!(outcome.to_import[0].url, "https://b.com/");
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.skipped(), 1);
        assert_eq!(outcome.total(), 2);
    }

    #[test]
    fn given_repeats_within_input_when_partition_then_first_occurrence_wins() {
        let first = candidate("https://a.com/x").with_description("first");
        let second = candidate("https://a.com/x?again").with_description("second");

        let outcome = partition_candidates(vec![first, second], &[]);

        assert_eq!(outcome.to_import.len(), 1);
        assert_eq!(outcome.to_import[0].description.as_deref(), Some("first"));
        assert_eq!(outcome.duplicates.len(), 1);
    }

    #[test]
    fn given_non_web_urls_when_partition_then_counted_invalid() {
        let outcome = partition_candidates(
            vec![
                candidate("javascript:void(0)"),
                candidate("not a url"),
                candidate("ftp://files.example.com/a"),
                candidate("https://ok.example.com"),
            ],
            &[],
        );

        assert_eq!(outcome.invalid.len(), 3);
        assert_eq!(outcome.to_import.len(), 1);
        assert_eq!(outcome.skipped(), 3);
    }

    #[test]
    fn given_everything_already_imported_when_partition_again_then_nothing_to_import() {
        let urls = ["https://a.com/1", "https://a.com/2", "https://a.com/3"];
        let existing: Vec<StoredBookmark> = urls.iter().map(|u| existing(u)).collect();

        let outcome = partition_candidates(urls.iter().map(|u| candidate(u)).collect(), &existing);

        assert!(outcome.to_import.is_empty());
        assert_eq!(outcome.skipped(), urls.len());
    }

    #[test]
    fn given_unparseable_existing_subject_when_partition_then_ignored() {
        let outcome =
            partition_candidates(vec![candidate("https://a.com")], &[existing("garbage")]);
        assert_eq!(outcome.to_import.len(), 1);
    }
}
