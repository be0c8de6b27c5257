// src/domain/tag.rs
use std::collections::HashMap;

use itertools::Itertools;

use crate::domain::record::{StoredBookmark, StoredTag};

/// Trim a raw tag string; blank input yields `None`.
pub fn clean_tag<S: AsRef<str>>(raw: S) -> Option<String> {
    let value = raw.as_ref().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Case-insensitive key of a tag's equivalence class.
pub fn tag_key<S: AsRef<str>>(value: S) -> String {
    value.as_ref().to_lowercase()
}

/// Return the casing of an existing tag that matches `candidate` case-insensitively,
/// or the candidate unchanged when no such tag exists.
pub fn resolve_casing(candidate: &str, existing: &[StoredTag]) -> String {
    TagResolver::new(existing).canonical(candidate)
}

/// Outcome of resolving one tag string against the owner's tag records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    pub value: String,
    /// No record exists for this equivalence class yet
    pub is_new: bool,
}

/// Lookup table from case-insensitive key to canonical casing.
///
/// When the owner already has several casings of one tag, the earliest-created record wins.
#[derive(Debug, Clone, Default)]
pub struct TagResolver {
    canonical: HashMap<String, String>,
}

impl TagResolver {
    pub fn new(existing: &[StoredTag]) -> Self {
        let mut by_key: HashMap<String, &StoredTag> = HashMap::new();
        for tag in existing {
            by_key
                .entry(tag_key(&tag.value))
                .and_modify(|current| {
                    if tag.created_at < current.created_at {
                        *current = tag;
                    }
                })
                .or_insert(tag);
        }

        Self {
            canonical: by_key
                .into_iter()
                .map(|(key, tag)| (key, tag.value.clone()))
                .collect(),
        }
    }

    pub fn canonical(&self, candidate: &str) -> String {
        self.canonical
            .get(&tag_key(candidate))
            .cloned()
            .unwrap_or_else(|| candidate.to_string())
    }

    pub fn resolve(&self, candidate: &str) -> ResolvedTag {
        match self.canonical.get(&tag_key(candidate)) {
            Some(value) => ResolvedTag {
                value: value.clone(),
                is_new: false,
            },
            None => ResolvedTag {
                value: candidate.to_string(),
                is_new: true,
            },
        }
    }

    /// Make `value` the canonical casing of its class unless the class is already known.
    pub fn register(&mut self, value: &str) {
        self.canonical
            .entry(tag_key(value))
            .or_insert_with(|| value.to_string());
    }

    /// Resolve a list of raw tags, dropping blanks and case-insensitive repeats.
    /// First-seen order is preserved.
    pub fn canonicalize_all<I, S>(&self, raw: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw.into_iter()
            .filter_map(clean_tag)
            .unique_by(|tag| tag_key(tag))
            .map(|tag| self.canonical(&tag))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

/// One case-insensitive equivalence class with more than one tag record.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMergeGroup {
    pub canonical: StoredTag,
    /// Non-canonical members, to be deleted
    pub duplicates: Vec<StoredTag>,
    /// Number of bookmarks referencing a non-canonical casing of this class
    pub bookmarks_affected: usize,
}

/// New tag list for a bookmark that referenced a non-canonical casing.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkRewrite {
    pub bookmark: StoredBookmark,
    pub tags: Vec<String>,
    /// Indices into `TagMergePlan::groups` of the classes this rewrite folds
    pub groups: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMergePlan {
    pub groups: Vec<TagMergeGroup>,
    pub rewrites: Vec<BookmarkRewrite>,
}

impl TagMergePlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn tags_to_delete(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates.len()).sum()
    }
}

/// Partition the owner's tags into case-insensitive classes and plan the merge of every
/// class with more than one member.
///
/// The earliest-created member becomes canonical. Bookmarks referencing any other casing
/// get their tag list rewritten to the canonical casing, with repeats removed in
/// first-seen order.
pub fn merge_duplicates(tags: &[StoredTag], bookmarks: &[StoredBookmark]) -> TagMergePlan {
    let classes = tags.iter().into_group_map_by(|tag| tag_key(&tag.value));

    let mut groups: Vec<TagMergeGroup> = classes
        .into_values()
        .filter(|members| members.len() > 1)
        .map(|mut members| {
            members.sort_by_key(|tag| tag.created_at);
            let canonical = members.remove(0).clone();
            TagMergeGroup {
                canonical,
                duplicates: members.into_iter().cloned().collect(),
                bookmarks_affected: 0,
            }
        })
        .collect();
    groups.sort_by(|a, b| {
        a.canonical
            .created_at
            .cmp(&b.canonical.created_at)
            .then_with(|| a.canonical.value.cmp(&b.canonical.value))
    });

    if groups.is_empty() {
        return TagMergePlan::default();
    }

    let group_index: HashMap<String, usize> = groups
        .iter()
        .enumerate()
        .map(|(i, group)| (tag_key(&group.canonical.value), i))
        .collect();

    let mut rewrites = Vec::new();
    for bookmark in bookmarks {
        let mut touched: Vec<usize> = Vec::new();
        let rewritten: Vec<String> = bookmark
            .record
            .tags
            .iter()
            .map(|tag| match group_index.get(&tag_key(tag)) {
                Some(&i) if groups[i].canonical.value != *tag => {
                    if !touched.contains(&i) {
                        touched.push(i);
                    }
                    groups[i].canonical.value.clone()
                }
                _ => tag.clone(),
            })
            .unique()
            .collect();

        if touched.is_empty() {
            continue;
        }
        for &i in &touched {
            groups[i].bookmarks_affected += 1;
        }
        rewrites.push(BookmarkRewrite {
            bookmark: bookmark.clone(),
            tags: rewritten,
            groups: touched,
        });
    }

    TagMergePlan { groups, rewrites }
}
