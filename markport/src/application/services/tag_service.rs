// src/application/services/tag_service.rs
use serde::Serialize;

use crate::application::error::ApplicationResult;
use crate::domain::owner::Owner;

/// One merged equivalence class.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDetail {
    pub canonical: String,
    /// Casings folded into `canonical`
    pub merged: Vec<String>,
    pub bookmarks_updated: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// Number of equivalence classes merged
    pub merged: usize,
    pub tags_deleted: usize,
    pub bookmarks_updated: usize,
    pub details: Vec<MergeDetail>,
}

/// Service interface for tag maintenance
pub trait TagService: Send + Sync {
    /// Fold every case-variant tag of the owner into its earliest-created casing.
    fn merge_duplicate_tags(&self, owner: &Owner) -> ApplicationResult<MergeReport>;
}
