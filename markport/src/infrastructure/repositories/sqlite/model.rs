// src/infrastructure/repositories/sqlite/model.rs
use chrono::NaiveDateTime;
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use std::fmt;

use crate::infrastructure::repositories::sqlite::schema::{import_chunks, import_jobs};

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = import_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbImportJob {
    pub id: String,
    pub owner: String,
    pub format: String,
    pub total: i32,
    pub skipped: i32,
    pub imported: i32,
    pub failed: i32,
    pub total_chunks: i32,
    pub processed_chunks: i32,
    pub tags_json: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl fmt::Display for DbImportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}, owner: {}, format: {}, total: {}, skipped: {}, imported: {}, failed: {}, chunks: {}/{}, status: {}",
            self.id,
            self.owner,
            self.format,
            self.total,
            self.skipped,
            self.imported,
            self.failed,
            self.processed_chunks,
            self.total_chunks,
            self.status
        )
    }
}

/// Counter update applied when a chunk completes
#[derive(AsChangeset, Debug)]
#[diesel(table_name = import_jobs)]
pub struct DbImportJobProgress {
    pub imported: i32,
    pub failed: i32,
    pub processed_chunks: i32,
    pub status: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Clone)]
#[diesel(table_name = import_chunks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbImportChunk {
    pub id: String,
    pub job_id: String,
    pub chunk_index: i32,
    pub bookmarks_json: String,
    pub status: String,
    pub claimed_at: Option<NaiveDateTime>,
}

impl fmt::Debug for DbImportChunk {
    // payload can be large; only its size is shown
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbImportChunk")
            .field("id", &self.id)
            .field("job_id", &self.job_id)
            .field("chunk_index", &self.chunk_index)
            .field("bookmarks_json_len", &self.bookmarks_json.len())
            .field("status", &self.status)
            .field("claimed_at", &self.claimed_at)
            .finish()
    }
}
