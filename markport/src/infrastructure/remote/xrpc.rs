// src/infrastructure/remote/xrpc.rs
//! Record repository reached over XRPC (`com.atproto.repo.*`).
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::RemoteSettings;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::owner::Owner;
use crate::domain::record::{
    BookmarkRecord, StoredBookmark, StoredTag, WriteOperation, WriteOutcome,
};
use crate::domain::repositories::remote_repository::{RepositoryReader, RepositoryWriter};

const LIST_RECORDS: &str = "com.atproto.repo.listRecords";
const APPLY_WRITES: &str = "com.atproto.repo.applyWrites";
const CREATE_RECORD: &str = "com.atproto.repo.createRecord";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ListRecordsResponse {
    #[serde(default)]
    cursor: Option<String>,
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    uri: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct ApplyWritesResponse {
    #[serde(default)]
    results: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagValue {
    value: String,
    created_at: DateTime<Utc>,
}

/// Bookmark body as read back. Only `subject` is required; dedup needs nothing else.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedBookmark {
    subject: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<ListedBookmark> for BookmarkRecord {
    fn from(listed: ListedBookmark) -> Self {
        Self {
            subject: listed.subject,
            title: listed.title.unwrap_or_default(),
            description: listed.description,
            tags: listed.tags.unwrap_or_default(),
            created_at: listed.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// Record body with its lexicon type.
#[derive(Debug, Serialize)]
struct Typed<'a, T> {
    #[serde(rename = "$type")]
    kind: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Debug, Serialize)]
#[serde(tag = "$type")]
enum ApplyWrite<'a> {
    #[serde(rename = "com.atproto.repo.applyWrites#create")]
    Create {
        collection: &'a str,
        value: Typed<'a, BookmarkRecord>,
    },
    #[serde(rename = "com.atproto.repo.applyWrites#update")]
    Update {
        collection: &'a str,
        rkey: &'a str,
        value: Typed<'a, BookmarkRecord>,
    },
    #[serde(rename = "com.atproto.repo.applyWrites#delete")]
    Delete { collection: &'a str, rkey: &'a str },
}

/// Last path segment of `at://<repo>/<collection>/<rkey>`.
fn rkey_of(uri: &str) -> DomainResult<String> {
    uri.rsplit('/')
        .next()
        .filter(|rkey| !rkey.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DomainError::RemoteError(format!("Malformed record URI: {}", uri)))
}

#[derive(Debug, Clone)]
pub struct XrpcRepository {
    client: Client,
    settings: RemoteSettings,
}

impl XrpcRepository {
    pub fn new(settings: RemoteSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, settings }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/xrpc/{}",
            self.settings.service_url.trim_end_matches('/'),
            method
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.settings.access_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send<T: DeserializeOwned>(&self, method: &str, request: RequestBuilder) -> DomainResult<T> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| DomainError::RemoteError(format!("{} request failed: {}", method, e)))?;
        Self::decode(method, response)
    }

    fn decode<T: DeserializeOwned>(method: &str, response: Response) -> DomainResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<XrpcErrorBody>(&body)
                .ok()
                .and_then(|e| match (e.error, e.message) {
                    (Some(error), Some(message)) => Some(format!("{}: {}", error, message)),
                    (Some(error), None) => Some(error),
                    (None, message) => message,
                })
                .unwrap_or(body);
            return Err(DomainError::RemoteError(format!(
                "{} returned {}: {}",
                method, status, detail
            )));
        }

        response.json().map_err(|e| {
            DomainError::RemoteError(format!("Failed to parse {} response: {}", method, e))
        })
    }

    /// Fetch every record of a collection, following the cursor.
    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn list_records(&self, owner: &Owner, collection: &str) -> DomainResult<Vec<RecordEntry>> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let limit = PAGE_SIZE.to_string();

        loop {
            let mut query = vec![
                ("repo", owner.as_str()),
                ("collection", collection),
                ("limit", limit.as_str()),
            ];
            if let Some(c) = cursor.as_deref() {
                query.push(("cursor", c));
            }

            let page: ListRecordsResponse = self.send(
                LIST_RECORDS,
                self.client.get(self.endpoint(LIST_RECORDS)).query(&query),
            )?;
            let fetched = page.records.len();
            records.extend(page.records);

            match page.cursor {
                Some(next) if fetched > 0 => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Listed {} record(s) of {}", records.len(), collection);
        Ok(records)
    }

    fn to_write<'a>(&'a self, op: &'a WriteOperation) -> ApplyWrite<'a> {
        let bookmarks = self.settings.bookmark_collection.as_str();
        match op {
            WriteOperation::CreateBookmark(record) => ApplyWrite::Create {
                collection: bookmarks,
                value: Typed {
                    kind: bookmarks,
                    body: record,
                },
            },
            WriteOperation::UpdateBookmark { rkey, record } => ApplyWrite::Update {
                collection: bookmarks,
                rkey,
                value: Typed {
                    kind: bookmarks,
                    body: record,
                },
            },
            WriteOperation::DeleteTag { rkey } => ApplyWrite::Delete {
                collection: &self.settings.tag_collection,
                rkey,
            },
        }
    }
}

impl RepositoryReader for XrpcRepository {
    fn list_bookmarks(&self, owner: &Owner) -> DomainResult<Vec<StoredBookmark>> {
        let entries = self.list_records(owner, &self.settings.bookmark_collection)?;
        let mut bookmarks = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<ListedBookmark>(entry.value) {
                Ok(listed) if !listed.subject.trim().is_empty() => {
                    bookmarks.push(StoredBookmark {
                        rkey: rkey_of(&entry.uri)?,
                        record: listed.into(),
                    })
                }
                Ok(_) => warn!("Skipping bookmark record {} without subject", entry.uri),
                Err(e) => warn!("Skipping unreadable bookmark record {}: {}", entry.uri, e),
            }
        }
        Ok(bookmarks)
    }

    fn list_tags(&self, owner: &Owner) -> DomainResult<Vec<StoredTag>> {
        let entries = self.list_records(owner, &self.settings.tag_collection)?;
        let mut tags = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<TagValue>(entry.value) {
                Ok(tag) => tags.push(StoredTag {
                    rkey: rkey_of(&entry.uri)?,
                    value: tag.value,
                    created_at: tag.created_at,
                }),
                Err(e) => warn!("Skipping unreadable tag record {}: {}", entry.uri, e),
            }
        }
        Ok(tags)
    }
}

impl RepositoryWriter for XrpcRepository {
    #[instrument(skip_all, level = "debug", fields(owner = %owner, ops = operations.len()))]
    fn write_batch(
        &self,
        owner: &Owner,
        operations: &[WriteOperation],
    ) -> DomainResult<Vec<WriteOutcome>> {
        let writes: Vec<ApplyWrite> = operations.iter().map(|op| self.to_write(op)).collect();
        let body = serde_json::json!({
            "repo": owner.as_str(),
            "writes": writes,
        });

        let response: ApplyWritesResponse = self.send(
            APPLY_WRITES,
            self.client.post(self.endpoint(APPLY_WRITES)).json(&body),
        )?;

        // applyWrites is atomic: every operation the server reports on was written
        let written = response
            .results
            .map(|r| r.len().min(operations.len()))
            .unwrap_or(operations.len());
        let mut outcomes = vec![WriteOutcome::Written; written];
        outcomes.resize(
            operations.len(),
            WriteOutcome::Rejected("missing from applyWrites results".to_string()),
        );
        Ok(outcomes)
    }

    #[instrument(skip(self), level = "debug", fields(owner = %owner))]
    fn create_tag(&self, owner: &Owner, value: &str) -> DomainResult<StoredTag> {
        let tag = TagValue {
            value: value.to_string(),
            created_at: Utc::now(),
        };
        let record = Typed {
            kind: &self.settings.tag_collection,
            body: &tag,
        };
        let body = serde_json::json!({
            "repo": owner.as_str(),
            "collection": self.settings.tag_collection,
            "record": record,
        });

        let created: CreateRecordResponse = self.send(
            CREATE_RECORD,
            self.client.post(self.endpoint(CREATE_RECORD)).json(&body),
        )?;

        Ok(StoredTag {
            rkey: rkey_of(&created.uri)?,
            value: tag.value,
            created_at: tag.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::CandidateBookmark;
    use crate::domain::dedup::partition_candidates;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(server: &MockServer) -> RemoteSettings {
        RemoteSettings {
            service_url: server.base_url(),
            access_token: Some("secret".to_string()),
            ..RemoteSettings::default()
        }
    }

    fn owner() -> Owner {
        Owner::new("did:plc:alice").unwrap()
    }

    #[test]
    fn given_paged_listing_when_list_bookmarks_then_follows_cursor() {
        let server = MockServer::start();
        // registered first so the cursor request matches it before the open one
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/xrpc/com.atproto.repo.listRecords")
                .query_param("cursor", "page2");
            then.status(200).json_body(json!({
                "records": [
                    {
                        "uri": "at://did:plc:alice/app.markport.bookmark/3k2",
                        "cid": "bafy2",
                        "value": {
                            "subject": "https://b.com",
                            "title": "B",
                            "createdAt": "2024-01-02T00:00:00Z"
                        }
                    },
                    {
                        "uri": "at://did:plc:alice/app.markport.bookmark/3k3",
                        "cid": "bafy3",
                        "value": { "unexpected": true }
                    }
                ]
            }));
        });

        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/xrpc/com.atproto.repo.listRecords")
                .query_param("repo", "did:plc:alice")
                .query_param("collection", "app.markport.bookmark")
                .header("authorization", "Bearer secret");
            then.status(200).json_body(json!({
                "cursor": "page2",
                "records": [{
                    "uri": "at://did:plc:alice/app.markport.bookmark/3k1",
                    "cid": "bafy1",
                    "value": {
                        "$type": "app.markport.bookmark",
                        "subject": "https://a.com",
                        "title": "A",
                        "tags": ["Rust"],
                        "createdAt": "2024-01-01T00:00:00Z"
                    }
                }]
            }));
        });
        let repo = XrpcRepository::new(settings(&server));
        let bookmarks = repo.list_bookmarks(&owner()).unwrap();

        first.assert();
        second.assert();
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(bookmarks[0].rkey, "3k1");
        assert_eq!(bookmarks[0].record.tags, vec!["Rust".to_string()]);
        assert_eq!(bookmarks[1].record.subject, "https://b.com");
    }

    #[test]
    fn given_record_without_title_when_partition_then_still_duplicate() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/xrpc/com.atproto.repo.listRecords")
                .query_param("collection", "app.markport.bookmark");
            then.status(200).json_body(json!({
                "records": [
                    {
                        "uri": "at://did:plc:alice/app.markport.bookmark/3k1",
                        "cid": "bafy1",
                        "value": { "subject": "https://a.com/x", "createdAt": "2024-01-01T00:00:00Z" }
                    },
                    {
                        "uri": "at://did:plc:alice/app.markport.bookmark/3k2",
                        "cid": "bafy2",
                        "value": { "subject": "https://b.com/y" }
                    },
                    {
                        "uri": "at://did:plc:alice/app.markport.bookmark/3k3",
                        "cid": "bafy3",
                        "value": { "subject": "  ", "title": "blank" }
                    }
                ]
            }));
        });

        let existing = XrpcRepository::new(settings(&server))
            .list_bookmarks(&owner())
            .unwrap();
        let outcome = partition_candidates(
            vec![
                CandidateBookmark::new("https://a.com/x?ref=feed", "X", Utc::now()),
                CandidateBookmark::new("https://b.com/y", "Y", Utc::now()),
            ],
            &existing,
        );

        assert_eq!(existing.len(), 2);
        assert_eq!(existing[0].record.title, "");
        assert_eq!(existing[1].record.created_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(outcome.to_import.is_empty());
        assert_eq!(outcome.duplicates.len(), 2);
    }

    #[test]
    fn given_tag_records_when_list_tags_then_parses_value_and_time() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/xrpc/com.atproto.repo.listRecords")
                .query_param("collection", "app.markport.tag");
            then.status(200).json_body(json!({
                "records": [{
                    "uri": "at://did:plc:alice/app.markport.tag/t1",
                    "cid": "bafy",
                    "value": { "value": "Swift", "createdAt": "2024-01-01T00:00:00Z" }
                }]
            }));
        });

        let tags = XrpcRepository::new(settings(&server))
            .list_tags(&owner())
            .unwrap();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].rkey, "t1");
        assert_eq!(tags[0].value, "Swift");
    }

    #[test]
    fn given_batch_when_write_then_posts_apply_writes() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/xrpc/com.atproto.repo.applyWrites")
                .header("authorization", "Bearer secret")
                .json_body_partial(
                    r#"{
                        "repo": "did:plc:alice",
                        "writes": [
                            {
                                "$type": "com.atproto.repo.applyWrites#create",
                                "collection": "app.markport.bookmark",
                                "value": { "$type": "app.markport.bookmark", "subject": "https://a.com" }
                            },
                            {
                                "$type": "com.atproto.repo.applyWrites#delete",
                                "collection": "app.markport.tag",
                                "rkey": "t2"
                            }
                        ]
                    }"#,
                );
            then.status(200).json_body(json!({
                "results": [
                    { "$type": "com.atproto.repo.applyWrites#createResult", "uri": "at://x/y/z", "cid": "c" },
                    { "$type": "com.atproto.repo.applyWrites#deleteResult" }
                ]
            }));
        });

        let record = BookmarkRecord {
            subject: "https://a.com".to_string(),
            title: "A".to_string(),
            description: None,
            tags: vec![],
            created_at: Utc::now(),
        };
        let outcomes = XrpcRepository::new(settings(&server))
            .write_batch(
                &owner(),
                &[
                    WriteOperation::CreateBookmark(record),
                    WriteOperation::DeleteTag {
                        rkey: "t2".to_string(),
                    },
                ],
            )
            .unwrap();

        mock.assert();
        assert_eq!(outcomes, vec![WriteOutcome::Written, WriteOutcome::Written]);
    }

    #[test]
    fn given_server_error_when_write_batch_then_whole_batch_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/xrpc/com.atproto.repo.applyWrites");
            then.status(400)
                .json_body(json!({ "error": "InvalidRequest", "message": "bad record" }));
        });

        let err = XrpcRepository::new(settings(&server))
            .write_batch(&owner(), &[WriteOperation::DeleteTag { rkey: "t".into() }])
            .unwrap_err();

        match err {
            DomainError::RemoteError(msg) => assert!(msg.contains("InvalidRequest: bad record")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn given_new_tag_when_create_then_returns_rkey_from_uri() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/xrpc/com.atproto.repo.createRecord")
                .json_body_partial(
                    r#"{ "collection": "app.markport.tag", "record": { "value": "Swift" } }"#,
                );
            then.status(200)
                .json_body(json!({ "uri": "at://did:plc:alice/app.markport.tag/3kt", "cid": "c" }));
        });

        let tag = XrpcRepository::new(settings(&server))
            .create_tag(&owner(), "Swift")
            .unwrap();

        mock.assert();
        assert_eq!(tag.rkey, "3kt");
        assert_eq!(tag.value, "Swift");
    }

    #[test]
    fn given_malformed_uri_when_rkey_of_then_error() {
        assert_eq!(rkey_of("at://did/coll/abc").unwrap(), "abc");
        assert!(rkey_of("at://did/coll/").is_err());
    }
}
