use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use markport::application::services::import_service::ImportService;
use markport::application::ImportServiceImpl;
use markport::config::ImportSettings;
use markport::domain::candidate::CandidateBookmark;
use markport::domain::owner::Owner;
use markport::domain::repositories::remote_repository::RepositoryReader;
use markport::infrastructure::remote::InMemoryRepository;
use markport::util::testing::{candidates, setup_test_job_store, TestDb};

fn owner() -> Owner {
    Owner::new("did:plc:alice").unwrap()
}

fn service(db: &TestDb, remote: &Arc<InMemoryRepository>) -> ImportServiceImpl {
    ImportServiceImpl::new(
        Arc::new(setup_test_job_store(db)),
        remote.clone(),
        &ImportSettings::default(),
    )
}

#[test]
fn given_two_clients_when_driving_same_job_then_every_bookmark_written_once() {
    let db = TestDb::new();
    let remote = Arc::new(InMemoryRepository::new());
    let prepared = service(&db, &remote)
        .prepare_import(&owner(), "json", candidates(950), &[])
        .unwrap();
    let job_id = prepared.job_id.unwrap();

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let service = service(&db, &remote);
            let job_id = job_id.clone();
            thread::spawn(move || loop {
                let response = service.process_chunk(&owner(), &job_id).unwrap();
                if response.done {
                    return;
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let status = service(&db, &remote).job_status(&owner(), &job_id).unwrap();
    assert!(status.done);
    assert_eq!(status.total_imported, 950);
    assert_eq!(status.total_failed, 0);
    assert_eq!(remote.list_bookmarks(&owner()).unwrap().len(), 950);
}

#[test]
fn given_completed_import_when_same_file_imported_again_then_everything_skipped() {
    let db = TestDb::new();
    let remote = Arc::new(InMemoryRepository::new());
    let first = service(&db, &remote);
    let job_id = first
        .prepare_import(&owner(), "json", candidates(12), &[])
        .unwrap()
        .job_id
        .unwrap();
    while !first.process_chunk(&owner(), &job_id).unwrap().done {}

    // same pages with tracking query and fragment
    let variants: Vec<CandidateBookmark> = candidates(12)
        .into_iter()
        .map(|mut c| {
            c.url = format!("{}?utm_source=feed#top", c.url);
            c
        })
        .collect();
    let second = service(&db, &remote)
        .prepare_import(&owner(), "json", variants, &[])
        .unwrap();

    assert_eq!(second.skipped, 12);
    assert_eq!(second.to_import, 0);
    assert!(second.job_id.is_none());
    assert_eq!(second.result.unwrap().imported, 0);
}

#[test]
fn given_abandoned_job_when_sweep_after_max_age_then_job_gone() {
    let db = TestDb::new();
    let remote = Arc::new(InMemoryRepository::new());
    let service = service(&db, &remote);
    let job_id = service
        .prepare_import(&owner(), "json", candidates(30), &[])
        .unwrap()
        .job_id
        .unwrap();
    service.process_chunk(&owner(), &job_id).unwrap();

    let deleted = service
        .sweep_stale_jobs(Utc::now() + Duration::hours(25))
        .unwrap();

    assert_eq!(deleted, 1);
    assert!(service.job_status(&owner(), &job_id).is_err());
}
