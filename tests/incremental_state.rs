use notion_vault::backup::{compute_hash, BackupState};
use std::collections::BTreeMap;
use tempfile::tempdir;

#[test]
fn state_file_schema_on_disk() {
    let dir = tempdir().unwrap();
    let mut state = BackupState::open(dir.path()).unwrap();
    state.update_page(
        "11111111222233334444555555555555",
        "2025-03-01T09:00:00.000Z",
        "# body\n",
        BTreeMap::new(),
    );
    state.save().unwrap();

    let raw = std::fs::read_to_string(dir.path().join("checksums.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["version"], 1);
    assert!(!json["saved_at"].as_str().unwrap().is_empty());
    let page = &json["pages"]["11111111222233334444555555555555"];
    assert_eq!(page["last_edited_time"], "2025-03-01T09:00:00.000Z");
    assert_eq!(page["content_hash"], compute_hash("# body\n"));
    assert!(!page["backed_up_at"].as_str().unwrap().is_empty());
}

#[test]
fn full_incremental_cycle_across_runs() {
    let dir = tempdir().unwrap();

    // First run exports everything.
    {
        let mut state = BackupState::open(dir.path()).unwrap();
        assert!(state.needs_backup("page-a", "t1", None));
        state.update_page("page-a", "t1", "content a", BTreeMap::new());
        state.update_database("db-1", "t1", "schema");
        state.save().unwrap();
    }

    // Second run sees the unchanged page and skips it.
    {
        let mut state = BackupState::open(dir.path()).unwrap();
        assert!(!state.needs_backup("page-a", "t1", Some("content a")));
        assert!(state.needs_backup("page-a", "t2", None));
        assert!(state.needs_backup("page-b", "t1", None));

        state.update_page("page-a", "t2", "content a v2", BTreeMap::new());
        state.save().unwrap();
    }

    // Third run sees the second run's update.
    let state = BackupState::open(dir.path()).unwrap();
    assert!(!state.needs_backup("page-a", "t2", Some("content a v2")));
    assert_eq!(state.page_count(), 1);
    assert_eq!(state.database_count(), 1);
}

#[test]
fn last_backup_time_spans_pages_and_databases() {
    let dir = tempdir().unwrap();
    let mut state = BackupState::open(dir.path()).unwrap();
    assert_eq!(state.last_backup_time(), None);

    state.update_page("page-a", "t1", "a", BTreeMap::new());
    state.update_database("db-1", "t1", "schema");

    let latest = state.last_backup_time().unwrap();
    let page_time = state.get_page_state("page-a").unwrap().backed_up_at.clone();
    let db_time = state
        .get_database_state("db-1")
        .unwrap()
        .backed_up_at
        .clone();
    assert_eq!(latest, page_time.max(db_time));
}

#[test]
fn attachment_hashes_round_trip() {
    let dir = tempdir().unwrap();
    let mut hashes = BTreeMap::new();
    hashes.insert(
        "attachments/abcdef01_photo.jpg".to_string(),
        compute_hash("jpeg bytes"),
    );

    {
        let mut state = BackupState::open(dir.path()).unwrap();
        state.update_page("page-a", "t1", "body", hashes.clone());
        state.save().unwrap();
    }

    let state = BackupState::open(dir.path()).unwrap();
    let page = state.get_page_state("page-a").unwrap();
    assert_eq!(page.attachment_hashes, hashes);
}
