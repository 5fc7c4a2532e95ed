use carelog::config::HistoryConfig;
use carelog::history::ConversationRepository;
use carelog::store::SledBlobStore;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_repository() -> (ConversationRepository<SledBlobStore>, TempDir) {
    create_temp_repository_with(HistoryConfig::default(), 1024 * 1024)
}

#[allow(dead_code)]
pub fn create_temp_repository_with(
    config: HistoryConfig,
    capacity_bytes: u64,
) -> (ConversationRepository<SledBlobStore>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = SledBlobStore::open_at(tmp.path().join("history"), capacity_bytes)
        .expect("failed to open sled store");
    (ConversationRepository::new(store, config), tmp)
}

#[allow(dead_code)]
pub fn temp_snapshot_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let path = temp_dir.path().join("snapshot.json");
    std::fs::write(&path, contents).expect("failed to write snapshot file");
    (temp_dir, path)
}
