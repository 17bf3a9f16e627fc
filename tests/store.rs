use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use tvplan_data::error::TvPlanError;
use tvplan_data::store::Store;

fn test_store(temp: &tempfile::TempDir) -> Store {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
    Store::new_with_root(root)
}

#[test]
fn read_missing_file_is_none() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let value: Option<serde_json::Value> = Store::read_json(&store.countries_path()).unwrap();
    assert!(value.is_none());
}

#[test]
fn corrupt_file_is_a_parse_error_not_empty() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    store.ensure_data_dir().unwrap();
    std::fs::write(store.channels_path().as_std_path(), b"{ not json").unwrap();

    let err = Store::read_json::<serde_json::Value>(&store.channels_path()).unwrap_err();
    assert_matches!(err, TvPlanError::CacheParse { .. });
}

#[test]
fn atomic_write_replaces_and_creates_parents() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    let path = store.stub_channel_path("101");

    Store::write_json_atomic(&path, &serde_json::json!({"version": 1})).unwrap();
    Store::write_json_atomic(&path, &serde_json::json!({"version": 2})).unwrap();

    let value: serde_json::Value = Store::read_json(&path).unwrap().unwrap();
    assert_eq!(value["version"], 2);
    // No temp file left behind after the rename.
    assert!(!path.with_extension("tmp").as_std_path().exists());
}
