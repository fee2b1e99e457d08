mod common;

use common::{load, song, LogCapture};
use nowplaying::{AppendStore, CodecRegistry, StoreError};
use shared::{Dataset, Field, Record};

fn store() -> AppendStore {
    AppendStore::new(CodecRegistry::standard().unwrap())
}

fn titles(dataset: &Dataset) -> Vec<String> {
    dataset
        .rows()
        .iter()
        .map(|r| r.field(Field::Title).unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn repeated_flush_keeps_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    let store = store();

    let batch = || Dataset::snapshot(vec![song("X", "Y", "Z")]);
    store.flush(batch(), &path).await.unwrap();
    let report = store.flush(batch(), &path).await.unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(load(&path).len(), 1);
}

#[tokio::test]
async fn persisted_payload_wins_over_new_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.json");
    let store = store();

    let first = song("X", "Y", "Z").with("timestamp", "t1");
    let second = song("X", "Y", "Z").with("timestamp", "t2");
    store.flush(Dataset::snapshot(vec![first]), &path).await.unwrap();
    store.flush(Dataset::snapshot(vec![second]), &path).await.unwrap();

    let stored = load(&path);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.rows()[0].field(Field::Timestamp), Some("t1"));
}

#[tokio::test]
async fn new_records_keep_poll_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.sqlite");
    let store = store();

    store
        .flush(Dataset::snapshot(vec![song("a", "first", "n")]), &path)
        .await
        .unwrap();
    let batch = ["c", "b", "d", "a"]
        .iter()
        .map(|t| song("x", t, "n"))
        .collect();
    store.flush(Dataset::snapshot(batch), &path).await.unwrap();

    assert_eq!(titles(&load(&path)), ["first", "c", "b", "d", "a"]);
}

#[tokio::test]
async fn unsupported_extension_writes_csv_beside_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.xyz");
    let logs = LogCapture::default();
    let _guard = logs.install();

    let report = store()
        .flush(Dataset::snapshot(vec![song("X", "Y", "Z")]), &path)
        .await
        .unwrap();

    let csv = dir.path().join("log.csv");
    assert!(report.substituted);
    assert_eq!(report.path, csv);
    assert!(!path.exists());
    let output = logs.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("Unsupported file extension"), "{output}");

    let mut reader = csv::Reader::from_path(&csv).unwrap();
    assert_eq!(reader.records().count(), 1);
}

#[tokio::test]
async fn schema_mismatch_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.csv");
    std::fs::write(&path, "timestamp,title,artist,name,artwork\nt,T,A,N,w\n").unwrap();
    let before = std::fs::read(&path).unwrap();

    let wide: Record = [
        ("timestamp", "t2"),
        ("title", "T2"),
        ("artist", "A2"),
        ("name", "N2"),
        ("artwork", "w2"),
        ("isexplicit", "false"),
        ("videourl", "v"),
    ]
    .into_iter()
    .collect();
    let err = store()
        .flush(Dataset::from_records(vec![wide]), &path)
        .await
        .unwrap_err();

    match err {
        StoreError::SchemaMismatch {
            path: reported,
            existing,
            incoming,
        } => {
            assert_eq!(reported, path);
            assert_eq!(existing.len(), 5);
            assert_eq!(incoming.len(), 7);
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[tokio::test]
async fn every_format_merges_the_same_way() {
    let dir = tempfile::tempdir().unwrap();
    let store = store();

    for ext in ["csv", "json", "sql", "db", "parquet", "feather", "arrow", "xlsx"] {
        let path = dir.path().join(format!("log.{ext}"));
        store
            .flush(
                Dataset::snapshot(vec![song("a", "1", "n"), song("a", "2", "n")]),
                &path,
            )
            .await
            .unwrap();
        let report = store
            .flush(
                Dataset::snapshot(vec![song("a", "2", "n"), song("a", "3", "n")]),
                &path,
            )
            .await
            .unwrap();

        assert!(!report.substituted, "{ext}");
        assert_eq!(report.written, 3, "{ext}");
        assert_eq!(titles(&load(&path)), ["1", "2", "3"], "{ext}");
    }
}
