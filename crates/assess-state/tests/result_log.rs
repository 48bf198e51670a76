//! Behavioural tests for the append-only result log.

use std::sync::Arc;

use assess_state::fakes::MemoryBlobStore;
use assess_state::{AssessmentResult, BlobStore, FsBlobStore, ResultSource, ResultStore, Score};
use chrono::Utc;

fn result(test_id: &str, score: f64) -> AssessmentResult {
    AssessmentResult {
        test_id: test_id.to_string(),
        test_name: format!("{test_id} test"),
        timestamp: Utc::now(),
        video_ref: format!("/videos/{test_id}-{score}.mp4"),
        score: Score::Number(score),
        unit: "reps".to_string(),
        attempts: vec![Score::Number(score)],
        confidence: 0.9,
        technique_notes: vec!["Consistent form".to_string()],
        source: ResultSource::Local,
    }
}

#[tokio::test]
async fn clear_then_read_all_is_empty() {
    let store = ResultStore::new(Arc::new(MemoryBlobStore::new()));
    store.append(&result("sit_ups", 30.0)).await.unwrap();
    store.clear().await.unwrap();
    assert!(store.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn appends_read_back_in_insertion_order() {
    let store = ResultStore::new(Arc::new(MemoryBlobStore::new()));
    let entries = [
        result("vertical_jump", 41.0),
        result("sit_ups", 33.0),
        result("flexibility", 12.0),
    ];
    for entry in &entries {
        store.append(entry).await.unwrap();
    }

    let read = store.read_all().await.unwrap();
    assert_eq!(read, entries.to_vec());
}

#[tokio::test]
async fn fs_backed_log_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(dir.path()).unwrap());
    let store = ResultStore::new(blobs.clone());

    store.append(&result("push_ups", 25.0)).await.unwrap();
    store.append(&result("push_ups", 27.0)).await.unwrap();

    // a second handle over the same directory sees the same log
    let other = ResultStore::new(Arc::new(FsBlobStore::new(dir.path()).unwrap()));
    let read = other.read_all().await.unwrap();
    assert_eq!(read.len(), 2);
    assert_eq!(read[1].numeric_score(), Some(27.0));
    assert!(dir.path().join("testResults.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_are_not_lost() {
    let store = ResultStore::new(Arc::new(MemoryBlobStore::new()));

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.append(&result("sit_ups", f64::from(i))).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.read_all().await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clear_never_interleaves_with_append() {
    let store = ResultStore::new(Arc::new(MemoryBlobStore::new()));

    let appender = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                store.append(&result("sit_ups", f64::from(i))).await.unwrap();
            }
        })
    };
    let clearer = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..5 {
                store.clear().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    appender.await.unwrap();
    clearer.await.unwrap();

    // whatever survived is a well-formed, ordered suffix of the appends
    let survivors = store.read_all().await.unwrap();
    let scores: Vec<f64> = survivors
        .iter()
        .filter_map(AssessmentResult::numeric_score)
        .collect();
    assert!(scores.windows(2).all(|w| w[1] == w[0] + 1.0));
    if let Some(last) = scores.last() {
        assert_eq!(*last, 9.0);
    }
}

#[tokio::test]
async fn rejected_write_leaves_log_intact() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = ResultStore::new(blobs.clone());
    store.append(&result("sit_ups", 30.0)).await.unwrap();

    blobs.set_reject_writes(true);
    assert!(store.append(&result("sit_ups", 31.0)).await.is_err());
    assert!(store.clear().await.is_err());

    let read = store.read_all().await.unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].numeric_score(), Some(30.0));
}
