#![forbid(unsafe_code)]

use desko_core::{DeltaKind, RowDelta};
use desko_store::spawn_ingest;

fn sale(id: i64, reference: &str, stage: &str) -> RowDelta {
    RowDelta {
        id,
        kind: DeltaKind::Applied,
        raw: serde_json::json!({
            "id": id,
            "reference": reference,
            "stage": stage,
            "status": "pending",
            "created_at": "2024-02-01T08:00:00Z",
        }),
    }
}

fn gone(id: i64) -> RowDelta {
    RowDelta {
        id,
        kind: DeltaKind::Deleted,
        raw: serde_json::Value::Null,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ingest_applies_and_swaps_snapshots() {
    let (tx, backend) = spawn_ingest("sales", 128);
    tx.send(sale(1, "S-1001", "new")).await.unwrap();
    tx.send(sale(2, "S-1002", "new")).await.unwrap();
    // Allow a coalescing tick to flush
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    let snap = backend.current();
    assert_eq!(snap.items.len(), 2);
    assert_eq!(snap.items[0].name, "S-1001");
    let first_epoch = snap.epoch;
    assert!(first_epoch >= 1);

    tx.send(sale(1, "S-1001", "negotiation")).await.unwrap();
    tx.send(gone(2)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    let snap = backend.current();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].raw["stage"], "negotiation");
    assert!(snap.epoch > first_epoch);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn epoch_watchers_see_swaps() {
    let (tx, backend) = spawn_ingest("sales", 128);
    let mut epoch_rx = backend.subscribe_epoch();
    assert_eq!(*epoch_rx.borrow(), 0);

    tx.send(sale(7, "S-2001", "new")).await.unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(2), epoch_rx.changed())
        .await
        .expect("epoch change within deadline")
        .expect("epoch channel alive");
    assert!(*epoch_rx.borrow() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closing_the_channel_flushes_pending_deltas() {
    let (tx, backend) = spawn_ingest("sales", 128);
    tx.send(sale(1, "S-3001", "new")).await.unwrap();
    drop(tx);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let snap = backend.current();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].name, "S-3001");
}
