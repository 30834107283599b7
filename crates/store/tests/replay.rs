#![forbid(unsafe_code)]

use desko_core::{DeltaKind, RowDelta};
use desko_store::{Coalescer, SnapshotBuilder};

fn lead(id: i64, name: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "email": format!("{}@acme.io", name.to_lowercase()),
        "status": status,
        "created_at": "2024-01-01T00:00:00Z",
    })
}

fn applied(id: i64, raw: serde_json::Value) -> RowDelta {
    RowDelta {
        id,
        kind: DeltaKind::Applied,
        raw,
    }
}

fn deleted(id: i64) -> RowDelta {
    RowDelta {
        id,
        kind: DeltaKind::Deleted,
        raw: serde_json::Value::Null,
    }
}

#[test]
fn replay_basic_sequence() {
    let mut sb = SnapshotBuilder::new("leads");

    let deltas = vec![
        applied(1, lead(1, "Ana", "Active")),
        // duplicate add coalesces at the queue normally; the builder just replaces
        applied(1, lead(1, "Ana", "Active")),
        applied(2, lead(2, "Bo", "Active")),
        // update 1 in place
        applied(1, lead(1, "Ana Q", "inactive")),
        deleted(2),
    ];

    sb.apply(deltas[..2].to_vec());
    let snap1 = sb.freeze();
    assert_eq!(snap1.epoch, 1);
    assert_eq!(snap1.items.len(), 1);
    assert_eq!(snap1.items[0].name, "Ana");

    sb.apply(deltas[2..].to_vec());
    let snap2 = sb.freeze();
    assert_eq!(snap2.epoch, 2);
    assert_eq!(snap2.items.len(), 1);
    assert_eq!(snap2.items[0].name, "Ana Q");
    assert_eq!(snap2.items[0].status.as_deref(), Some("inactive"));
}

#[test]
fn updates_keep_first_seen_position() {
    let mut sb = SnapshotBuilder::new("leads");
    sb.apply(vec![
        applied(1, lead(1, "Ana", "Active")),
        applied(2, lead(2, "Bo", "Active")),
        applied(3, lead(3, "Cy", "Active")),
    ]);
    sb.apply(vec![applied(1, lead(1, "Ana Q", "Active"))]);
    let snap = sb.freeze();
    let names: Vec<_> = snap.items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Ana Q", "Bo", "Cy"]);
}

#[test]
fn delete_reindexes_later_rows() {
    let mut sb = SnapshotBuilder::new("leads");
    sb.apply(vec![
        applied(1, lead(1, "Ana", "Active")),
        applied(2, lead(2, "Bo", "Active")),
        applied(3, lead(3, "Cy", "Active")),
    ]);
    sb.apply(vec![deleted(1)]);
    // Cy must still be reachable by id after the shift
    sb.apply(vec![applied(3, lead(3, "Cy Q", "Active"))]);
    let snap = sb.freeze();
    let names: Vec<_> = snap.items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Bo", "Cy Q"]);
    assert_eq!(snap.items.len(), 2);
}

#[test]
fn records_without_id_are_skipped() {
    let mut sb = SnapshotBuilder::new("leads");
    sb.apply(vec![
        applied(0, serde_json::json!({"name": "no id field"})),
        applied(1, lead(1, "Ana", "Active")),
    ]);
    let snap = sb.freeze();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].id, 1);
}

#[test]
fn coalescer_newest_delta_wins() {
    let mut c = Coalescer::with_capacity(16);
    c.push(applied(1, lead(1, "Ana", "Active")));
    c.push(applied(2, lead(2, "Bo", "Active")));
    c.push(applied(1, lead(1, "Ana Q", "Active")));
    assert_eq!(c.len(), 2);
    let batch = c.drain_ready();
    assert_eq!(batch.len(), 2);
    // FIFO by first arrival, payload from the last push
    assert_eq!(batch[0].id, 1);
    assert_eq!(batch[0].raw["name"], "Ana Q");
    assert_eq!(batch[1].id, 2);
    assert!(c.is_empty());
}

#[test]
fn coalescer_drops_oldest_when_full() {
    let mut c = Coalescer::with_capacity(2);
    c.push(applied(1, lead(1, "Ana", "Active")));
    c.push(applied(2, lead(2, "Bo", "Active")));
    c.push(applied(3, lead(3, "Cy", "Active")));
    assert_eq!(c.len(), 2);
    assert_eq!(c.dropped(), 1);
    let ids: Vec<_> = c.drain_ready().iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![2, 3]);
}
