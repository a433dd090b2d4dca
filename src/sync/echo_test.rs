use serde_json::json;

use super::*;
use crate::document::DocumentId;

fn change_from(writer: Option<&str>) -> RemoteChange {
    RemoteChange {
        document_id: DocumentId::new(),
        payload: Some(json!({"version": "1", "objects": []})),
        last_writer_id: writer.map(ClientId::new),
        updated_at: 10,
    }
}

#[test]
fn drops_own_writes() {
    let filter = EchoFilter::new(ClientId::new("me"));
    assert!(!filter.should_apply(&change_from(Some("me"))));
}

#[test]
fn applies_other_writers() {
    let filter = EchoFilter::new(ClientId::new("me"));
    assert!(filter.should_apply(&change_from(Some("someone-else"))));
}

#[test]
fn applies_untagged_changes() {
    let filter = EchoFilter::new(ClientId::new("me"));
    assert!(filter.should_apply(&change_from(None)));
}

#[test]
fn ignores_payload_contents() {
    let filter = EchoFilter::new(ClientId::new("me"));
    let mut change = change_from(Some("me"));
    change.payload = None;
    assert!(!filter.should_apply(&change));
}
