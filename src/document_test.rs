use super::*;

#[test]
fn document_id_parses_its_display_form() {
    let id = DocumentId::new();
    assert_eq!(id.to_string().parse::<DocumentId>().unwrap(), id);
}

#[test]
fn document_id_rejects_garbage() {
    assert!("not-a-uuid".parse::<DocumentId>().is_err());
}

#[test]
fn summary_drops_payload_only() {
    let doc = Document {
        id: DocumentId::new(),
        title: Some("Board".into()),
        payload: Some(serde_json::json!({"objects": []})),
        updated_at: 42,
        last_writer_id: Some(ClientId::new("a")),
    };
    let summary = DocumentSummary::from(&doc);
    assert_eq!(summary.id, doc.id);
    assert_eq!(summary.title, doc.title);
    assert_eq!(summary.updated_at, 42);
    assert_eq!(summary.last_writer_id, doc.last_writer_id);
}
