use serde_json::json;

use super::*;
use crate::snapshot::{ShapeKind, Style};

fn points(raw: &[(f64, f64)]) -> Vec<StrokePoint> {
    raw.iter().map(|&(x, y)| StrokePoint::new(x, y)).collect()
}

fn mixed_snapshot() -> Snapshot {
    Snapshot::new(vec![
        ShapeNode::rect(100.0, 100.0, 120.0, 80.0).with_fill("#f87171"),
        ShapeNode::stroke(points(&[(10.0, 20.0), (30.5, 40.0)])).with_stroke("#000000", 4.0),
        ShapeNode::group(vec![
            ShapeNode::text(1.0, 2.0, "inner"),
            ShapeNode::stroke(points(&[(0.0, 0.0), (-1.25, 3.0), (7.0, 8.0)])),
        ]),
    ])
}

// =============================================================================
// encode / decode
// =============================================================================

#[test]
fn encode_joins_coordinates_and_points() {
    assert_eq!(encode_points(&points(&[(10.0, 20.0), (30.5, 40.0)])), "10,20;30.5,40");
}

#[test]
fn encode_empty_is_empty_string() {
    assert_eq!(encode_points(&[]), "");
}

#[test]
fn decode_reverses_encode() {
    let original = points(&[(0.0, 0.0), (-1.25, 3.0), (1e-3, 1e6)]);
    assert_eq!(decode_points(&encode_points(&original)).unwrap(), original);
}

#[test]
fn decode_empty_string_is_empty() {
    assert!(decode_points("").unwrap().is_empty());
}

#[test]
fn decode_rejects_missing_coordinate() {
    let err = decode_points("1,2;3").unwrap_err();
    let SanitizeError::MalformedPath { index, segment } = &err;
    assert_eq!(*index, 1);
    assert_eq!(segment, "3");
    assert_eq!(err.error_code(), "E_MALFORMED_PATH");
}

#[test]
fn decode_rejects_extra_coordinate() {
    assert!(decode_points("1,2,3").is_err());
}

#[test]
fn decode_rejects_non_numeric() {
    assert!(decode_points("1,2;x,4").is_err());
}

// =============================================================================
// sanitize
// =============================================================================

#[test]
fn sanitize_without_strokes_is_identity() {
    let snapshot = Snapshot::new(vec![
        ShapeNode::rect(100.0, 100.0, 120.0, 80.0).with_fill("#f87171"),
        ShapeNode::circle(200.0, 150.0, 50.0),
        ShapeNode::group(vec![ShapeNode::text(250.0, 200.0, "Edit me")]),
    ]);
    assert_eq!(PathSanitizer.sanitize(snapshot.clone()), snapshot);
}

#[test]
fn sanitize_encodes_top_level_and_nested_strokes() {
    let sanitized = PathSanitizer.sanitize(mixed_snapshot());
    assert_eq!(sanitized.objects[1].path, Some(StrokePath::Encoded("10,20;30.5,40".into())));
    assert_eq!(sanitized.objects[2].objects[1].path, Some(StrokePath::Encoded("0,0;-1.25,3;7,8".into())));
}

#[test]
fn sanitize_leaves_other_fields_untouched() {
    let original = mixed_snapshot();
    let sanitized = PathSanitizer.sanitize(original.clone());

    assert_eq!(sanitized.version, original.version);
    assert_eq!(sanitized.objects.len(), original.objects.len());
    assert_eq!(sanitized.objects[0], original.objects[0]);
    let stroke = &sanitized.objects[1];
    assert_eq!(stroke.kind, ShapeKind::Path);
    assert_eq!(stroke.geometry, original.objects[1].geometry);
    assert_eq!(
        stroke.style,
        Style { stroke: Some("#000000".into()), stroke_width: Some(4.0), ..Style::default() }
    );
    assert_eq!(sanitized.objects[2].objects[0], original.objects[2].objects[0]);
}

#[test]
fn sanitized_payload_stores_path_as_string() {
    let value = serde_json::to_value(PathSanitizer.sanitize(mixed_snapshot())).unwrap();
    assert_eq!(value["objects"][1]["path"], json!("10,20;30.5,40"));
    assert!(value["objects"][0].get("path").is_none());
}

#[test]
fn sanitize_is_idempotent() {
    let once = PathSanitizer.sanitize(mixed_snapshot());
    let twice = PathSanitizer.sanitize(once.clone());
    assert_eq!(once, twice);
}

// =============================================================================
// restore
// =============================================================================

#[test]
fn restore_reverses_sanitize() {
    let original = mixed_snapshot();
    let restored = PathSanitizer.restore(PathSanitizer.sanitize(original.clone())).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn restore_from_stored_json() {
    let stored = json!({
        "version": "1",
        "objects": [{"type": "path", "path": "1,2;3,4"}]
    });
    let snapshot: Snapshot = serde_json::from_value(stored).unwrap();
    let restored = PathSanitizer.restore(snapshot).unwrap();
    assert_eq!(restored.objects[0].path, Some(StrokePath::Points(points(&[(1.0, 2.0), (3.0, 4.0)]))));
}

#[test]
fn restore_propagates_malformed_nested_path() {
    let snapshot = Snapshot::new(vec![ShapeNode::group(vec![ShapeNode {
        path: Some(StrokePath::Encoded("1,2;oops".into())),
        ..ShapeNode::new(ShapeKind::Path, crate::snapshot::Geometry::default())
    }])]);
    assert!(PathSanitizer.restore(snapshot).is_err());
}
