//! Snapshot model: the portable tree form of a whole scene.
//!
//! A [`Snapshot`] is what the scene serializer produces and what ends up
//! (after stroke sanitization) as a document payload. Nodes are typed; the
//! only volatile field is [`ShapeNode::path`], the freehand stroke geometry,
//! which exists in two forms: [`StrokePath::Points`] in memory and
//! [`StrokePath::Encoded`] in storage.

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;

use serde::{Deserialize, Serialize};

/// Schema version written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "1";

/// Full visual state of a scene at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    /// Canvas background color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Top-level shapes in draw order (first is bottom-most).
    #[serde(default)]
    pub objects: Vec<ShapeNode>,
}

impl Snapshot {
    #[must_use]
    pub fn new(objects: Vec<ShapeNode>) -> Self {
        Self { version: SNAPSHOT_VERSION.to_owned(), background: None, objects }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of nodes in the tree, counting group children.
    #[must_use]
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[ShapeNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.objects)).sum()
        }
        count(&self.objects)
    }

    /// Returns `true` if any node, at any depth, carries stroke geometry.
    #[must_use]
    pub fn has_stroke_paths(&self) -> bool {
        fn any(nodes: &[ShapeNode]) -> bool {
            nodes.iter().any(|n| n.path.is_some() || any(&n.objects))
        }
        any(&self.objects)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// The kind of a scene shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rect,
    /// Circle inscribed in the bounding box.
    Circle,
    /// Ellipse inscribed in the bounding box.
    Ellipse,
    /// Straight segment from the top-left to the bottom-right of the box.
    Line,
    /// Editable text.
    Text,
    /// Freehand pen stroke; geometry lives in `path`.
    Path,
    /// Container whose children are in `objects`.
    Group,
    /// Raster image loaded from `src`.
    Image,
}

/// Position and size of a shape in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "unit_scale")]
    pub scale_x: f64,
    #[serde(default = "unit_scale")]
    pub scale_y: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl Geometry {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height, angle: 0.0, scale_x: 1.0, scale_y: 1.0 }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Paint attributes. Absent fields use the renderer's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

/// One shape descriptor in the snapshot tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeNode {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default)]
    pub style: Style,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image source URL for [`ShapeKind::Image`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Freehand stroke geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<StrokePath>,
    /// Children of a [`ShapeKind::Group`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ShapeNode>,
}

impl ShapeNode {
    #[must_use]
    pub fn new(kind: ShapeKind, geometry: Geometry) -> Self {
        Self {
            kind,
            geometry,
            style: Style::default(),
            text: None,
            src: None,
            path: None,
            objects: Vec::new(),
        }
    }

    #[must_use]
    pub fn rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(ShapeKind::Rect, Geometry::new(left, top, width, height))
    }

    #[must_use]
    pub fn circle(left: f64, top: f64, radius: f64) -> Self {
        Self::new(ShapeKind::Circle, Geometry::new(left, top, radius * 2.0, radius * 2.0))
    }

    #[must_use]
    pub fn text(left: f64, top: f64, text: impl Into<String>) -> Self {
        let mut node = Self::new(ShapeKind::Text, Geometry::new(left, top, 0.0, 0.0));
        node.text = Some(text.into());
        node
    }

    /// Freehand stroke through `points`; the bounding box is derived from them.
    #[must_use]
    pub fn stroke(points: Vec<StrokePoint>) -> Self {
        let geometry = bounding_box(&points);
        let mut node = Self::new(ShapeKind::Path, geometry);
        node.path = Some(StrokePath::Points(points));
        node
    }

    #[must_use]
    pub fn group(children: Vec<ShapeNode>) -> Self {
        let mut node = Self::new(ShapeKind::Group, Geometry::default());
        node.objects = children;
        node
    }

    #[must_use]
    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.style.fill = Some(fill.into());
        self
    }

    #[must_use]
    pub fn with_stroke(mut self, stroke: impl Into<String>, width: f64) -> Self {
        self.style.stroke = Some(stroke.into());
        self.style.stroke_width = Some(width);
        self
    }
}

fn bounding_box(points: &[StrokePoint]) -> Geometry {
    let Some(first) = points.first() else {
        return Geometry::default();
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Geometry::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

/// Freehand stroke geometry in either of its two representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrokePath {
    /// Ordered points, as held by the live scene.
    Points(Vec<StrokePoint>),
    /// Compact storage form produced by [`crate::sanitize::PathSanitizer`].
    Encoded(String),
}

/// One stroke point. Serialized as a `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
}

impl StrokePoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for StrokePoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<StrokePoint> for [f64; 2] {
    fn from(p: StrokePoint) -> Self {
        [p.x, p.y]
    }
}
