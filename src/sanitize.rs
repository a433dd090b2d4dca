//! Stroke path sanitization.
//!
//! Nested point arrays are expensive in the persistence layer, so every
//! freehand stroke is flattened into one compact string before a snapshot
//! is written: coordinates joined by [`COORD_SEPARATOR`], points joined by
//! [`POINT_SEPARATOR`] (`[[10,20],[30.5,40]]` becomes `"10,20;30.5,40"`).
//!
//! The live scene only accepts point lists, so [`PathSanitizer::restore`]
//! reverses the encoding before a stored snapshot is deserialized.

use crate::snapshot::{ShapeNode, Snapshot, StrokePath, StrokePoint};

pub const COORD_SEPARATOR: char = ',';
pub const POINT_SEPARATOR: char = ';';

#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("malformed stroke path at point {index}: {segment:?}")]
    MalformedPath { index: usize, segment: String },
}

impl SanitizeError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedPath { .. } => "E_MALFORMED_PATH",
        }
    }
}

/// Typed snapshot traversal that rewrites only [`ShapeNode::path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSanitizer;

impl PathSanitizer {
    /// Encode every stroke path in the tree. All other fields pass through
    /// untouched; already-encoded paths are left as they are.
    #[must_use]
    pub fn sanitize(&self, snapshot: Snapshot) -> Snapshot {
        Snapshot { objects: snapshot.objects.into_iter().map(sanitize_node).collect(), ..snapshot }
    }

    /// Decode every encoded stroke path back into points.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizeError::MalformedPath`] if an encoded path is not a
    /// sequence of `x,y` number pairs.
    pub fn restore(&self, snapshot: Snapshot) -> Result<Snapshot, SanitizeError> {
        let objects = snapshot
            .objects
            .into_iter()
            .map(restore_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Snapshot { objects, ..snapshot })
    }
}

fn sanitize_node(mut node: ShapeNode) -> ShapeNode {
    node.path = node.path.map(|path| match path {
        StrokePath::Points(points) => StrokePath::Encoded(encode_points(&points)),
        encoded @ StrokePath::Encoded(_) => encoded,
    });
    node.objects = node.objects.into_iter().map(sanitize_node).collect();
    node
}

fn restore_node(mut node: ShapeNode) -> Result<ShapeNode, SanitizeError> {
    node.path = match node.path {
        Some(StrokePath::Encoded(raw)) => Some(StrokePath::Points(decode_points(&raw)?)),
        other => other,
    };
    node.objects = node
        .objects
        .into_iter()
        .map(restore_node)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(node)
}

/// Flatten points into the compact storage string.
#[must_use]
pub fn encode_points(points: &[StrokePoint]) -> String {
    points
        .iter()
        .map(|p| format!("{}{COORD_SEPARATOR}{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(&POINT_SEPARATOR.to_string())
}

/// Parse the compact storage string back into points.
///
/// # Errors
///
/// Returns [`SanitizeError::MalformedPath`] naming the first bad point.
pub fn decode_points(raw: &str) -> Result<Vec<StrokePoint>, SanitizeError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(POINT_SEPARATOR)
        .enumerate()
        .map(|(index, segment)| {
            let malformed = || SanitizeError::MalformedPath { index, segment: segment.to_owned() };
            let mut coords = segment.split(COORD_SEPARATOR);
            match (coords.next(), coords.next(), coords.next()) {
                (Some(x), Some(y), None) => {
                    let x = x.trim().parse::<f64>().map_err(|_| malformed())?;
                    let y = y.trim().parse::<f64>().map_err(|_| malformed())?;
                    Ok(StrokePoint::new(x, y))
                }
                _ => Err(malformed()),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "sanitize_test.rs"]
mod tests;
