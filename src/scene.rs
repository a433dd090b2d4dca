//! Scene serializer seam and the in-memory live scene.
//!
//! The sync core talks to the shape toolkit only through [`SceneSerializer`]:
//! a pure `serialize`, an asynchronous whole-scene `deserialize`, and a
//! mutation hook. [`LiveScene`] is the in-process implementation used by the
//! demo binary and the tests; toolbar-style editing (`add_shape`,
//! `remove_shapes`, selection) lives here too but is outside the sync path.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::listener::{ListenerSet, Subscription};
use crate::snapshot::{ShapeKind, ShapeNode, Snapshot, StrokePath};

/// Unique identifier for a live shape. Not part of the snapshot.
pub type ShapeId = Uuid;

/// Payload-free notification fired after the scene already reflects a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEvent {
    Added,
    Modified,
    Removed,
}

/// Mutation hook registered through [`SceneSerializer::on_mutation`].
pub type MutationListener = Box<dyn Fn(MutationEvent) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("stroke path of node {0} is still in encoded form")]
    EncodedPath(usize),
    #[error("invalid {kind:?} node {index}: {reason}")]
    InvalidShape { index: usize, kind: ShapeKind, reason: &'static str },
}

impl SceneError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EncodedPath(_) => "E_ENCODED_PATH",
            Self::InvalidShape { .. } => "E_INVALID_SHAPE",
        }
    }
}

/// Conversion between the live scene and [`Snapshot`]s.
#[async_trait]
pub trait SceneSerializer: Send + Sync {
    /// Capture the complete visual state. Must not modify the scene.
    fn serialize(&self) -> Snapshot;

    /// Replace the entire scene with `snapshot`. Resolves once every shape
    /// is constructed; on error the scene is left as the engine left it.
    async fn deserialize(&self, snapshot: Snapshot) -> Result<(), SceneError>;

    /// Register a hook fired for every added, modified or removed shape.
    fn on_mutation(&self, listener: MutationListener) -> Subscription;
}

// =============================================================================
// LIVE SCENE
// =============================================================================

/// In-memory scene: ordered shapes, selection, and mutation listeners.
pub struct LiveScene {
    state: Mutex<SceneState>,
    listeners: ListenerSet<MutationEvent>,
}

#[derive(Default)]
struct SceneState {
    background: Option<String>,
    /// Draw order; first is bottom-most.
    shapes: Vec<(ShapeId, ShapeNode)>,
    selection: HashSet<ShapeId>,
}

impl LiveScene {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(SceneState::default()), listeners: ListenerSet::new() }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SceneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a shape on top of the draw order.
    pub fn add_shape(&self, node: ShapeNode) -> ShapeId {
        let id = Uuid::new_v4();
        self.lock().shapes.push((id, node));
        self.listeners.emit(&MutationEvent::Added);
        id
    }

    /// Edit a shape in place. Returns false if it doesn't exist.
    pub fn modify_shape(&self, id: ShapeId, edit: impl FnOnce(&mut ShapeNode)) -> bool {
        let found = {
            let mut state = self.lock();
            match state.shapes.iter_mut().find(|(existing, _)| *existing == id) {
                Some((_, node)) => {
                    edit(node);
                    true
                }
                None => false,
            }
        };
        if found {
            self.listeners.emit(&MutationEvent::Modified);
        }
        found
    }

    /// Remove shapes by id, dropping them from the selection. Returns how many were removed.
    pub fn remove_shapes(&self, ids: &[ShapeId]) -> usize {
        let removed = {
            let mut state = self.lock();
            let before = state.shapes.len();
            state.shapes.retain(|(id, _)| !ids.contains(id));
            for id in ids {
                state.selection.remove(id);
            }
            before - state.shapes.len()
        };
        for _ in 0..removed {
            self.listeners.emit(&MutationEvent::Removed);
        }
        removed
    }

    /// Replace the selection with the ids that exist in the scene.
    pub fn select(&self, ids: &[ShapeId]) {
        let mut state = self.lock();
        let selection: HashSet<ShapeId> = ids
            .iter()
            .copied()
            .filter(|id| state.shapes.iter().any(|(existing, _)| existing == id))
            .collect();
        state.selection = selection;
    }

    /// Selected ids in draw order.
    #[must_use]
    pub fn selection(&self) -> Vec<ShapeId> {
        let state = self.lock();
        state
            .shapes
            .iter()
            .filter(|(id, _)| state.selection.contains(id))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Remove every selected shape.
    pub fn remove_selected(&self) -> usize {
        let selected = self.selection();
        self.remove_shapes(&selected)
    }

    pub fn set_background(&self, color: impl Into<String>) {
        self.lock().background = Some(color.into());
        self.listeners.emit(&MutationEvent::Modified);
    }

    #[must_use]
    pub fn shape(&self, id: ShapeId) -> Option<ShapeNode> {
        self.lock()
            .shapes
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, node)| node.clone())
    }

    /// All shapes in draw order.
    #[must_use]
    pub fn shapes(&self) -> Vec<ShapeNode> {
        self.lock().shapes.iter().map(|(_, node)| node.clone()).collect()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ShapeId> {
        self.lock().shapes.iter().map(|(id, _)| *id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().shapes.is_empty()
    }
}

impl Default for LiveScene {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SceneSerializer for LiveScene {
    fn serialize(&self) -> Snapshot {
        let state = self.lock();
        let mut snapshot = Snapshot::new(state.shapes.iter().map(|(_, node)| node.clone()).collect());
        snapshot.background.clone_from(&state.background);
        snapshot
    }

    async fn deserialize(&self, snapshot: Snapshot) -> Result<(), SceneError> {
        // PHASE: VALIDATE
        // Nothing is swapped in until every node is buildable.
        validate_snapshot(&snapshot)?;

        // PHASE: RESOLVE ASSETS
        for node in &snapshot.objects {
            if node.kind == ShapeKind::Image {
                tokio::task::yield_now().await;
            }
        }

        // PHASE: SWAP
        let added = snapshot.objects.len();
        {
            let mut state = self.lock();
            state.background = snapshot.background;
            state.selection.clear();
            state.shapes = snapshot
                .objects
                .into_iter()
                .map(|node| (Uuid::new_v4(), node))
                .collect();
        }
        for _ in 0..added {
            self.listeners.emit(&MutationEvent::Added);
        }
        Ok(())
    }

    fn on_mutation(&self, listener: MutationListener) -> Subscription {
        self.listeners.register(move |event: &MutationEvent| listener(*event))
    }
}

/// Check that every node in `snapshot` can be built and stored faithfully:
/// finite geometry, decoded stroke paths, and required fields per kind.
///
/// # Errors
///
/// The first offending node, indexed in depth-first order.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<(), SceneError> {
    let mut index = 0;
    validate_nodes(&snapshot.objects, &mut index)
}

fn validate_nodes(nodes: &[ShapeNode], index: &mut usize) -> Result<(), SceneError> {
    for node in nodes {
        let here = *index;
        *index += 1;
        let invalid = |reason| SceneError::InvalidShape { index: here, kind: node.kind, reason };

        let g = &node.geometry;
        if ![g.left, g.top, g.width, g.height, g.angle, g.scale_x, g.scale_y]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("non-finite geometry"));
        }

        match (&node.kind, &node.path) {
            (_, Some(StrokePath::Encoded(_))) => return Err(SceneError::EncodedPath(here)),
            (ShapeKind::Path, None) => return Err(invalid("path shape without stroke geometry")),
            (ShapeKind::Image, _) if node.src.is_none() => return Err(invalid("image without source")),
            _ => {}
        }

        validate_nodes(&node.objects, index)?;
    }
    Ok(())
}
