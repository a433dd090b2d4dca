//! Two-client demo.
//!
//! Opens two sync sessions on one document, edits the first scene, and
//! waits for the second to converge. The document id may be given as the
//! first argument; otherwise a fresh document is created. Uses `PostgreSQL`
//! when `DATABASE_URL` is set, the in-memory store otherwise.

use std::sync::Arc;
use std::time::Duration;

use scenesync::config::{DbConfig, SyncConfig};
use scenesync::db;
use scenesync::document::{DocumentId, NewDocument};
use scenesync::scene::LiveScene;
use scenesync::snapshot::{ShapeNode, StrokePoint};
use scenesync::store::{DocumentStore, MemoryStore, PgStore};
use scenesync::sync::SyncSession;
use tracing::{debug, info, warn};

/// Extra wait on top of the debounce for the write to propagate.
const PROPAGATION_MARGIN: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenv {
        debug!(error = %e, "no .env file loaded");
    }

    let store: Arc<dyn DocumentStore> = match db::init_pool(&DbConfig::from_env()).await? {
        Some(pool) => Arc::new(PgStore::new(pool)),
        None => {
            warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let document_id = match std::env::args().nth(1) {
        Some(raw) => raw.parse::<DocumentId>()?,
        None => store.create(NewDocument { title: Some("Demo board".into()) }).await?,
    };
    let config = SyncConfig::from_env();
    let settle = config.debounce + PROPAGATION_MARGIN;

    let scene_a = Arc::new(LiveScene::new());
    let scene_b = Arc::new(LiveScene::new());
    let session_a = SyncSession::open(Arc::clone(&store), scene_a.clone(), document_id, config.clone()).await;
    let session_b = SyncSession::open(Arc::clone(&store), scene_b.clone(), document_id, config).await;
    info!(
        document_id = %document_id,
        client_a = %session_a.client_id(),
        client_b = %session_b.client_id(),
        "sessions open"
    );

    scene_a.set_background("#ffffff");
    scene_a.add_shape(ShapeNode::rect(100.0, 100.0, 120.0, 80.0).with_fill("#f87171"));
    scene_a.add_shape(ShapeNode::text(250.0, 200.0, "Edit me"));
    scene_a.add_shape(
        ShapeNode::stroke(vec![
            StrokePoint::new(40.0, 300.0),
            StrokePoint::new(80.0, 260.0),
            StrokePoint::new(120.0, 310.0),
        ])
        .with_stroke("#111827", 3.0),
    );
    tokio::time::sleep(settle).await;
    info!(shapes_a = scene_a.len(), shapes_b = scene_b.len(), "after edits on A");

    scene_b.add_shape(ShapeNode::circle(400.0, 120.0, 40.0).with_fill("#60a5fa"));
    session_b.save_now().await?;
    tokio::time::sleep(PROPAGATION_MARGIN).await;
    info!(shapes_a = scene_a.len(), shapes_b = scene_b.len(), "after manual save on B");

    session_a.close().await;
    session_b.close().await;

    for summary in store.list().await? {
        info!(
            document_id = %summary.id,
            title = summary.title.as_deref().unwrap_or("(untitled)"),
            updated_at = summary.updated_at,
            "document"
        );
    }
    Ok(())
}
