//! Document synchronization core for a collaboratively edited scene graph.
//!
//! Several independent clients edit the same document. Each client observes
//! its own scene mutations, coalesces bursts of them into one remote write,
//! and applies remote revisions back onto its scene without echoing them
//! out again. Consistency is last-writer-wins on store timestamps.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`sync`] | Session coordinator, echo filter, apply guard, debounced writer |
//! | [`scene`] | Scene serializer trait and the in-memory [`scene::LiveScene`] |
//! | [`snapshot`] | Typed snapshot tree written to the store |
//! | [`sanitize`] | Stroke path encoding for persistence and its inverse |
//! | [`store`] | Document store trait with memory and `PostgreSQL` backends |
//! | [`document`] | Document, change notification and identifier types |
//! | [`identity`] | Per-session client identity |
//! | [`listener`] | Listener registry and unsubscribe handles |
//! | [`config`] | Environment-driven configuration |
//! | [`db`] | `PostgreSQL` pool setup and migrations |

pub mod config;
pub mod db;
pub mod document;
pub mod identity;
pub mod listener;
pub mod sanitize;
pub mod scene;
pub mod snapshot;
pub mod store;
pub mod sync;
