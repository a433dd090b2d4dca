//! Echo suppression.
//!
//! The store notifies every subscriber of every write, including the
//! writer itself. Applying our own write back onto the scene would be
//! wasted work at best and would churn the apply guard at worst, so such
//! notifications are dropped before any payload is touched.

use crate::document::RemoteChange;
use crate::identity::ClientId;

#[derive(Debug, Clone)]
pub struct EchoFilter {
    self_id: ClientId,
}

impl EchoFilter {
    #[must_use]
    pub fn new(self_id: ClientId) -> Self {
        Self { self_id }
    }

    /// `false` when `change` was written by this client.
    #[must_use]
    pub fn should_apply(&self, change: &RemoteChange) -> bool {
        change.last_writer_id.as_ref() != Some(&self.self_id)
    }
}

#[cfg(test)]
#[path = "echo_test.rs"]
mod tests;
