use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Outcome of the last completed lifecycle operation per container.
///
/// Process-local and starts empty. Only used for display; never consulted
/// when deciding what to do with a container.
#[derive(Debug, Default)]
pub struct StatusCache {
    entries: RwLock<HashMap<Uuid, bool>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, id: Uuid, succeeded: bool) {
        self.entries.write().await.insert(id, succeeded);
    }

    pub async fn evict(&self, id: Uuid) {
        self.entries.write().await.remove(&id);
    }

    /// Unknown ids read as `false`.
    pub async fn get(&self, id: Uuid) -> bool {
        self.entries.read().await.get(&id).copied().unwrap_or(false)
    }
}
