//! Funnel definition store
//!
//! A small repository seam for hosts that want to keep definitions around
//! between calculations. Deletion is soft: deleted funnels stop appearing
//! in listings but their records survive. The engine itself never touches
//! a store; callers wire the two together.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use funnelgraph_types::{FunnelDefinition, UtcDateTime};

use crate::error::{StoreError, StoreResult};

/// A funnel definition with store-assigned identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFunnel {
    pub id: Uuid,
    pub definition: FunnelDefinition,
    pub is_active: bool,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// Repository contract for funnel definitions
pub trait FunnelStore: Send + Sync {
    /// Persist a new definition and assign it an id
    fn create(&self, definition: FunnelDefinition) -> StoredFunnel;

    /// Fetch an active funnel by id
    fn get(&self, id: Uuid) -> StoreResult<StoredFunnel>;

    /// All active funnels, oldest first
    fn list(&self) -> Vec<StoredFunnel>;

    /// Replace an active funnel's definition
    fn update(&self, id: Uuid, definition: FunnelDefinition) -> StoreResult<StoredFunnel>;

    /// Soft-delete a funnel
    fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// In-memory store backed by a `RwLock`ed map
#[derive(Default)]
pub struct InMemoryFunnelStore {
    funnels: RwLock<HashMap<Uuid, StoredFunnel>>,
}

impl InMemoryFunnelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FunnelStore for InMemoryFunnelStore {
    fn create(&self, definition: FunnelDefinition) -> StoredFunnel {
        let now = Utc::now();
        let stored = StoredFunnel {
            id: Uuid::new_v4(),
            definition,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        debug!(funnel = %stored.id, "Storing funnel definition");
        self.funnels
            .write()
            .expect("funnel store lock poisoned")
            .insert(stored.id, stored.clone());
        stored
    }

    fn get(&self, id: Uuid) -> StoreResult<StoredFunnel> {
        self.funnels
            .read()
            .expect("funnel store lock poisoned")
            .get(&id)
            .filter(|f| f.is_active)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self) -> Vec<StoredFunnel> {
        let mut funnels: Vec<StoredFunnel> = self
            .funnels
            .read()
            .expect("funnel store lock poisoned")
            .values()
            .filter(|f| f.is_active)
            .cloned()
            .collect();
        funnels.sort_by_key(|f| f.created_at);
        funnels
    }

    fn update(&self, id: Uuid, definition: FunnelDefinition) -> StoreResult<StoredFunnel> {
        let mut funnels = self.funnels.write().expect("funnel store lock poisoned");
        let stored = funnels
            .get_mut(&id)
            .filter(|f| f.is_active)
            .ok_or(StoreError::NotFound(id))?;
        stored.definition = definition;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut funnels = self.funnels.write().expect("funnel store lock poisoned");
        let stored = funnels
            .get_mut(&id)
            .filter(|f| f.is_active)
            .ok_or(StoreError::NotFound(id))?;
        stored.is_active = false;
        stored.updated_at = Utc::now();
        Ok(())
    }
}
