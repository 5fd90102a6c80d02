// proposal-pdf: in-memory preview references
//
// A published document stays addressable through its URL until the handle
// is revoked or dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:proposal/";

type Blobs = HashMap<Uuid, Arc<Vec<u8>>>;

#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    blobs: Arc<Mutex<Blobs>>,
}

fn lock(blobs: &Mutex<Blobs>) -> MutexGuard<'_, Blobs> {
    blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `bytes` addressable until the returned handle goes away.
    pub fn publish(&self, bytes: Arc<Vec<u8>>) -> PreviewHandle {
        let id = Uuid::new_v4();
        lock(&self.blobs).insert(id, bytes);
        debug!("event=preview_publish id={}", id);
        PreviewHandle {
            id,
            url: format!("{}{}", URL_PREFIX, id),
            registry: self.clone(),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        let id = url.strip_prefix(URL_PREFIX)?;
        let id = Uuid::parse_str(id).ok()?;
        lock(&self.blobs).get(&id).cloned()
    }

    /// Number of live previews.
    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: &Uuid) {
        if lock(&self.blobs).remove(id).is_some() {
            debug!("event=preview_revoke id={}", id);
        }
    }
}

/// Live preview. Dropping it revokes the URL.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    url: String,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.registry.resolve(&self.url)
    }

    pub fn revoke(self) {}
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}
