//! Record store: persisted proposals with live list subscriptions.
//!
//! # Invariants
//! - Ids and creation timestamps never change after `create`.
//! - Lists are ordered by creation time, newest first; ties keep the most
//!   recently created record first.
//! - Subscribers receive the whole list, capped at the configured limit, once
//!   on subscribe and again after every successful write.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_LIST_LIMIT;
use crate::error::StoreError;
use crate::record::Record;

/// A proposal as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: Record,
}

pub type Listener = Box<dyn Fn(&[StoredRecord]) + Send + Sync>;

pub trait RecordStore: Send + Sync {
    /// Persists a new proposal and returns its generated id.
    fn create(&self, record: &Record) -> Result<String, StoreError>;
    /// Replaces the contents of an existing proposal.
    fn update(&self, id: &str, record: &Record) -> Result<(), StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    fn get(&self, id: &str) -> Result<Option<StoredRecord>, StoreError>;
    /// Every proposal, newest first.
    fn list(&self) -> Result<Vec<StoredRecord>, StoreError>;
    /// Registers `listener` until the returned handle is dropped.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

// ============================================================================
// Subscription
// ============================================================================

/// Live-list registration. Dropping it releases the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ============================================================================
// Local Store
// ============================================================================

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_id: HashMap<u64, Arc<Listener>>,
}

/// In-process store, optionally mirrored to a JSON file after every write.
pub struct LocalStore {
    // Creation order, oldest first.
    records: Mutex<Vec<StoredRecord>>,
    listeners: Arc<Mutex<Listeners>>,
    path: Option<PathBuf>,
    limit: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LocalStore {
    pub fn in_memory() -> Self {
        LocalStore {
            records: Mutex::new(Vec::new()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            path: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }

    /// Opens a store backed by `path`, loading it when the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(
            "event=store_open status=ok path={} records={}",
            path.display(),
            records.len()
        );
        Ok(LocalStore {
            records: Mutex::new(records),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            path: Some(path),
            limit: DEFAULT_LIST_LIMIT,
        })
    }

    /// Caps the list delivered to subscribers.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    fn ordered(records: &[StoredRecord]) -> Vec<StoredRecord> {
        let mut items: Vec<StoredRecord> = records.iter().rev().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    /// Writes `next` to disk (when file backed) and then makes it current.
    fn commit(
        &self,
        guard: &mut MutexGuard<'_, Vec<StoredRecord>>,
        next: Vec<StoredRecord>,
    ) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        **guard = next;
        Ok(())
    }

    fn notify(&self) {
        let snapshot = {
            let records = lock(&self.records);
            let mut items = Self::ordered(&records);
            items.truncate(self.limit);
            items
        };
        let listeners: Vec<Arc<Listener>> =
            lock(&self.listeners).by_id.values().cloned().collect();
        for listener in listeners {
            let callback: &Listener = &listener;
            callback(&snapshot);
        }
    }
}

fn persist(path: &Path, records: &[StoredRecord]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl RecordStore for LocalStore {
    fn create(&self, record: &Record) -> Result<String, StoreError> {
        let now = Utc::now();
        let id = Uuid::new_v4().simple().to_string();
        {
            let mut records = lock(&self.records);
            let mut next = records.clone();
            next.push(StoredRecord {
                id: id.clone(),
                created_at: now,
                updated_at: now,
                record: record.clone(),
            });
            self.commit(&mut records, next)?;
        }
        debug!("event=store_create status=ok id={}", id);
        self.notify();
        Ok(id)
    }

    fn update(&self, id: &str, record: &Record) -> Result<(), StoreError> {
        {
            let mut records = lock(&self.records);
            let mut next = records.clone();
            let entry = next
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            entry.record = record.clone();
            entry.updated_at = Utc::now().max(entry.created_at);
            self.commit(&mut records, next)?;
        }
        debug!("event=store_update status=ok id={}", id);
        self.notify();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        {
            let mut records = lock(&self.records);
            if !records.iter().any(|r| r.id == id) {
                return Err(StoreError::NotFound(id.to_string()));
            }
            let next: Vec<StoredRecord> = records.iter().filter(|r| r.id != id).cloned().collect();
            self.commit(&mut records, next)?;
        }
        debug!("event=store_delete status=ok id={}", id);
        self.notify();
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(lock(&self.records).iter().find(|r| r.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(Self::ordered(&lock(&self.records)))
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let listener = Arc::new(listener);
        let key = {
            let mut listeners = lock(&self.listeners);
            let key = listeners.next_id;
            listeners.next_id += 1;
            listeners.by_id.insert(key, Arc::clone(&listener));
            key
        };

        let mut initial = Self::ordered(&lock(&self.records));
        initial.truncate(self.limit);
        let callback: &Listener = &listener;
        callback(&initial);

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            lock(&listeners).by_id.remove(&key);
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
