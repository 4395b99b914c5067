//! The authoritative in-memory recipe collection.
//!
//! Every mutation is written through to the [`RecipeStore`] before the new
//! snapshot becomes visible. Mutations are serialized: each one is computed
//! from the latest committed snapshot while holding the write lock, so two
//! overlapping saves can never both start from the same stale collection.
//! Reads only clone an `Arc` and never wait for a pending save.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::model::Recipe;
use crate::storage::{RecipeStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("saving recipes failed: {0}")]
    SaveFailed(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// The snapshot was replaced wholesale from storage.
    Loaded { count: usize },
    Saved { id: String, created: bool },
    Deleted { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Called synchronously after a successful write-through with the event and
/// the newly committed collection.
pub type ChangeListener = Box<dyn Fn(&CatalogEvent, &[Recipe]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct RecipeCatalog {
    store: RecipeStore,
    snapshot: RwLock<Arc<Vec<Recipe>>>,
    write_lock: Mutex<()>,
    listeners: Mutex<Vec<(ListenerId, Arc<ChangeListener>)>>,
    subscribers: Mutex<Vec<Sender<CatalogEvent>>>,
    next_listener: AtomicU64,
}

impl RecipeCatalog {
    /// Opens the catalog with whatever the store holds. Missing or malformed
    /// data yields an empty collection.
    pub fn open(store: RecipeStore) -> Result<Self, StoreError> {
        let recipes = store.load()?.unwrap_or_default();
        tracing::info!(count = recipes.len(), "loaded recipe catalog");
        Ok(Self {
            store,
            snapshot: RwLock::new(Arc::new(recipes)),
            write_lock: Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        })
    }

    /// Replaces the in-memory collection with the persisted one (no merge).
    pub fn reload(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let recipes = Arc::new(self.store.load()?.unwrap_or_default());
        *self.snapshot.write() = Arc::clone(&recipes);
        self.notify(
            &CatalogEvent::Loaded {
                count: recipes.len(),
            },
            &recipes,
        );
        Ok(())
    }

    pub fn get_all(&self) -> Arc<Vec<Recipe>> {
        Arc::clone(&*self.snapshot.read())
    }

    pub fn get_by_id(&self, id: &str) -> Option<Recipe> {
        self.snapshot.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot.read().iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }

    /// Replaces the recipe with the same id in place, or prepends it as the
    /// newest entry.
    pub fn upsert(&self, recipe: Recipe) -> Result<UpsertOutcome, CatalogError> {
        let _guard = self.write_lock.lock();
        let current = self.get_all();
        let mut next = Vec::with_capacity(current.len() + 1);
        let outcome = match current.iter().position(|r| r.id == recipe.id) {
            Some(index) => {
                next.extend(current.iter().cloned());
                next[index] = recipe.clone();
                UpsertOutcome::Updated
            }
            None => {
                next.push(recipe.clone());
                next.extend(current.iter().cloned());
                UpsertOutcome::Created
            }
        };
        let event = CatalogEvent::Saved {
            id: recipe.id.clone(),
            created: outcome == UpsertOutcome::Created,
        };
        self.commit(next, &event)?;
        tracing::info!(id = %recipe.id, ?outcome, "saved recipe");
        Ok(outcome)
    }

    /// Removes the recipe with `id`. Returns `Ok(false)` without touching
    /// storage when no such recipe exists.
    pub fn delete(&self, id: &str) -> Result<bool, CatalogError> {
        let _guard = self.write_lock.lock();
        let current = self.get_all();
        if !current.iter().any(|r| r.id == id) {
            tracing::debug!(id, "delete of unknown recipe ignored");
            return Ok(false);
        }
        let next: Vec<Recipe> = current.iter().filter(|r| r.id != id).cloned().collect();
        self.commit(next, &CatalogEvent::Deleted { id: id.to_owned() })?;
        tracing::info!(id, "deleted recipe");
        Ok(true)
    }

    pub fn on_change(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Channel flavour of [`on_change`](Self::on_change); dropped receivers are
    /// pruned on the next event.
    pub fn subscribe(&self) -> Receiver<CatalogEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    // Caller must hold `write_lock`.
    fn commit(&self, next: Vec<Recipe>, event: &CatalogEvent) -> Result<(), CatalogError> {
        if let Err(err) = self.store.save(&next) {
            tracing::warn!(%err, ?event, "write-through failed, keeping previous snapshot");
            return Err(err.into());
        }
        let next = Arc::new(next);
        *self.snapshot.write() = Arc::clone(&next);
        self.notify(event, &next);
        Ok(())
    }

    fn notify(&self, event: &CatalogEvent, recipes: &[Recipe]) {
        let listeners: Vec<Arc<ChangeListener>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event, recipes);
        }
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
