//! Optimistic updates over a locally held list.
//!
//! [`OptimisticList::apply`] changes one entity immediately, runs the remote
//! mutation, and reverts that entity if the mutation fails. Rollback is per
//! entity: only the entity the failed mutation touched is restored, and only
//! when it still holds the value that mutation applied. Concurrent mutations
//! of other entities (or a later mutation of the same one) are left intact.

use crate::models::Identifiable;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// The entity named by an optimistic mutation is not in the local list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Entity {id} is not in the local list")]
pub struct MissingEntity {
    pub id: String,
}

/// Record needed to undo one optimistic change.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticEdit<T: Identifiable> {
    pub entity_id: T::Id,
    pub previous: T,
    pub applied: T,
}

/// Observable list of entities with optimistic, revertible updates.
pub struct OptimisticList<T> {
    items: watch::Sender<Vec<T>>,
}

impl<T> OptimisticList<T>
where
    T: Identifiable + Clone + PartialEq + fmt::Debug,
{
    pub fn new(items: Vec<T>) -> Self {
        let (items, _) = watch::channel(items);
        Self { items }
    }

    /// Current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.items.borrow().iter().find(|item| item.id() == id).cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    /// Replace the whole list, e.g. after a reload from the backend.
    pub fn replace(&self, items: Vec<T>) {
        self.items.send_replace(items);
    }

    /// Apply `compute_next` to one entity right away and return the undo record.
    pub fn begin<F>(&self, id: &T::Id, compute_next: F) -> Result<OptimisticEdit<T>, MissingEntity>
    where
        F: FnOnce(&T) -> T,
    {
        let mut edit = None;
        self.items.send_if_modified(|items| {
            let Some(item) = items.iter_mut().find(|item| item.id() == id) else {
                return false;
            };
            let applied = compute_next(item);
            let previous = std::mem::replace(item, applied.clone());
            let changed = previous != applied;
            edit = Some(OptimisticEdit {
                entity_id: id.clone(),
                previous,
                applied,
            });
            changed
        });

        edit.ok_or_else(|| MissingEntity { id: id.to_string() })
    }

    /// Undo `edit`. Returns whether the entity was restored.
    ///
    /// The entity is left alone if it no longer holds the applied value.
    pub fn rollback(&self, edit: OptimisticEdit<T>) -> bool {
        self.items.send_if_modified(|items| {
            match items.iter_mut().find(|item| item.id() == &edit.entity_id) {
                Some(item) if *item == edit.applied => {
                    *item = edit.previous;
                    true
                }
                _ => {
                    debug!(entity_id = %edit.entity_id, "Entity changed since the edit, keeping it");
                    false
                }
            }
        })
    }

    /// Apply a change locally, then confirm it remotely.
    ///
    /// The new value is visible to readers before `remote` is first polled.
    /// On failure the entity is rolled back and the remote error returned.
    /// Dropping the returned future before it completes also rolls back.
    pub async fn apply<F, M, Fut, R, E>(
        &self,
        id: &T::Id,
        compute_next: F,
        remote: M,
    ) -> Result<R, E>
    where
        F: FnOnce(&T) -> T,
        M: FnOnce(&T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<MissingEntity>,
    {
        let edit = self.begin(id, compute_next)?;
        let remote = remote(&edit.applied);
        let mut guard = RollbackGuard {
            list: self,
            edit: Some(edit),
        };

        match remote.await {
            Ok(result) => {
                guard.edit = None;
                Ok(result)
            }
            Err(e) => {
                guard.restore();
                Err(e)
            }
        }
    }
}

impl<T> Default for OptimisticList<T>
where
    T: Identifiable + Clone + PartialEq + fmt::Debug,
{
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

struct RollbackGuard<'a, T>
where
    T: Identifiable + Clone + PartialEq + fmt::Debug,
{
    list: &'a OptimisticList<T>,
    edit: Option<OptimisticEdit<T>>,
}

impl<T> RollbackGuard<'_, T>
where
    T: Identifiable + Clone + PartialEq + fmt::Debug,
{
    fn restore(&mut self) {
        if let Some(edit) = self.edit.take() {
            self.list.rollback(edit);
        }
    }
}

impl<T> Drop for RollbackGuard<'_, T>
where
    T: Identifiable + Clone + PartialEq + fmt::Debug,
{
    fn drop(&mut self) {
        self.restore();
    }
}
