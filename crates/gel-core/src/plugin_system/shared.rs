//! Name-keyed registry of live service objects.
//!
//! Plugins publish singletons here (the settings store, the player, the main
//! window...) for other plugins to look up by name. Values are reference
//! counted, so a consumer that still holds one after the key is removed keeps
//! it alive; [`SharedRegistry::unregister`] warns when that happens.
//!
//! What a plugin publishes is remembered weakly even after removal. A value
//! built by a dynamic module drops through code in that module, so the
//! engine asks [`SharedRegistry::held_elsewhere`] before closing it.
//!
//! Two ways in and out:
//! - [`SharedRegistry::set`] / [`SharedRegistry::unregister`]: the plain
//!   associative store, anyone may remove any key.
//! - [`SharedRegistry::publish`] / [`SharedRegistry::revoke`]: the publisher
//!   keeps a [`SharedHandle`] and only that handle can revoke the entry it
//!   created.
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

pub type SharedValue = Arc<dyn Any + Send + Sync>;

struct SharedEntry {
    value: SharedValue,
    owner: Option<String>,
    generation: u64,
}

/// Proof of publication, handed to the publisher only.
#[must_use = "dropping the handle makes the entry impossible to revoke by its owner"]
#[derive(Debug, PartialEq, Eq)]
pub struct SharedHandle {
    key: String,
    generation: u64,
}

impl SharedHandle {
    pub fn key(&self) -> &str {
        &self.key
    }
}

struct Published {
    owner: String,
    key: String,
    value: Weak<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct SharedRegistry {
    entries: BTreeMap<String, SharedEntry>,
    /// Everything published by a plugin, registered or not
    published: Vec<Published>,
    next_generation: u64,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`. Returns `false` and leaves the registry
    /// untouched when the key is already taken.
    pub fn set(&mut self, key: &str, value: SharedValue, owner: Option<&str>) -> bool {
        self.insert(key, value, owner).is_some()
    }

    /// Like [`set`](Self::set) for a typed value, returning the handle that revokes it.
    pub fn publish<T: Any + Send + Sync>(&mut self, key: &str, value: Arc<T>, owner: Option<&str>) -> Option<SharedHandle> {
        self.insert(key, value, owner)
    }

    fn insert(&mut self, key: &str, value: SharedValue, owner: Option<&str>) -> Option<SharedHandle> {
        if self.entries.contains_key(key) {
            log::warn!("Shared object '{}' is already registered", key);
            return None;
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        self.published.retain(|p| p.value.strong_count() > 0);
        if let Some(owner) = owner {
            self.published.push(Published {
                owner: owner.to_string(),
                key: key.to_string(),
                value: Arc::downgrade(&value),
            });
        }
        self.entries.insert(
            key.to_string(),
            SharedEntry {
                value,
                owner: owner.map(String::from),
                generation,
            },
        );
        log::debug!("Shared object '{}' registered{}", key, owner.map(|o| format!(" by '{o}'")).unwrap_or_default());
        Some(SharedHandle {
            key: key.to_string(),
            generation,
        })
    }

    pub fn get(&self, key: &str) -> Option<SharedValue> {
        self.entries.get(key).map(|entry| Arc::clone(&entry.value))
    }

    /// Typed lookup; `None` when absent or of another type
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key).and_then(|value| value.downcast::<T>().ok())
    }

    /// Removes `key` whoever published it. Returns the removed value.
    pub fn unregister(&mut self, key: &str) -> Option<SharedValue> {
        let entry = self.entries.remove(key)?;
        let outstanding = Arc::strong_count(&entry.value) - 1;
        if outstanding > 0 {
            log::warn!(
                "Shared object '{}' unregistered with {} outstanding reference(s)",
                key, outstanding
            );
        }
        Some(entry.value)
    }

    /// Removes the entry `handle` was issued for. Returns `None` when that
    /// entry is already gone, even if the key was registered again since.
    pub fn revoke(&mut self, handle: SharedHandle) -> Option<SharedValue> {
        match self.entries.get(&handle.key) {
            Some(entry) if entry.generation == handle.generation => self.unregister(&handle.key),
            _ => {
                log::debug!("Shared object '{}' was already removed", handle.key);
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn owner_of(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|entry| entry.owner.as_deref())
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn keys_owned_by(&self, owner: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.owner.as_deref() == Some(owner))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Keys of values published by `owner` that something outside the
    /// registry still references, whether or not they are still registered
    pub fn held_elsewhere(&self, owner: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .published
            .iter()
            .filter(|p| p.owner == owner)
            .filter(|p| {
                let registered = self
                    .entries
                    .get(&p.key)
                    .is_some_and(|entry| Weak::ptr_eq(&p.value, &Arc::downgrade(&entry.value)));
                p.value.strong_count() > usize::from(registered)
            })
            .map(|p| p.key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Drops the publication records of `owner`
    pub(crate) fn forget_owner(&mut self, owner: &str) {
        self.published.retain(|p| p.owner != owner);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
