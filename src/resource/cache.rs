use super::{Resource, ResourceError};
use log::{debug, warn};
use std::collections::HashMap;

/// A cached resource and the number of holders currently using it.
#[derive(Debug)]
pub struct CacheEntry<C> {
    resource: Resource<C>,
    ref_count: u32,
}

impl<C> CacheEntry<C> {
    pub fn resource(&self) -> &Resource<C> {
        &self.resource
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    fn into_evicted(mut self) -> Resource<C> {
        self.resource.mark_unloaded();
        self.resource
    }
}

/// Outcome of a successful [`ResourceCache::release`].
#[derive(Debug, PartialEq)]
pub enum Release<C> {
    /// Other holders remain.
    Retained { ref_count: u32 },
    /// The last holder let go. The entry is gone and the caller owns the
    /// resource, so it is the caller's job to hand the content back to the
    /// host (free a GPU texture, stop audio, ...).
    Evicted(Resource<C>),
}

/// Key -> (resource, ref count) store.
///
/// Single-threaded: every mutation takes `&mut self`. Warning-class failures
/// are logged here and returned so callers can still react to them; none of
/// them touch the stored entries.
#[derive(Debug)]
pub struct ResourceCache<C> {
    entries: HashMap<String, CacheEntry<C>>,
}

impl<C> Default for ResourceCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ResourceCache<C> {
    pub fn new() -> Self {
        ResourceCache {
            entries: HashMap::new(),
        }
    }

    /// Insert `resource` under `key` with nobody holding it yet.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        resource: Resource<C>,
    ) -> Result<(), ResourceError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            warn!("Resource already cached, ignoring add : {}", key);
            return Err(ResourceError::AlreadyCached(key));
        }
        debug!("Caching {} resource : {}", resource.kind(), key);
        self.entries.insert(
            key,
            CacheEntry {
                resource,
                ref_count: 0,
            },
        );
        Ok(())
    }

    /// Take one reference to the resource under `key`.
    pub fn acquire(&mut self, key: &str) -> Option<&Resource<C>> {
        let entry = self.entries.get_mut(key)?;
        entry.ref_count += 1;
        Some(&entry.resource)
    }

    /// Drop one reference to the resource under `key`, evicting it when the
    /// count reaches zero.
    pub fn release(&mut self, key: &str) -> Result<Release<C>, ResourceError> {
        let Some(entry) = self.entries.get_mut(key) else {
            warn!("Release of unknown resource : {}", key);
            return Err(ResourceError::NotFound(key.to_string()));
        };

        match entry.ref_count {
            0 => {
                warn!("Release of resource with no holders : {}", key);
                Err(ResourceError::DoubleRelease(key.to_string()))
            }
            1 => {
                debug!("Evicting resource : {}", key);
                // just matched the key above
                let entry = self
                    .entries
                    .remove(key)
                    .ok_or_else(|| ResourceError::NotFound(key.to_string()))?;
                Ok(Release::Evicted(entry.into_evicted()))
            }
            _ => {
                entry.ref_count -= 1;
                Ok(Release::Retained {
                    ref_count: entry.ref_count,
                })
            }
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look at a resource without taking a reference.
    pub fn get(&self, key: &str) -> Option<&Resource<C>> {
        self.entries.get(key).map(CacheEntry::resource)
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<C>> {
        self.entries.get(key)
    }

    pub fn ref_count(&self, key: &str) -> Option<u32> {
        self.entries.get(key).map(CacheEntry::ref_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Evict every entry nobody holds and hand the resources back.
    pub fn purge_unused(&mut self) -> Vec<Resource<C>> {
        let unused: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.ref_count == 0)
            .map(|(key, _)| key.clone())
            .collect();

        unused
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .map(CacheEntry::into_evicted)
            .collect()
    }

    /// Evict everything, holders or not.
    pub fn drain(&mut self) -> Vec<Resource<C>> {
        self.entries
            .drain()
            .map(|(_, entry)| entry.into_evicted())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    fn image(source: &str) -> Resource<String> {
        Resource::from_source(ResourceType::Image, format!("pixels:{}", source), source)
    }

    #[test]
    fn test_acquire_after_add_returns_resource() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();

        for expected in 1..=3 {
            let resource = cache.acquire("a").unwrap();
            assert_eq!(resource.content(), "pixels:a.png");
            assert_eq!(cache.ref_count("a"), Some(expected));
        }
    }

    #[test]
    fn test_acquire_missing_key() {
        let mut cache: ResourceCache<String> = ResourceCache::new();
        assert!(cache.acquire("missing").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_add_existing_key_is_noop() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();
        cache.acquire("a");

        let err = cache.add("a", image("other.png")).unwrap_err();
        assert_eq!(err, ResourceError::AlreadyCached("a".to_string()));
        assert_eq!(cache.get("a").unwrap().source(), "a.png");
        assert_eq!(cache.ref_count("a"), Some(1));
    }

    #[test]
    fn test_acquire_release_scenario() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();

        assert_eq!(cache.acquire("a").unwrap().source(), "a.png");
        assert_eq!(cache.ref_count("a"), Some(1));
        assert_eq!(cache.acquire("a").unwrap().source(), "a.png");
        assert_eq!(cache.ref_count("a"), Some(2));

        assert_eq!(cache.release("a"), Ok(Release::Retained { ref_count: 1 }));
        assert!(cache.has("a"));

        match cache.release("a") {
            Ok(Release::Evicted(resource)) => {
                assert_eq!(resource.alias(), "a.png");
                assert!(!resource.is_loaded());
            }
            other => panic!("Expected eviction, got {:?}", other),
        }
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_n_acquires_n_releases_evicts() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();

        let n = 5;
        for _ in 0..n {
            cache.acquire("a");
        }
        for _ in 0..n - 1 {
            assert!(matches!(cache.release("a"), Ok(Release::Retained { .. })));
        }
        assert!(matches!(cache.release("a"), Ok(Release::Evicted(_))));
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_release_missing_key_leaves_state() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();
        cache.acquire("a");

        assert_eq!(
            cache.release("nope"),
            Err(ResourceError::NotFound("nope".to_string()))
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.ref_count("a"), Some(1));
    }

    #[test]
    fn test_release_without_holders() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();

        assert_eq!(
            cache.release("a"),
            Err(ResourceError::DoubleRelease("a".to_string()))
        );
        assert!(cache.has("a"));
        assert_eq!(cache.ref_count("a"), Some(0));
    }

    #[test]
    fn test_purge_unused_keeps_held_entries() {
        let mut cache = ResourceCache::new();
        cache.add("held", image("held.png")).unwrap();
        cache.add("idle", image("idle.png")).unwrap();
        cache.acquire("held");

        let purged = cache.purge_unused();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].source(), "idle.png");
        assert!(cache.has("held"));
        assert!(!cache.has("idle"));
    }

    #[test]
    fn test_drain_empties_cache() {
        let mut cache = ResourceCache::new();
        cache.add("a", image("a.png")).unwrap();
        cache.add("b", image("b.png")).unwrap();
        cache.acquire("a");

        let drained = cache.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained.iter().all(|resource| !resource.is_loaded()));
        assert!(cache.is_empty());
    }
}
