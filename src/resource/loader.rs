use super::{Release, Resource, ResourceCache, ResourceError, ResourceType};
use crate::config::ResourceManifest;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::{join_all, LocalBoxFuture, Shared};
use futures::FutureExt;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

// ==================== Strategy ====================
/// Loads the content of one resource type from a source path/url.
///
/// `?Send` because content handles are JS objects living on the single
/// browser thread.
#[async_trait(?Send)]
pub trait LoadStrategy<C> {
    async fn load(&self, source: &str) -> Result<C>;

    /// Hand content back to the host once its cache entry is gone.
    fn unload(&self, _content: &C) {}
}

/// Fixed type -> strategy table, filled in by the builder.
struct Strategies<C> {
    image: Option<Rc<dyn LoadStrategy<C>>>,
    texture: Option<Rc<dyn LoadStrategy<C>>>,
    audio: Option<Rc<dyn LoadStrategy<C>>>,
}

impl<C> Strategies<C> {
    fn slot(&mut self, kind: ResourceType) -> &mut Option<Rc<dyn LoadStrategy<C>>> {
        match kind {
            ResourceType::Image => &mut self.image,
            ResourceType::Texture => &mut self.texture,
            ResourceType::Audio => &mut self.audio,
        }
    }

    fn get(&self, kind: ResourceType) -> Option<&Rc<dyn LoadStrategy<C>>> {
        match kind {
            ResourceType::Image => self.image.as_ref(),
            ResourceType::Texture => self.texture.as_ref(),
            ResourceType::Audio => self.audio.as_ref(),
        }
    }
}

pub struct ResourceLoaderBuilder<C> {
    strategies: Strategies<C>,
}

impl<C: Clone + 'static> ResourceLoaderBuilder<C> {
    /// Register `strategy` for `kind`, replacing any earlier one.
    pub fn with_strategy(
        mut self,
        kind: ResourceType,
        strategy: impl LoadStrategy<C> + 'static,
    ) -> Self {
        let strategy: Rc<dyn LoadStrategy<C>> = Rc::new(strategy);
        *self.strategies.slot(kind) = Some(strategy);
        self
    }

    pub fn build(self) -> ResourceLoader<C> {
        ResourceLoader {
            strategies: Rc::new(self.strategies),
            state: Rc::new(RefCell::new(LoaderState {
                cache: ResourceCache::new(),
                in_flight: HashMap::new(),
            })),
        }
    }
}

// ==================== Loader ====================
type SharedLoad<C> = Shared<LocalBoxFuture<'static, Result<C, ResourceError>>>;

/// A load that has started but not finished yet.
struct InFlight<C> {
    kind: ResourceType,
    load: SharedLoad<C>,
}

struct LoaderState<C> {
    cache: ResourceCache<C>,
    in_flight: HashMap<String, InFlight<C>>,
}

/// Loads resources through per-type strategies and keeps them in a
/// ref-counted cache.
///
/// Cloning is cheap and every clone shares the same cache, so a clone can be
/// moved into a `spawn_local` task.
///
/// ```text
/// load_resource(type, source, alias)
///   ├─ cached under alias ──────► acquire, return content
///   ├─ in flight under alias ───► wait on the same load
///   └─ otherwise ───────────────► strategy.load(source) once
///                                   ├─ Ok  -> cache unheld, then each waiter
///                                   │         still around acquires
///                                   └─ Err -> LoadFailed to every waiter
/// ```
///
/// A caller only counts as a holder once it has the content: a
/// `load_resource` future dropped before completing holds nothing.
pub struct ResourceLoader<C> {
    strategies: Rc<Strategies<C>>,
    state: Rc<RefCell<LoaderState<C>>>,
}

impl<C> Clone for ResourceLoader<C> {
    fn clone(&self) -> Self {
        ResourceLoader {
            strategies: Rc::clone(&self.strategies),
            state: Rc::clone(&self.state),
        }
    }
}

impl<C: Clone + 'static> ResourceLoader<C> {
    pub fn builder() -> ResourceLoaderBuilder<C> {
        ResourceLoaderBuilder {
            strategies: Strategies {
                image: None,
                texture: None,
                audio: None,
            },
        }
    }

    pub fn supports(&self, kind: ResourceType) -> bool {
        self.strategies.get(kind).is_some()
    }

    /// Load (or reuse) the resource under `alias`, which defaults to
    /// `source`, and take one reference to it.
    pub async fn load_resource(
        &self,
        kind: ResourceType,
        source: &str,
        alias: Option<&str>,
    ) -> Result<C, ResourceError> {
        self.load_entry(kind, source, alias.unwrap_or(source), true)
            .await
    }

    /// Make sure the resource under `alias` is cached without taking a
    /// reference to it. Unheld entries go away with
    /// [`ResourceLoader::purge_unused`].
    pub async fn warm(
        &self,
        kind: ResourceType,
        source: &str,
        alias: Option<&str>,
    ) -> Result<C, ResourceError> {
        self.load_entry(kind, source, alias.unwrap_or(source), false)
            .await
    }

    async fn load_entry(
        &self,
        kind: ResourceType,
        source: &str,
        alias: &str,
        hold: bool,
    ) -> Result<C, ResourceError> {
        let strategy = self
            .strategies
            .get(kind)
            .cloned()
            .ok_or_else(|| ResourceError::UnsupportedResourceType(kind.to_string()))?;

        // no borrow may be held across the await below: the load itself
        // needs the state when it completes
        let load = {
            let mut state = self.state.borrow_mut();
            let cached = if hold {
                state.cache.acquire(alias)
            } else {
                state.cache.get(alias)
            };
            if let Some(resource) = cached {
                if resource.kind() != kind {
                    warn!(
                        "Requested {} under '{}' but a {} is cached there, returning it",
                        kind,
                        alias,
                        resource.kind()
                    );
                }
                debug!("Cache hit : {}", alias);
                return Ok(resource.content().clone());
            }

            match state.in_flight.get(alias) {
                Some(in_flight) => {
                    if in_flight.kind != kind {
                        warn!(
                            "Requested {} under '{}' while a {} load is in flight, joining it",
                            kind, alias, in_flight.kind
                        );
                    }
                    debug!("Joining in-flight load : {}", alias);
                    in_flight.load.clone()
                }
                None => {
                    let load = Self::start_load(
                        Rc::downgrade(&self.state),
                        strategy,
                        kind,
                        source.to_string(),
                        alias.to_string(),
                    );
                    state.in_flight.insert(
                        alias.to_string(),
                        InFlight {
                            kind,
                            load: load.clone(),
                        },
                    );
                    load
                }
            }
        };

        let content = load.await?;
        if !hold {
            return Ok(content);
        }

        let mut state = self.state.borrow_mut();
        match state.cache.acquire(alias) {
            Some(resource) => Ok(resource.content().clone()),
            // purged or cleared between the load finishing and this caller
            // resuming; the content may already be unloaded
            None => Err(ResourceError::LoadFailed {
                path: source.to_string(),
                reason: format!("'{}' was evicted before it could be acquired", alias),
            }),
        }
    }

    /// [`ResourceLoader::load_resource`] with the type given by name, as it
    /// comes from JS or a manifest.
    pub async fn load_resource_str(
        &self,
        type_name: &str,
        source: &str,
        alias: Option<&str>,
    ) -> Result<C, ResourceError> {
        let kind: ResourceType = type_name.parse()?;
        self.load_resource(kind, source, alias).await
    }

    fn start_load(
        state: Weak<RefCell<LoaderState<C>>>,
        strategy: Rc<dyn LoadStrategy<C>>,
        kind: ResourceType,
        source: String,
        alias: String,
    ) -> SharedLoad<C> {
        async move {
            debug!("Loading {} resource : {}", kind, source);
            let result = strategy
                .load(&source)
                .await
                .map_err(|err| ResourceError::LoadFailed {
                    path: source.clone(),
                    reason: format!("{:#}", err),
                });

            // loader dropped while loading, nothing left to register with
            let Some(shared_state) = state.upgrade() else {
                return result;
            };
            let mut shared_state = shared_state.borrow_mut();
            shared_state.in_flight.remove(&alias);

            match result {
                Ok(content) => {
                    info!("Loaded {} resource : {} as '{}'", kind, source, alias);
                    let resource = Resource::new(kind, content.clone(), source, alias.clone());
                    // AlreadyCached is logged by the cache
                    let _ = shared_state.cache.add(alias, resource);
                    Ok(content)
                }
                Err(err) => {
                    warn!("{}", err);
                    Err(err)
                }
            }
        }
        .boxed_local()
        .shared()
    }

    /// Drop one reference to `alias`. When it was the last one the entry is
    /// evicted and its content is unloaded through the strategy that loaded
    /// it. Returns the references still held.
    ///
    /// `NotFound` and `DoubleRelease` are logged by the cache and leave it
    /// untouched.
    pub fn release_resource(&self, alias: &str) -> Result<u32, ResourceError> {
        let released = self.state.borrow_mut().cache.release(alias)?;
        match released {
            Release::Retained { ref_count } => Ok(ref_count),
            Release::Evicted(resource) => {
                self.unload(&resource);
                Ok(0)
            }
        }
    }

    fn unload(&self, resource: &Resource<C>) {
        debug!("Unloading {} resource : {}", resource.kind(), resource.alias());
        if let Some(strategy) = self.strategies.get(resource.kind()) {
            strategy.unload(resource.content());
        }
    }

    pub fn is_cached(&self, alias: &str) -> bool {
        self.state.borrow().cache.has(alias)
    }

    pub fn is_loading(&self, alias: &str) -> bool {
        self.state.borrow().in_flight.contains_key(alias)
    }

    pub fn ref_count(&self, alias: &str) -> Option<u32> {
        self.state.borrow().cache.ref_count(alias)
    }

    /// Cached content under `alias` without taking a reference.
    pub fn get(&self, alias: &str) -> Option<C> {
        self.state
            .borrow()
            .cache
            .get(alias)
            .map(|resource| resource.content().clone())
    }

    pub fn cached_count(&self) -> usize {
        self.state.borrow().cache.len()
    }

    /// Unload every cached resource nobody holds. Returns how many went.
    pub fn purge_unused(&self) -> usize {
        let purged = self.state.borrow_mut().cache.purge_unused();
        for resource in &purged {
            self.unload(resource);
        }
        purged.len()
    }

    /// Unload everything, whether held or not.
    pub fn clear(&self) {
        let drained = self.state.borrow_mut().cache.drain();
        info!("Clearing {} cached resources", drained.len());
        for resource in &drained {
            self.unload(resource);
        }
    }

    /// Warm the cache with every manifest entry, concurrently and without
    /// taking references. A failing entry does not stop the others; it ends
    /// up in the report instead.
    pub async fn preload(&self, manifest: &ResourceManifest) -> LoadReport {
        let loads = manifest.resources.iter().map(|entry| async move {
            let alias = entry.alias().to_string();
            let result = self
                .warm(entry.kind, &entry.source, Some(&alias))
                .await;
            (alias, result)
        });

        let mut report = LoadReport::default();
        for (alias, result) in join_all(loads).await {
            match result {
                Ok(_) => report.loaded.push(alias),
                Err(err) => report.failed.push((alias, err)),
            }
        }
        info!(
            "Preloaded {}/{} resources",
            report.loaded.len(),
            report.total()
        );
        report
    }
}

// ==================== Report ====================
/// Outcome of [`ResourceLoader::preload`].
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, ResourceError)>,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.loaded.len() + self.failed.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Share of entries that loaded, 0.0 - 1.0. An empty report counts as
    /// fully loaded.
    pub fn progress(&self) -> f32 {
        match self.total() {
            0 => 1.0,
            total => self.loaded.len() as f32 / total as f32,
        }
    }
}
