// ┌──────────────────────────────────────────────────────────────────────┐
// │                         Resource Lifetime                            │
// ├──────────────┬───────────────────────────────────────────────────────┤
// │ loader.rs    │ load_resource : strategy -> Resource -> cache (+1)    │
// │ cache.rs     │ acquire (+1) / release (-1), evict at zero            │
// │ loader.rs    │ release_resource : evicted content -> strategy.unload │
// └──────────────┴───────────────────────────────────────────────────────┘
pub mod cache;
pub mod error;
pub mod loader;

pub use cache::{CacheEntry, Release, ResourceCache};
pub use error::ResourceError;
pub use loader::{LoadReport, LoadStrategy, ResourceLoader, ResourceLoaderBuilder};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==================== Resource Type ====================
/// Closed set of resource kinds a loader can dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ResourceType {
    Image,
    Texture,
    Audio,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Image,
        ResourceType::Texture,
        ResourceType::Audio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Image => "IMAGE",
            ResourceType::Texture => "TEXTURE",
            ResourceType::Audio => "AUDIO",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceType {
    type Err = ResourceError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ResourceError::UnsupportedResourceType(name.to_string()))
    }
}

impl TryFrom<String> for ResourceType {
    type Error = ResourceError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

// ==================== Resource ====================
/// One loaded asset.
///
/// Built once its content has finished loading and owned by the cache entry
/// that holds it. Only the `loaded` flag ever changes afterwards: it drops
/// to `false` when the entry is evicted, right before the content goes back
/// to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource<C> {
    kind: ResourceType,
    content: C,
    source: String,
    alias: String,
    loaded: bool,
}

impl<C> Resource<C> {
    pub fn new(
        kind: ResourceType,
        content: C,
        source: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Resource {
            kind,
            content,
            source: source.into(),
            alias: alias.into(),
            loaded: true,
        }
    }

    /// Same as [`Resource::new`] with the alias defaulting to the source.
    pub fn from_source(kind: ResourceType, content: C, source: impl Into<String>) -> Self {
        let source = source.into();
        let alias = source.clone();
        Resource::new(kind, content, source, alias)
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn into_content(self) -> C {
        self.content
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub(crate) fn mark_unloaded(&mut self) {
        self.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_names() {
        assert_eq!("IMAGE".parse::<ResourceType>(), Ok(ResourceType::Image));
        assert_eq!("texture".parse::<ResourceType>(), Ok(ResourceType::Texture));
        assert_eq!(" Audio ".parse::<ResourceType>(), Ok(ResourceType::Audio));
    }

    #[test]
    fn test_parse_unknown_type() {
        assert_eq!(
            "SPRITE_SHEET".parse::<ResourceType>(),
            Err(ResourceError::UnsupportedResourceType(
                "SPRITE_SHEET".to_string()
            ))
        );
    }

    #[test]
    fn test_alias_defaults_to_source() {
        let resource = Resource::from_source(ResourceType::Image, 7u32, "rhb.png");
        assert_eq!(resource.alias(), "rhb.png");
        assert_eq!(resource.source(), "rhb.png");
        assert!(resource.is_loaded());
    }

    #[test]
    fn test_display_matches_name() {
        for kind in ResourceType::ALL {
            assert_eq!(kind.to_string(), kind.name());
        }
    }
}
