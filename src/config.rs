use crate::browser;
use crate::resource::ResourceType;
use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

// ==================== Constants ====================
/// Manifest fetched by `main_js`, relative to the page.
pub const MANIFEST_PATH: &str = "resources.json";

#[cfg(debug_assertions)]
pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
#[cfg(not(debug_assertions))]
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

// ==================== Manifest ====================
/// List of resources to preload, e.g.
///
/// ```json
/// { "resources": [
///     { "type": "IMAGE", "source": "rhb.png", "alias": "boy" },
///     { "type": "AUDIO", "source": "jump.ogg" }
/// ] }
/// ```
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ResourceManifest {
    #[serde(default)]
    pub resources: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ManifestEntry {
    pub fn new(kind: ResourceType, source: impl Into<String>, alias: Option<&str>) -> Self {
        ManifestEntry {
            kind,
            source: source.into(),
            alias: alias.map(str::to_string),
        }
    }

    /// Cache key for this entry: the alias if given, the source otherwise.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.source)
    }
}

impl ResourceManifest {
    pub async fn fetch(path: &str) -> Result<Self> {
        browser::fetch_json::<ResourceManifest>(path)
            .await
            .with_context(|| format!("Failed to load resource manifest from : {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest: ResourceManifest = serde_json::from_str(
            r#"{ "resources": [
                { "type": "IMAGE", "source": "rhb.png", "alias": "boy" },
                { "type": "texture", "source": "Stone.png" },
                { "type": "AUDIO", "source": "jump.ogg" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(manifest.resources.len(), 3);
        assert_eq!(manifest.resources[0].alias(), "boy");
        assert_eq!(manifest.resources[1].kind, ResourceType::Texture);
        assert_eq!(manifest.resources[1].alias(), "Stone.png");
        assert_eq!(manifest.resources[2].kind, ResourceType::Audio);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = serde_json::from_str::<ResourceManifest>(
            r#"{ "resources": [ { "type": "SPRITE_SHEET", "source": "rhb.json" } ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported resource type"));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest: ResourceManifest = serde_json::from_str("{}").unwrap();
        assert!(manifest.resources.is_empty());
    }

    #[test]
    fn test_type_serializes_upper_case() {
        let entry = ManifestEntry::new(ResourceType::Texture, "BG.png", None);
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"type":"TEXTURE","source":"BG.png"}"#);
    }
}
