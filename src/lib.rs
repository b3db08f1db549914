// ==================== Imports ====================
use anyhow::Result;
use log::{error, info, warn};
use once_cell::unsync::OnceCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

mod browser;
pub mod config;
mod engine;
pub mod resource;
pub mod strategy;

pub use config::{ManifestEntry, ResourceManifest};
pub use resource::{
    LoadReport, LoadStrategy, Release, Resource, ResourceCache, ResourceError, ResourceLoader,
    ResourceType,
};
pub use strategy::Content;

// The page keeps one loader for its whole lifetime; the js exports below
// reach it through here.
thread_local! {
    static LOADER: OnceCell<ResourceLoader<Content>> = OnceCell::new();
}

fn loader() -> ResourceLoader<Content> {
    LOADER.with(|cell| {
        cell.get_or_init(|| {
            let gl = browser::webgl2_context()
                .map_err(|err| warn!("Textures unavailable : {:#}", err))
                .ok();
            strategy::browser_loader(gl)
        })
        .clone()
    })
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and console logger
/// - builds the resource loader on the canvas webgl2 context
/// - warms the cache with every resource listed in the manifest
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    browser::init_logging(config::LOG_LEVEL).map_err(|err| to_js_error(format!("{:#}", err)))?;

    browser::spawn_local(async move {
        if let Err(err) = preload_manifest().await {
            error!("{:#}", err);
        }
    });

    Ok(())
}

async fn preload_manifest() -> Result<()> {
    let loader = loader();
    let manifest = ResourceManifest::fetch(config::MANIFEST_PATH).await?;
    let report = loader.preload(&manifest).await;
    for (alias, err) in &report.failed {
        warn!("Could not preload '{}' : {}", alias, err);
    }
    info!(
        "Resources ready : {:.0}% ({} cached)",
        report.progress() * 100.0,
        loader.cached_count()
    );
    Ok(())
}

/// Load (or reuse) a resource and take one reference to it. Resolves to
/// the `<img>`, `WebGLTexture` or `<audio>` element; pair every call with
/// `release_resource`.
#[wasm_bindgen]
pub async fn load_resource(
    type_name: String,
    source: String,
    alias: Option<String>,
) -> Result<JsValue, JsValue> {
    loader()
        .load_resource_str(&type_name, &source, alias.as_deref())
        .await
        .map(JsValue::from)
        .map_err(to_js_error)
}

/// Drop one reference to the resource under `alias`; returns the references
/// left. Unknown aliases and extra releases only log a warning.
#[wasm_bindgen]
pub fn release_resource(alias: &str) -> Result<u32, JsValue> {
    let loader = loader();
    match loader.release_resource(alias) {
        Ok(remaining) => Ok(remaining),
        Err(err) if err.is_warning() => Ok(loader.ref_count(alias).unwrap_or(0)),
        Err(err) => Err(to_js_error(err)),
    }
}

#[wasm_bindgen]
pub fn is_resource_cached(alias: &str) -> bool {
    loader().is_cached(alias)
}

/// Unload every cached resource nobody holds; returns how many went.
#[wasm_bindgen]
pub fn purge_unused_resources() -> usize {
    loader().purge_unused()
}
