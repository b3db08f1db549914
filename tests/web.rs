//! Browser tests, run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;
use web_resource_cache::strategy::{AudioStrategy, ImageStrategy};
use web_resource_cache::{ResourceError, ResourceLoader, ResourceType};

wasm_bindgen_test_configure!(run_in_browser);

fn loader() -> ResourceLoader<web_resource_cache::Content> {
    ResourceLoader::builder()
        .with_strategy(ResourceType::Image, ImageStrategy)
        .with_strategy(ResourceType::Audio, AudioStrategy)
        .build()
}

#[wasm_bindgen_test]
async fn missing_image_fails_without_caching() {
    let loader = loader();

    let err = loader
        .load_resource(ResourceType::Image, "does-not-exist.png", None)
        .await
        .unwrap_err();

    match err {
        ResourceError::LoadFailed { path, .. } => assert_eq!(path, "does-not-exist.png"),
        other => panic!("Expected LoadFailed, got {:?}", other),
    }
    assert!(!loader.is_cached("does-not-exist.png"));
    assert!(!loader.is_loading("does-not-exist.png"));
}

#[wasm_bindgen_test]
async fn texture_without_strategy_is_unsupported() {
    let loader = loader();

    let err = loader
        .load_resource(ResourceType::Texture, "Stone.png", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ResourceError::UnsupportedResourceType("TEXTURE".to_string())
    );
}

#[wasm_bindgen_test]
fn release_of_unknown_alias_is_a_warning() {
    let loader = loader();
    let err = loader.release_resource("BG.png").unwrap_err();
    assert!(err.is_warning());
}

#[wasm_bindgen_test]
async fn missing_audio_fails_and_can_be_retried() {
    let loader = loader();

    for _ in 0..2 {
        let err = loader
            .load_resource(ResourceType::Audio, "does-not-exist.ogg", Some("jump"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::LoadFailed { .. }));
        assert!(!loader.is_loading("jump"));
    }
}

#[wasm_bindgen_test]
async fn exported_load_rejects_unknown_type() {
    let err = web_resource_cache::load_resource("SPRITE".to_string(), "rhb.png".to_string(), None)
        .await
        .unwrap_err();
    assert!(err
        .as_string()
        .unwrap_or_default()
        .contains("Unsupported resource type"));
    assert!(!web_resource_cache::is_resource_cached("rhb.png"));
}

#[wasm_bindgen_test]
async fn exported_load_failure_caches_nothing() {
    let result = web_resource_cache::load_resource(
        "IMAGE".to_string(),
        "does-not-exist.png".to_string(),
        Some("ghost".to_string()),
    )
    .await;

    assert!(result.is_err());
    assert!(!web_resource_cache::is_resource_cached("ghost"));
    assert_eq!(web_resource_cache::release_resource("ghost").unwrap(), 0);
    assert_eq!(web_resource_cache::purge_unused_resources(), 0);
}
