use crate::engine;
use crate::resource::{LoadStrategy, ResourceLoader, ResourceType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use wasm_bindgen::JsValue;
use web_sys::{HtmlAudioElement, HtmlImageElement, WebGl2RenderingContext, WebGlTexture};

/// Content handle of a browser resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Image(HtmlImageElement),
    Texture(WebGlTexture),
    Audio(HtmlAudioElement),
}

impl Content {
    pub fn as_image(&self) -> Option<&HtmlImageElement> {
        match self {
            Content::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&WebGlTexture> {
        match self {
            Content::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&HtmlAudioElement> {
        match self {
            Content::Audio(audio) => Some(audio),
            _ => None,
        }
    }
}

impl From<Content> for JsValue {
    fn from(content: Content) -> Self {
        match content {
            Content::Image(image) => image.into(),
            Content::Texture(texture) => texture.into(),
            Content::Audio(audio) => audio.into(),
        }
    }
}

/// Decoded `<img>`, drawable on a 2d canvas. Dropping the element is all the
/// cleanup it needs.
pub struct ImageStrategy;

#[async_trait(?Send)]
impl LoadStrategy<Content> for ImageStrategy {
    async fn load(&self, source: &str) -> Result<Content> {
        engine::load_image(source)
            .await
            .map(Content::Image)
            .with_context(|| format!("Failed to load image resource from : {}", source))
    }
}

/// Image uploaded to a GPU texture. The texture is deleted on unload.
pub struct TextureStrategy {
    gl: WebGl2RenderingContext,
}

impl TextureStrategy {
    pub fn new(gl: WebGl2RenderingContext) -> Self {
        TextureStrategy { gl }
    }
}

#[async_trait(?Send)]
impl LoadStrategy<Content> for TextureStrategy {
    async fn load(&self, source: &str) -> Result<Content> {
        let image = engine::load_image(source)
            .await
            .with_context(|| format!("Failed to load texture image from : {}", source))?;
        engine::upload_texture(&self.gl, &image).map(Content::Texture)
    }

    fn unload(&self, content: &Content) {
        if let Some(texture) = content.as_texture() {
            self.gl.delete_texture(Some(texture));
        }
    }
}

/// Buffered `<audio>`. Unloading stops playback and drops the buffered data.
pub struct AudioStrategy;

#[async_trait(?Send)]
impl LoadStrategy<Content> for AudioStrategy {
    async fn load(&self, source: &str) -> Result<Content> {
        engine::load_audio(source)
            .await
            .map(Content::Audio)
            .with_context(|| format!("Failed to load audio resource from : {}", source))
    }

    fn unload(&self, content: &Content) {
        if let Some(audio) = content.as_audio() {
            let _ = audio.pause();
            let _ = audio.remove_attribute("src");
            // reload with no src to release the buffered data
            audio.load();
        }
    }
}

/// Loader wired with the browser strategies. Textures need a WebGL2
/// context; without one only images and audio are supported.
pub fn browser_loader(gl: Option<WebGl2RenderingContext>) -> ResourceLoader<Content> {
    let builder = ResourceLoader::builder()
        .with_strategy(ResourceType::Image, ImageStrategy)
        .with_strategy(ResourceType::Audio, AudioStrategy);
    let builder = match gl {
        Some(gl) => builder.with_strategy(ResourceType::Texture, TextureStrategy::new(gl)),
        None => builder,
    };
    builder.build()
}
