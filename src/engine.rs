use crate::browser;
use anyhow::{anyhow, Error, Result};
// wasm is single threaded, so Rc RefCell over Mutex
use futures::channel::oneshot::{channel, Receiver};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{
    // unchecked_ref casts the closure to the js Function the setters expect;
    // we build the closures ourselves so the cast holds
    JsCast,
    JsValue,
};
use web_sys::{HtmlAudioElement, HtmlImageElement, WebGl2RenderingContext, WebGlTexture};

/// Success/error callbacks that resolve a oneshot channel exactly once,
/// whichever of the two the element fires first.
struct LoadSignal {
    on_success: Closure<dyn FnMut()>,
    on_error: Closure<dyn FnMut(JsValue)>,
    done: Receiver<Result<(), Error>>,
}

fn load_signal(what: &'static str, source: &str) -> LoadSignal {
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();
    let source = source.to_string();

    let on_success = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let on_error = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs] Error loading {} from {} : {:#?}",
                what,
                source,
                err
            )));
        }
    });

    LoadSignal {
        on_success,
        on_error,
        done: rx,
    }
}

impl LoadSignal {
    /// Wait for either callback. The signal must outlive the element's
    /// handlers: detach them before dropping it.
    async fn wait(&mut self) -> Result<()> {
        // Result<Result<(), Error>, oneshot::Canceled> : the first ? is the
        // channel, the second the load itself
        (&mut self.done).await??;
        Ok(())
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let mut signal = load_signal("image", source);

    image.set_onload(Some(signal.on_success.as_ref().unchecked_ref()));
    image.set_onerror(Some(signal.on_error.as_ref().unchecked_ref()));
    image.set_src(source);

    let result = signal.wait().await;
    image.set_onload(None);
    image.set_onerror(None);
    drop(signal);
    result?;

    Ok(image)
}

/// Asynchronously buffer an audio file until it can play through.
pub async fn load_audio(source: &str) -> Result<HtmlAudioElement> {
    let audio = browser::new_audio()?;
    let mut signal = load_signal("audio", source);

    audio.set_oncanplaythrough(Some(signal.on_success.as_ref().unchecked_ref()));
    audio.set_onerror(Some(signal.on_error.as_ref().unchecked_ref()));
    audio.set_preload("auto");
    audio.set_src(source);
    audio.load();

    let result = signal.wait().await;
    audio.set_oncanplaythrough(None);
    audio.set_onerror(None);
    drop(signal);
    result?;

    Ok(audio)
}

/// Upload a decoded image to a new 2D texture.
///
/// Clamped to edge with linear filtering, so non power of two sprite sheets
/// are valid textures.
pub fn upload_texture(
    gl: &WebGl2RenderingContext,
    image: &HtmlImageElement,
) -> Result<WebGlTexture> {
    const TARGET: u32 = WebGl2RenderingContext::TEXTURE_2D;

    let texture = gl
        .create_texture()
        .ok_or_else(|| anyhow!("Could not create texture"))?;
    gl.bind_texture(TARGET, Some(&texture));

    let uploaded = gl.tex_image_2d_with_u32_and_u32_and_html_image_element(
        TARGET,
        0,
        WebGl2RenderingContext::RGBA as i32,
        WebGl2RenderingContext::RGBA,
        WebGl2RenderingContext::UNSIGNED_BYTE,
        image,
    );
    if let Err(err) = uploaded {
        gl.bind_texture(TARGET, None);
        gl.delete_texture(Some(&texture));
        return Err(anyhow!("Could not upload {} to texture : {:#?}", image.src(), err));
    }

    let clamp = WebGl2RenderingContext::CLAMP_TO_EDGE as i32;
    let linear = WebGl2RenderingContext::LINEAR as i32;
    gl.tex_parameteri(TARGET, WebGl2RenderingContext::TEXTURE_WRAP_S, clamp);
    gl.tex_parameteri(TARGET, WebGl2RenderingContext::TEXTURE_WRAP_T, clamp);
    gl.tex_parameteri(TARGET, WebGl2RenderingContext::TEXTURE_MIN_FILTER, linear);
    gl.tex_parameteri(TARGET, WebGl2RenderingContext::TEXTURE_MAG_FILTER, linear);
    gl.bind_texture(TARGET, None);

    Ok(texture)
}
