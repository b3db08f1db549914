use anyhow::{anyhow, Result};
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::de::DeserializeOwned;
use std::future::Future;
use wasm_bindgen::closure::{Closure, WasmClosureFnOnce};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

#[rustfmt::skip]
use web_sys::{
    console,
    Document,
    Window,
    HtmlAudioElement,
    HtmlCanvasElement,
    HtmlImageElement,
    Response,
    WebGl2RenderingContext,
};

// ==================== Constants ====================
// Constants related to HTML elements
mod html {
    pub const CANVAS_ID: &str = "canvas";
    pub const CONTEXT_WEBGL2: &str = "webgl2";
}

// ==================== Elements ====================
pub fn new_image() -> Result<HtmlImageElement> {
    HtmlImageElement::new().map_err(|err| anyhow!("Could not create image element : {:#?}", err))
}

pub fn new_audio() -> Result<HtmlAudioElement> {
    HtmlAudioElement::new().map_err(|err| anyhow!("Could not create audio element : {:#?}", err))
}

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| anyhow!("Window not found"))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| anyhow!("No Document Found"))
}

pub fn canvas() -> Result<HtmlCanvasElement> {
    document()?
        .get_element_by_id(html::CANVAS_ID)
        .ok_or_else(|| anyhow!("No Canvas Element found with ID : '{:#?}'", html::CANVAS_ID))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|element| anyhow!("Error converting {:#?} to HtmlCanvasElement", element))
}

/// WebGL2 context of the page canvas, used to upload textures.
pub fn webgl2_context() -> Result<WebGl2RenderingContext> {
    canvas()?
        .get_context(html::CONTEXT_WEBGL2)
        // Result<Option<Object>, JsValue> : map the JsValue error, then the
        // missing context, then cast the Object
        .map_err(|js_value| anyhow!("Error getting webgl2 context : {:#?}", js_value))?
        .ok_or_else(|| anyhow!("No webgl2 context found"))?
        .dyn_into::<WebGl2RenderingContext>()
        .map_err(|element| {
            anyhow!(
                "Error converting {:#?} to WebGl2RenderingContext",
                element
            )
        })
}

// ==================== Async ====================
pub fn closure_once<F, A, R>(f: F) -> Closure<F::FnMut>
where
    F: 'static + WasmClosureFnOnce<A, R>,
{
    Closure::once(f)
}

pub fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn fetch_json<T>(json_path: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let resp_value = fetch_with_str(json_path).await?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|element| anyhow!("error converting [{:#?}] to Response", element))?;
    if !resp.ok() {
        return Err(anyhow!("HTTP {} fetching : {}", resp.status(), json_path));
    }
    let json = resp
        .json()
        .map_err(|err| anyhow!("Could not get JSON from response [{:#?}]", err))?;

    let json_value = JsFuture::from(json)
        .await
        .map_err(|err| anyhow!("error fetching [{:#?}]", err))?;

    serde_wasm_bindgen::from_value(json_value)
        .map_err(|err| anyhow!("error converting response : {:#?}", err))
}

async fn fetch_with_str(resource: &str) -> Result<JsValue> {
    let resp = window()?.fetch_with_str(resource);

    JsFuture::from(resp)
        .await
        .map_err(|err| anyhow!("error fetching : {:#?}", err))
}

// ==================== Logging ====================
/// Routes `log` records to the browser console at the matching level.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => console::error_1(&message),
            Level::Warn => console::warn_1(&message),
            Level::Info => console::info_1(&message),
            Level::Debug => console::debug_1(&message),
            Level::Trace => console::log_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console logger. Fails if a logger is already installed.
pub fn init_logging(level: LevelFilter) -> Result<()> {
    log::set_logger(&LOGGER).map_err(|err| anyhow!("Could not install console logger : {}", err))?;
    log::set_max_level(level);
    Ok(())
}
