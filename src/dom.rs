//! Browser side of the loader: capability checks, the intersection watcher,
//! the polyfill script and canvas work.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use js_sys::{Array, Reflect};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, HtmlScriptElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

use crate::error::{LazyError, ThumbnailError};
use crate::fit::Size;
use crate::machine::Environment;
use crate::network::EffectiveType;
use crate::options::BlurUp;
use crate::thumbnail::{thumbnail_dimensions, THUMBNAIL_QUALITY};

fn js_error(value: JsValue) -> LazyError {
    LazyError::Dom(format!("{value:?}"))
}

fn document() -> Result<Document, LazyError> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| LazyError::Dom("no document".into()))
}

fn create<T: JsCast>(document: &Document, tag: &str) -> Result<T, LazyError> {
    document
        .create_element(tag)
        .map_err(js_error)?
        .dyn_into::<T>()
        .map_err(|_| LazyError::Dom(format!("<{tag}> has an unexpected type")))
}

/// The running browser window.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserEnv;

impl Environment for BrowserEnv {
    fn now(&self) -> f64 {
        web_sys::window()
            .and_then(|window| window.performance())
            .map(|performance| performance.now())
            .unwrap_or(0.0)
    }

    fn effective_type(&self) -> Option<EffectiveType> {
        let navigator = web_sys::window()?.navigator();
        let connection = Reflect::get(&navigator, &JsValue::from_str("connection")).ok()?;
        if connection.is_undefined() || connection.is_null() {
            return None;
        }
        Reflect::get(&connection, &JsValue::from_str("effectiveType"))
            .ok()?
            .as_string()?
            .parse()
            .ok()
    }

    fn supports_intersection(&self) -> bool {
        web_sys::window()
            .map(|window| {
                Reflect::has(&window, &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
            })
            .unwrap_or(false)
    }
}

/// An `IntersectionObserver` on a single element. Dropping it disconnects.
pub struct Watcher {
    observer: IntersectionObserver,
    _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

impl Watcher {
    pub fn observe(
        element: &Element,
        root_margin: &str,
        threshold: f64,
        mut on_entry: impl FnMut(bool, f64) + 'static,
    ) -> Result<Self, LazyError> {
        let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                for entry in entries.iter() {
                    let entry: IntersectionObserverEntry = entry.unchecked_into();
                    on_entry(entry.is_intersecting(), entry.intersection_ratio());
                }
            },
        );

        let init = IntersectionObserverInit::new();
        init.set_root_margin(root_margin);
        init.set_threshold(&JsValue::from_f64(threshold));

        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)
                .map_err(js_error)?;
        observer.observe(element);

        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    /// Stops delivery without freeing the callback, which may be on the stack.
    pub fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

/// Installs load/error handlers on `element`, runs `start` and waits for
/// whichever fires first.
async fn wait_for_load(element: &HtmlElement, start: impl FnOnce()) -> Result<(), LazyError> {
    let (tx, rx) = oneshot::channel::<bool>();
    let tx = Rc::new(RefCell::new(Some(tx)));
    let settle = |outcome: bool| {
        let tx = tx.clone();
        Closure::<dyn FnMut()>::new(move || {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(outcome);
            }
        })
    };
    let on_load = settle(true);
    let on_error = settle(false);

    element.set_onload(Some(on_load.as_ref().unchecked_ref()));
    element.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    start();

    let loaded = rx.await.unwrap_or(false);
    element.set_onload(None);
    element.set_onerror(None);

    if loaded {
        Ok(())
    } else {
        Err(LazyError::Dom("resource failed to load".into()))
    }
}

/// Injects the IntersectionObserver polyfill script from `url` and waits for it.
pub async fn load_polyfill(url: &str) -> Result<(), LazyError> {
    let document = document()?;
    let head = document
        .head()
        .ok_or_else(|| LazyError::PolyfillUnavailable("document has no <head>".into()))?;
    let script: HtmlScriptElement = create(&document, "script")?;

    wait_for_load(&script, || {
        script.set_src(url);
        if let Err(e) = head.append_child(&script) {
            log::error!("Could not append polyfill script: {e:?}");
        }
    })
    .await
    .map_err(|e| LazyError::PolyfillUnavailable(e.to_string()))
}

// Canvas reads need CORS; plain measurement must not, or hosts without
// CORS headers would fail where a CSS background succeeds.
async fn load_image(url: &str, cors: bool) -> Result<HtmlImageElement, LazyError> {
    let img = HtmlImageElement::new().map_err(js_error)?;
    if cors {
        img.set_cross_origin(Some("anonymous"));
    }
    wait_for_load(&img, || img.set_src(url))
        .await
        .map_err(|_| ThumbnailError::Load(url.to_string()))?;
    Ok(img)
}

/// Loads `url` off-screen and draws a blurred thumbnail of it on a canvas.
pub async fn blur_thumbnail(url: &str, blur: BlurUp) -> Result<String, LazyError> {
    let img = load_image(url, true).await?;
    let (width, height) = (img.natural_width(), img.natural_height());
    if width == 0 || height == 0 {
        return Err(ThumbnailError::EmptyImage.into());
    }
    let (tw, th) = thumbnail_dimensions(width, height, blur.size);

    let canvas: HtmlCanvasElement = create(&document()?, "canvas")?;
    canvas.set_width(tw);
    canvas.set_height(th);
    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(js_error)?
        .ok_or_else(|| LazyError::Dom("2d context unavailable".into()))?
        .dyn_into()
        .map_err(|object| js_error(object.into()))?;

    context.set_filter(&format!("blur({}px)", blur.blur_radius));
    context
        .draw_image_with_html_image_element_and_dw_and_dh(&img, 0.0, 0.0, tw as f64, th as f64)
        .map_err(js_error)?;

    canvas
        .to_data_url_with_type_and_encoder_options(
            "image/jpeg",
            &JsValue::from_f64(THUMBNAIL_QUALITY as f64 / 100.0),
        )
        .map_err(js_error)
}

/// Loads `url` off-screen the way a CSS background would and returns its
/// intrinsic size.
pub async fn natural_size(url: &str) -> Result<Size, LazyError> {
    let img = load_image(url, false).await?;
    Ok(Size::new(img.natural_width() as f64, img.natural_height() as f64))
}

pub fn client_size(element: &Element) -> Size {
    Size::new(element.client_width() as f64, element.client_height() as f64)
}
