#[cfg(feature = "web")]
use std::{cell::RefCell, rc::Rc};

use leptos::html::AnyElement;
use leptos::*;
use leptos_meta::Link;

use crate::config::LazyConfig;
use crate::machine::{Command, Event, LazyState, Settings};
use crate::options::{BlurUp, ElementKind, ParentFit, PerformanceMetrics, Source};
use crate::provider::use_lazy_config;
use crate::render;

#[cfg(feature = "web")]
type Host = crate::dom::BrowserEnv;
#[cfg(not(feature = "web"))]
type Host = crate::machine::StaticEnv;

/**
 * Lazily loaded image, background image or iframe.
 *
 * Nothing is fetched until the element comes within `root_margin` of the
 * viewport (or immediately when `is_critical`). Optionally shows a blurred
 * thumbnail while waiting and reports load timing.
 */
#[component]
pub fn LazyImage(
    #[prop(into, optional)] src: Option<String>,
    #[prop(into, optional)] srcset: Option<String>,
    #[prop(into, optional)] sizes: Option<String>,
    #[prop(into, optional)] bg: Option<String>,
    #[prop(into, optional)] bgset: Option<String>,
    #[prop(optional)] parent_fit: ParentFit,
    #[prop(into, optional)] blur_up: BlurUp,
    #[prop(into, optional)] iframe_src: Option<String>,
    #[prop(into, optional)] on_load: Option<Callback<()>>,
    #[prop(into, optional)] on_error: Option<Callback<()>>,
    // Shown until the element is reported loaded.
    #[prop(optional)] placeholder: Option<ChildrenFn>,
    #[prop(default = 0.0)] threshold: f64,
    #[prop(into, default = "200px".into())] root_margin: String,
    #[prop(optional)] is_critical: bool,
    #[prop(into, optional)] alt: Option<String>,
    #[prop(into, optional)] style: Option<String>,
    #[prop(optional)] adaptive_quality: bool,
    // Will add preload link to head if true.
    #[prop(optional)] preload: bool,
    #[prop(into, optional)] error_fallback: Option<String>,
    #[prop(optional)] aspect_ratio: Option<f64>,
    #[prop(into, optional)] on_performance_log: Option<Callback<PerformanceMetrics>>,
    #[prop(optional)] config: Option<LazyConfig>,
) -> impl IntoView {
    let config = config.unwrap_or_else(use_lazy_config);

    let settings = Settings {
        source: Source::select(src, srcset, sizes, bg, bgset, iframe_src),
        critical: is_critical,
        root_margin,
        threshold: threshold.clamp(0.0, 1.0),
        adaptive_quality,
        blur_up,
        error_fallback,
        parent_fit,
        wants_metrics: on_performance_log.is_some(),
    };

    let kind = render::element_kind(&settings);
    let data_attrs = render::data_attributes(&config, &settings);
    let preload_href = preload.then(|| render::preload_href(&settings)).flatten();

    let state = create_rw_signal(LazyState::new(settings));
    let node_ref = create_node_ref::<AnyElement>();
    let driver = Driver {
        state,
        node_ref,
        on_load,
        on_error,
        on_performance_log,
        polyfill_url: config.polyfill_url.clone(),
        #[cfg(feature = "web")]
        watcher: Rc::default(),
    };

    node_ref.on_load({
        let driver = driver.clone();
        move |_| untrack(|| driver.send(Event::Mount))
    });
    on_cleanup({
        let driver = driver.clone();
        move || driver.unmount()
    });

    let fields = create_memo(move |_| state.with(render::resource_fields));
    let quality_attr = config.quality_attr.clone();
    let class = move || state.with(|s| render::class_names(&config, s));
    let inline_style = move || state.with(|s| render::style(s, style.as_deref(), aspect_ratio));
    let quality = move || state.with(|s| s.quality().as_str());

    let element = match kind {
        ElementKind::Img => html::img()
            .attr("src", move || fields.get().src)
            .attr("srcset", move || fields.get().srcset)
            .attr("sizes", move || fields.get().sizes)
            .attr("alt", alt)
            .into_any(),
        ElementKind::Iframe => html::iframe()
            .attr("src", move || fields.get().src)
            .attr("title", alt)
            .into_any(),
        ElementKind::Div => html::div()
            .attr("role", alt.as_ref().map(|_| "img".to_string()))
            .attr("aria-label", alt)
            .into_any(),
    };

    let element = data_attrs
        .into_iter()
        .fold(element, |element, (name, value)| element.attr(name, value))
        .attr("class", class)
        .attr("style", inline_style)
        .attr(quality_attr, quality)
        .on(ev::load, {
            let driver = driver.clone();
            move |_| driver.send(Event::ResourceLoaded)
        })
        .on(ev::error, {
            let driver = driver.clone();
            move |_| driver.send(Event::ResourceFailed)
        })
        .node_ref(node_ref);

    let placeholder = move || {
        if state.with(LazyState::loaded) {
            None
        } else {
            placeholder.as_ref().map(|children| children())
        }
    };

    view! {
        {preload_href.map(|href| view! { <Link rel="preload" as_="image" href=href/> })}
        {element}
        {placeholder}
    }
}

/// Feeds events into the state machine and carries out the commands it
/// returns.
#[derive(Clone)]
struct Driver {
    state: RwSignal<LazyState>,
    #[cfg_attr(not(feature = "web"), allow(dead_code))]
    node_ref: NodeRef<AnyElement>,
    on_load: Option<Callback<()>>,
    on_error: Option<Callback<()>>,
    on_performance_log: Option<Callback<PerformanceMetrics>>,
    #[cfg_attr(not(feature = "web"), allow(dead_code))]
    polyfill_url: String,
    #[cfg(feature = "web")]
    watcher: Rc<RefCell<Option<crate::dom::Watcher>>>,
}

impl Driver {
    fn send(&self, event: Event) {
        // The signal is gone once the component is disposed.
        let Some(commands) = self.state.try_update(|state| state.handle(&Host::default(), event))
        else {
            return;
        };
        for command in commands {
            self.run(command);
        }
    }

    #[cfg(feature = "web")]
    fn is_live(&self) -> bool {
        self.state
            .try_with_untracked(LazyState::is_mounted)
            .unwrap_or(false)
    }

    fn unmount(&self) {
        self.send(Event::Unmount);
        #[cfg(feature = "web")]
        self.watcher.borrow_mut().take();
    }

    fn run(&self, command: Command) {
        match command {
            Command::NotifyLoad => {
                if let Some(on_load) = &self.on_load {
                    on_load.call(());
                }
            }
            Command::NotifyError => {
                if let Some(on_error) = &self.on_error {
                    on_error.call(());
                }
            }
            Command::ReportMetrics(metrics) => {
                if let Some(on_performance_log) = &self.on_performance_log {
                    on_performance_log.call(metrics);
                }
            }
            other => self.run_effect(other),
        }
    }

    #[cfg(not(feature = "web"))]
    fn run_effect(&self, command: Command) {
        log::debug!("Skipping {command:?} outside the browser");
    }

    #[cfg(feature = "web")]
    fn run_effect(&self, command: Command) {
        use crate::dom;

        match command {
            Command::Observe {
                root_margin,
                threshold,
            } => {
                let Some(element) = self.node_ref.get_untracked() else {
                    return;
                };
                let driver = self.clone();
                let watched = dom::Watcher::observe(&element, &root_margin, threshold, {
                    move |is_intersecting, ratio| {
                        driver.send(Event::Intersected {
                            is_intersecting,
                            ratio,
                        })
                    }
                });
                match watched {
                    Ok(watcher) => *self.watcher.borrow_mut() = Some(watcher),
                    Err(e) => self.send(Event::ObserverUnavailable(e.to_string())),
                }
            }
            Command::Unobserve => {
                if let Some(watcher) = self.watcher.borrow().as_ref() {
                    watcher.disconnect();
                }
            }
            Command::LoadPolyfill => {
                let driver = self.clone();
                spawn_local(async move {
                    match dom::load_polyfill(&driver.polyfill_url).await {
                        Ok(()) => driver.send(Event::PolyfillLoaded),
                        Err(e) => driver.send(Event::ObserverUnavailable(e.to_string())),
                    }
                });
            }
            Command::GeneratePlaceholder { url, blur } => {
                let driver = self.clone();
                spawn_local(async move {
                    match dom::blur_thumbnail(&url, blur).await {
                        Ok(uri) => driver.send(Event::PlaceholderReady(uri)),
                        Err(e) => driver.send(Event::PlaceholderFailed(e.to_string())),
                    }
                });
            }
            Command::LoadBackground(url) => {
                let driver = self.clone();
                spawn_local(async move {
                    let intrinsic = match dom::natural_size(&url).await {
                        Ok(size) => size,
                        Err(e) => {
                            log::debug!("Background {url} failed to load: {e}");
                            driver.send(Event::ResourceFailed);
                            return;
                        }
                    };
                    driver.send(Event::ResourceLoaded);
                    if !driver.is_live() {
                        return;
                    }
                    let Some(element) = driver.node_ref.get_untracked() else {
                        return;
                    };
                    let container = dom::client_size(&element);
                    driver.send(Event::BackgroundMeasured {
                        intrinsic,
                        container,
                    });
                });
            }
            Command::NotifyLoad | Command::NotifyError | Command::ReportMetrics(_) => {}
        }
    }
}
