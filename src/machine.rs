//! Visibility and loading state machine behind [`LazyImage`](crate::image::LazyImage).
//!
//! The machine never touches the DOM. The component feeds it [`Event`]s and
//! performs the [`Command`]s it returns; everything the view shows is derived
//! from [`LazyState`]. Once unmounted the machine ignores every event, so late
//! completions (polyfill script, thumbnail decode, a queued intersection
//! callback) cannot mutate a dead instance.

use crate::fit::{background_size, BackgroundSize, Size};
use crate::network::{quality_for, EffectiveType};
use crate::options::{BlurUp, ParentFit, PerformanceMetrics, QualityTier, Source};

/// What the machine needs to know about the host it runs in.
pub trait Environment {
    /// High resolution timestamp in milliseconds.
    fn now(&self) -> f64;
    fn effective_type(&self) -> Option<EffectiveType>;
    fn supports_intersection(&self) -> bool;
}

/// Host without a browser: no clock, no network information and no
/// intersection observer. Used while rendering on the server.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticEnv;

impl Environment for StaticEnv {
    fn now(&self) -> f64 {
        0.0
    }

    fn effective_type(&self) -> Option<EffectiveType> {
        None
    }

    fn supports_intersection(&self) -> bool {
        false
    }
}

/// Per-instance inputs, fixed for the lifetime of a mount.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub source: Option<Source>,
    pub critical: bool,
    pub root_margin: String,
    pub threshold: f64,
    pub adaptive_quality: bool,
    pub blur_up: BlurUp,
    pub error_fallback: Option<String>,
    pub parent_fit: ParentFit,
    pub wants_metrics: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            critical: false,
            root_margin: "200px".into(),
            threshold: 0.0,
            adaptive_quality: false,
            blur_up: BlurUp::default(),
            error_fallback: None,
            parent_fit: ParentFit::default(),
            wants_metrics: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Unstarted,
    /// Waiting for the element to come near the viewport.
    Watching,
    /// A resource is assigned and its load event is pending.
    Activating,
    Loaded,
    Errored,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Lifecycle {
    #[default]
    Fresh,
    Mounted,
    Unmounted,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Mount,
    PolyfillLoaded,
    ObserverUnavailable(String),
    Intersected { is_intersecting: bool, ratio: f64 },
    ResourceLoaded,
    ResourceFailed,
    PlaceholderReady(String),
    PlaceholderFailed(String),
    BackgroundMeasured { intrinsic: Size, container: Size },
    Unmount,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Observe { root_margin: String, threshold: f64 },
    Unobserve,
    LoadPolyfill,
    GeneratePlaceholder { url: String, blur: BlurUp },
    /// Fetch a background image off-screen. A `div` has no load event of
    /// its own, so the outcome comes back as `ResourceLoaded` or
    /// `ResourceFailed`.
    LoadBackground(String),
    NotifyLoad,
    NotifyError,
    ReportMetrics(PerformanceMetrics),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LazyState {
    settings: Settings,
    lifecycle: Lifecycle,
    phase: Phase,
    observing: bool,
    loaded: bool,
    errored: bool,
    placeholder: Option<String>,
    quality: QualityTier,
    visibility_ready: bool,
    assignment: Option<Source>,
    fallback_used: bool,
    started_at: Option<f64>,
    background_size: Option<BackgroundSize>,
}

impl LazyState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            lifecycle: Lifecycle::Fresh,
            phase: Phase::Unstarted,
            observing: false,
            loaded: false,
            errored: false,
            placeholder: None,
            quality: QualityTier::High,
            visibility_ready: false,
            assignment: None,
            fallback_used: false,
            started_at: None,
            background_size: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle == Lifecycle::Mounted
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    pub fn visibility_ready(&self) -> bool {
        self.visibility_ready
    }

    /// The resource currently applied to the element, if activated.
    pub fn assignment(&self) -> Option<&Source> {
        self.assignment.as_ref()
    }

    /// Blurred preview, only while the real resource has not loaded.
    pub fn placeholder(&self) -> Option<&str> {
        if self.loaded {
            None
        } else {
            self.placeholder.as_deref()
        }
    }

    pub fn background_size(&self) -> Option<BackgroundSize> {
        self.background_size
    }

    pub fn handle<E: Environment + ?Sized>(&mut self, env: &E, event: Event) -> Vec<Command> {
        match self.lifecycle {
            Lifecycle::Unmounted => return Vec::new(),
            Lifecycle::Fresh if event != Event::Mount => return Vec::new(),
            _ => {}
        }

        match event {
            Event::Mount => self.mount(env),
            Event::PolyfillLoaded => {
                if self.phase != Phase::Watching || self.observing {
                    return Vec::new();
                }
                self.visibility_ready = true;
                self.observe()
            }
            Event::ObserverUnavailable(reason) => {
                log::error!("IntersectionObserver unavailable, loading immediately: {reason}");
                if self.phase != Phase::Watching {
                    return Vec::new();
                }
                self.observing = false;
                self.activate(env)
            }
            Event::Intersected {
                is_intersecting,
                ratio,
            } => {
                let crossed = is_intersecting && ratio >= self.settings.threshold;
                if self.phase != Phase::Watching || !self.observing || !crossed {
                    return Vec::new();
                }
                self.observing = false;
                let mut commands = vec![Command::Unobserve];
                commands.extend(self.activate(env));
                commands
            }
            Event::ResourceLoaded => self.resource_loaded(env),
            Event::ResourceFailed => self.resource_failed(),
            Event::PlaceholderReady(uri) => {
                if !self.loaded {
                    self.placeholder = Some(uri);
                }
                Vec::new()
            }
            Event::PlaceholderFailed(reason) => {
                log::debug!("Blur placeholder unavailable: {reason}");
                Vec::new()
            }
            Event::BackgroundMeasured {
                intrinsic,
                container,
            } => {
                self.background_size =
                    Some(background_size(self.settings.parent_fit, intrinsic, container));
                Vec::new()
            }
            Event::Unmount => {
                self.lifecycle = Lifecycle::Unmounted;
                if self.observing {
                    self.observing = false;
                    vec![Command::Unobserve]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn mount<E: Environment + ?Sized>(&mut self, env: &E) -> Vec<Command> {
        if self.lifecycle != Lifecycle::Fresh {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Mounted;
        self.visibility_ready = env.supports_intersection();

        let mut commands = Vec::new();
        let blur = self.settings.blur_up;
        if blur.enabled {
            if let Some(url) = self.settings.source.as_ref().and_then(Source::image_url) {
                commands.push(Command::GeneratePlaceholder {
                    url: url.to_string(),
                    blur,
                });
            }
        }

        if self.settings.critical {
            commands.extend(self.activate(env));
        } else {
            self.phase = Phase::Watching;
            if self.visibility_ready {
                commands.extend(self.observe());
            } else {
                commands.push(Command::LoadPolyfill);
            }
        }
        commands
    }

    fn observe(&mut self) -> Vec<Command> {
        self.observing = true;
        vec![Command::Observe {
            root_margin: self.settings.root_margin.clone(),
            threshold: self.settings.threshold,
        }]
    }

    fn activate<E: Environment + ?Sized>(&mut self, env: &E) -> Vec<Command> {
        if self.started_at.is_some() {
            return Vec::new();
        }
        self.started_at = Some(env.now());
        self.phase = Phase::Activating;
        self.quality = quality_for(self.settings.adaptive_quality, env.effective_type());
        self.assignment = self.settings.source.clone();

        let mut commands = Vec::new();
        if let Some(Source::Background { url, .. }) = &self.assignment {
            commands.push(Command::LoadBackground(url.clone()));
        }

        // Reported as loaded as soon as the resource is assigned; the element's
        // own load event confirms it later.
        self.loaded = true;
        commands.push(Command::NotifyLoad);
        commands
    }

    fn resource_loaded<E: Environment + ?Sized>(&mut self, env: &E) -> Vec<Command> {
        let Some(started_at) = self.started_at else {
            return Vec::new();
        };
        self.loaded = true;
        self.phase = Phase::Loaded;

        let mut commands = vec![Command::NotifyLoad];
        if self.settings.wants_metrics {
            let now = env.now();
            commands.push(Command::ReportMetrics(PerformanceMetrics {
                load_time_ms: now - started_at,
                render_time_ms: now,
            }));
        }
        commands
    }

    fn resource_failed(&mut self) -> Vec<Command> {
        if self.started_at.is_none() {
            return Vec::new();
        }
        self.errored = true;
        self.phase = Phase::Errored;

        let mut commands = vec![Command::NotifyError];
        if self.fallback_used {
            return commands;
        }
        let replacement = match (&self.settings.error_fallback, &self.assignment) {
            (Some(fallback), Some(current)) => Some(current.replaced_by(fallback)),
            _ => None,
        };
        if let Some(replacement) = replacement {
            log::debug!("Switching to error fallback {}", replacement.url());
            if let Source::Background { url, .. } = &replacement {
                commands.push(Command::LoadBackground(url.clone()));
            }
            self.assignment = Some(replacement);
            self.fallback_used = true;
            self.phase = Phase::Activating;
        }
        commands
    }
}
