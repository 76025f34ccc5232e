//! Derives what the element shows from the state machine.

use crate::config::LazyConfig;
use crate::machine::{LazyState, Settings};
use crate::options::{ElementKind, Source};

/// Blur applied to the element until it is reported loaded.
const LOADING_FILTER: &str = "blur(20px)";

pub fn element_kind(settings: &Settings) -> ElementKind {
    settings
        .source
        .as_ref()
        .map(Source::kind)
        .unwrap_or(ElementKind::Div)
}

pub fn class_names(config: &LazyConfig, state: &LazyState) -> String {
    config.class_names(state.loaded(), state.errored())
}

/// Inline style for the element. The caller's style comes first so the
/// loader's own properties win.
pub fn style(state: &LazyState, user_style: Option<&str>, aspect_ratio: Option<f64>) -> String {
    let mut style = String::new();

    if let Some(user) = user_style.map(str::trim).filter(|s| !s.is_empty()) {
        style.push_str(user);
        if !user.ends_with(';') {
            style.push(';');
        }
    }

    let size = state
        .background_size()
        .map(|size| size.as_css())
        .unwrap_or("cover");
    let filter = if state.loaded() { "none" } else { LOADING_FILTER };
    style.push_str(&format!(
        "background-repeat:no-repeat;background-position:center center;background-size:{size};transition:filter 0.3s ease-out;filter:{filter};"
    ));

    if let Some(ratio) = aspect_ratio.filter(|r| r.is_finite() && *r > 0.0) {
        style.push_str(&format!("aspect-ratio:{ratio};"));
    }

    if let Some(placeholder) = state.placeholder() {
        style.push_str(&format!("background-image:url('{placeholder}');"));
    } else if let Some(Source::Background { url, set }) = state.assignment() {
        style.push_str(&format!("background-image:url('{url}');"));
        if let Some(set) = set {
            style.push_str(&format!("background-image:image-set({});", image_set(set)));
        }
    }

    style
}

/// Turns a `bgset` candidate list into `image-set()` arguments. Bare URLs
/// are wrapped in `url('…')`, quoted strings and `url()` are kept.
fn image_set(set: &str) -> String {
    split_candidates(set)
        .into_iter()
        .map(|candidate| {
            if candidate.starts_with(['\'', '"']) || candidate.starts_with("url(") {
                return candidate.to_string();
            }
            match candidate.split_once(char::is_whitespace) {
                Some((url, descriptor)) => format!("url('{url}') {}", descriptor.trim()),
                None => format!("url('{candidate}')"),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// Commas inside quotes or parentheses do not separate candidates.
fn split_candidates(set: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in set.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                candidates.push(&set[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    candidates.push(&set[start..]);
    candidates
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// `src`, `srcset` and `sizes` of the element once a resource is assigned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceFields {
    pub src: Option<String>,
    pub srcset: Option<String>,
    pub sizes: Option<String>,
}

pub fn resource_fields(state: &LazyState) -> ResourceFields {
    match state.assignment() {
        Some(Source::Image { src, srcset, sizes }) => ResourceFields {
            src: Some(src.clone()),
            srcset: srcset.clone(),
            sizes: sizes.clone(),
        },
        Some(Source::Frame { src }) => ResourceFields {
            src: Some(src.clone()),
            ..Default::default()
        },
        Some(Source::Background { .. }) | None => ResourceFields::default(),
    }
}

/// Data attributes mirroring the configured image source under the
/// configured names. Empty when there is no image source.
pub fn data_attributes(config: &LazyConfig, settings: &Settings) -> Vec<(String, String)> {
    let Some(Source::Image { src, srcset, sizes }) = &settings.source else {
        return Vec::new();
    };

    let mut attrs = vec![(config.src_attr.clone(), src.clone())];
    if let Some(srcset) = srcset {
        attrs.push((config.srcset_attr.clone(), srcset.clone()));
    }
    if let Some(sizes) = sizes {
        attrs.push((config.sizes_attr.clone(), sizes.clone()));
    }
    attrs
}

/// URL to warm with a preload hint, when preloading makes sense.
pub fn preload_href(settings: &Settings) -> Option<String> {
    settings
        .source
        .as_ref()
        .and_then(Source::image_url)
        .map(str::to_string)
}

#[cfg(test)]
mod render_tests {
    use super::*;
    use crate::config::ConfigOverride;
    use crate::fit::Size;
    use crate::machine::{Environment, Event};
    use crate::network::EffectiveType;
    use crate::options::{BlurUp, ParentFit};

    struct Immediate;

    impl Environment for Immediate {
        fn now(&self) -> f64 {
            0.0
        }

        fn effective_type(&self) -> Option<EffectiveType> {
            None
        }

        fn supports_intersection(&self) -> bool {
            true
        }
    }

    fn image_settings() -> Settings {
        Settings {
            source: Some(Source::Image {
                src: "a.png".into(),
                srcset: Some("a.png 1x, a@2x.png 2x".into()),
                sizes: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn resource_fields_appear_on_activation() {
        let mut state = LazyState::new(image_settings());
        state.handle(&Immediate, Event::Mount);
        assert_eq!(resource_fields(&state), ResourceFields::default());

        state.handle(
            &Immediate,
            Event::Intersected {
                is_intersecting: true,
                ratio: 1.0,
            },
        );
        let fields = resource_fields(&state);
        assert_eq!(fields.src.as_deref(), Some("a.png"));
        assert_eq!(fields.srcset.as_deref(), Some("a.png 1x, a@2x.png 2x"));
        assert_eq!(fields.sizes, None);
    }

    #[test]
    fn classes_track_state() {
        let config = LazyConfig::default();
        let mut state = LazyState::new(Settings {
            critical: true,
            ..image_settings()
        });
        assert_eq!(
            class_names(&config, &state),
            "pixelperfect-lazy pixelperfect-loading"
        );

        state.handle(&Immediate, Event::Mount);
        state.handle(&Immediate, Event::ResourceFailed);
        assert_eq!(
            class_names(&config, &state),
            "pixelperfect-lazy pixelperfect-loaded pixelperfect-error"
        );
    }

    #[test]
    fn placeholder_leaves_style_once_loaded() {
        let mut state = LazyState::new(Settings {
            blur_up: BlurUp::new(60, 30),
            ..image_settings()
        });
        state.handle(&Immediate, Event::Mount);
        state.handle(&Immediate, Event::PlaceholderReady("data:image/jpeg;base64,AA".into()));

        let before = style(&state, Some("width: 10px"), Some(1.5));
        assert!(before.starts_with("width: 10px;"));
        assert!(before.contains("filter:blur(20px);"));
        assert!(before.contains("aspect-ratio:1.5;"));
        assert!(before.contains("background-image:url('data:image/jpeg;base64,AA');"));

        state.handle(
            &Immediate,
            Event::Intersected {
                is_intersecting: true,
                ratio: 1.0,
            },
        );
        let after = style(&state, None, None);
        assert!(after.contains("filter:none;"));
        assert!(!after.contains("data:image"));
    }

    #[test]
    fn background_style_uses_fit() {
        let mut state = LazyState::new(Settings {
            critical: true,
            parent_fit: ParentFit::Fill,
            source: Some(Source::Background {
                url: "bg.jpg".into(),
                set: Some("'bg.avif' type('image/avif')".into()),
            }),
            ..Default::default()
        });
        assert!(style(&state, None, None).contains("background-size:cover;"));

        state.handle(&Immediate, Event::Mount);
        state.handle(
            &Immediate,
            Event::BackgroundMeasured {
                intrinsic: Size::new(10.0, 10.0),
                container: Size::new(20.0, 10.0),
            },
        );

        let css = style(&state, None, None);
        assert!(css.contains("background-size:100% 100%;"));
        assert!(css.contains("background-image:url('bg.jpg');"));
        assert!(css.contains("background-image:image-set('bg.avif' type('image/avif'));"));
        assert_eq!(resource_fields(&state), ResourceFields::default());
    }

    #[test]
    fn bare_bgset_candidates_are_wrapped_in_url() {
        assert_eq!(
            image_set("a.jpg 1x, b.jpg 2x"),
            "url('a.jpg') 1x, url('b.jpg') 2x"
        );
        assert_eq!(image_set("a.jpg"), "url('a.jpg')");
        assert_eq!(
            image_set("url(a.avif) type('image/avif'), \"b,c.jpg\" 2x"),
            "url(a.avif) type('image/avif'), \"b,c.jpg\" 2x"
        );
        assert_eq!(image_set(" , a.jpg 1x,"), "url('a.jpg') 1x");
    }

    #[test]
    fn data_attributes_use_configured_names() {
        let config = LazyConfig::default().merged(ConfigOverride {
            src_attr: Some("data-src".into()),
            ..Default::default()
        });

        assert_eq!(
            data_attributes(&config, &image_settings()),
            vec![
                ("data-src".to_string(), "a.png".to_string()),
                (
                    "data-pixelperfect-srcset".to_string(),
                    "a.png 1x, a@2x.png 2x".to_string()
                ),
            ]
        );
        assert!(data_attributes(&config, &Settings::default()).is_empty());
    }

    #[test]
    fn element_kind_follows_source() {
        assert_eq!(element_kind(&image_settings()), ElementKind::Img);
        assert_eq!(element_kind(&Settings::default()), ElementKind::Div);
        assert_eq!(preload_href(&image_settings()).as_deref(), Some("a.png"));
    }
}
