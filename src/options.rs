use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseFitError;

/// The resource a [`LazyImage`](crate::image::LazyImage) will eventually load.
///
/// Only one kind is ever applied. An image wins over a background, which wins
/// over an iframe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Image {
        src: String,
        srcset: Option<String>,
        sizes: Option<String>,
    },
    Background {
        url: String,
        set: Option<String>,
    },
    Frame {
        src: String,
    },
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl Source {
    pub fn select(
        src: Option<String>,
        srcset: Option<String>,
        sizes: Option<String>,
        bg: Option<String>,
        bgset: Option<String>,
        iframe_src: Option<String>,
    ) -> Option<Self> {
        if let Some(src) = present(src) {
            Some(Source::Image {
                src,
                srcset: present(srcset),
                sizes: present(sizes),
            })
        } else if let Some(url) = present(bg) {
            Some(Source::Background {
                url,
                set: present(bgset),
            })
        } else {
            present(iframe_src).map(|src| Source::Frame { src })
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Source::Image { .. } => ElementKind::Img,
            Source::Background { .. } => ElementKind::Div,
            Source::Frame { .. } => ElementKind::Iframe,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Source::Image { src, .. } => src,
            Source::Background { url, .. } => url,
            Source::Frame { src } => src,
        }
    }

    /// Same kind of source pointing at `url`, without responsive candidates.
    pub fn replaced_by(&self, url: &str) -> Self {
        match self {
            Source::Image { .. } => Source::Image {
                src: url.to_string(),
                srcset: None,
                sizes: None,
            },
            Source::Background { .. } => Source::Background {
                url: url.to_string(),
                set: None,
            },
            Source::Frame { .. } => Source::Frame {
                src: url.to_string(),
            },
        }
    }

    /// URL a blur placeholder or preload can be built from. Iframes have none.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Source::Image { src, .. } => Some(src),
            Source::Background { url, .. } => Some(url),
            Source::Frame { .. } => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Img,
    Iframe,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurUp {
    pub enabled: bool,
    /// Short edge of the thumbnail, in pixels.
    pub size: u32,
    pub blur_radius: u32,
}

impl BlurUp {
    pub const DEFAULT_SIZE: u32 = 40;
    pub const DEFAULT_BLUR_RADIUS: u32 = 20;

    pub fn new(size: u32, blur_radius: u32) -> Self {
        Self {
            enabled: true,
            size,
            blur_radius,
        }
    }
}

impl Default for BlurUp {
    fn default() -> Self {
        Self {
            enabled: false,
            size: Self::DEFAULT_SIZE,
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
        }
    }
}

impl From<bool> for BlurUp {
    fn from(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }
}

/// How a background image is sized relative to its container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentFit {
    #[default]
    Contain,
    Cover,
    Fill,
    None,
}

impl ParentFit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParentFit::Contain => "contain",
            ParentFit::Cover => "cover",
            ParentFit::Fill => "fill",
            ParentFit::None => "none",
        }
    }
}

impl FromStr for ParentFit {
    type Err = ParseFitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "contain" => Ok(ParentFit::Contain),
            "cover" => Ok(ParentFit::Cover),
            "fill" => Ok(ParentFit::Fill),
            "none" => Ok(ParentFit::None),
            other => Err(ParseFitError(other.to_string())),
        }
    }
}

impl fmt::Display for ParentFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    High,
    Low,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Low => "low",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing of a single load, handed to `on_performance_log`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Time between activation and the element's load event.
    pub load_time_ms: f64,
    /// Timestamp of the load event relative to page start.
    pub render_time_ms: f64,
}

#[cfg(test)]
mod options_tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn image_wins_over_background_and_frame() {
        let source = Source::select(
            some("a.png"),
            some("a.png 1x, a@2x.png 2x"),
            None,
            some("bg.png"),
            None,
            some("/embed"),
        )
        .unwrap();

        assert_eq!(source.kind(), ElementKind::Img);
        assert_eq!(source.url(), "a.png");
        assert!(matches!(source, Source::Image { srcset: Some(_), .. }));
    }

    #[test]
    fn background_wins_over_frame() {
        let source = Source::select(None, None, None, some("bg.png"), None, some("/embed")).unwrap();
        assert_eq!(source.kind(), ElementKind::Div);
        assert_eq!(source.image_url(), Some("bg.png"));
    }

    #[test]
    fn empty_strings_are_absent() {
        assert_eq!(Source::select(some(""), None, None, some(""), None, None), None);

        let frame = Source::select(some(""), None, None, None, None, some("/embed")).unwrap();
        assert_eq!(frame.kind(), ElementKind::Iframe);
        assert_eq!(frame.image_url(), None);
    }

    #[test]
    fn replacement_drops_candidates() {
        let source = Source::Image {
            src: "a.png".into(),
            srcset: some("a.png 1x"),
            sizes: some("100vw"),
        };

        assert_eq!(
            source.replaced_by("x.png"),
            Source::Image {
                src: "x.png".into(),
                srcset: None,
                sizes: None,
            }
        );
    }

    #[test]
    fn blur_up_from_bool_uses_defaults() {
        let blur: BlurUp = true.into();
        assert!(blur.enabled);
        assert_eq!(blur.size, 40);
        assert_eq!(blur.blur_radius, 20);
        assert!(!BlurUp::default().enabled);
    }

    #[test]
    fn parent_fit_parses() {
        assert_eq!("cover".parse::<ParentFit>(), Ok(ParentFit::Cover));
        assert_eq!(" none ".parse::<ParentFit>(), Ok(ParentFit::None));
        assert!("stretch".parse::<ParentFit>().is_err());
        assert_eq!(ParentFit::default(), ParentFit::Contain);
    }
}
