use serde::{Deserialize, Serialize};

/// Class and attribute names used as styling hooks by every [`LazyImage`](crate::image::LazyImage).
///
/// Build one near the root of the app and hand it to
/// [`provide_lazy_config`](crate::provider::provide_lazy_config). Components never
/// mutate it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LazyConfig {
    pub lazy_class: String,
    pub loaded_class: String,
    pub loading_class: String,
    pub error_class: String,
    pub src_attr: String,
    pub srcset_attr: String,
    pub sizes_attr: String,
    pub quality_attr: String,
    /// Script injected when the browser has no IntersectionObserver.
    pub polyfill_url: String,
}

pub const DEFAULT_POLYFILL_URL: &str =
    "https://cdnjs.cloudflare.com/polyfill/v3/polyfill.min.js?features=IntersectionObserver";

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            lazy_class: "pixelperfect-lazy".into(),
            loaded_class: "pixelperfect-loaded".into(),
            loading_class: "pixelperfect-loading".into(),
            error_class: "pixelperfect-error".into(),
            src_attr: "data-pixelperfect-src".into(),
            srcset_attr: "data-pixelperfect-srcset".into(),
            sizes_attr: "data-pixelperfect-sizes".into(),
            quality_attr: "data-pixelperfect-quality".into(),
            polyfill_url: DEFAULT_POLYFILL_URL.into(),
        }
    }
}

/// Partial override of a [`LazyConfig`]. Unset fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverride {
    pub lazy_class: Option<String>,
    pub loaded_class: Option<String>,
    pub loading_class: Option<String>,
    pub error_class: Option<String>,
    pub src_attr: Option<String>,
    pub srcset_attr: Option<String>,
    pub sizes_attr: Option<String>,
    pub quality_attr: Option<String>,
    pub polyfill_url: Option<String>,
}

impl LazyConfig {
    pub fn merged(self, over: ConfigOverride) -> Self {
        Self {
            lazy_class: over.lazy_class.unwrap_or(self.lazy_class),
            loaded_class: over.loaded_class.unwrap_or(self.loaded_class),
            loading_class: over.loading_class.unwrap_or(self.loading_class),
            error_class: over.error_class.unwrap_or(self.error_class),
            src_attr: over.src_attr.unwrap_or(self.src_attr),
            srcset_attr: over.srcset_attr.unwrap_or(self.srcset_attr),
            sizes_attr: over.sizes_attr.unwrap_or(self.sizes_attr),
            quality_attr: over.quality_attr.unwrap_or(self.quality_attr),
            polyfill_url: over.polyfill_url.unwrap_or(self.polyfill_url),
        }
    }

    /// Space separated class list for the given load flags.
    pub fn class_names(&self, loaded: bool, errored: bool) -> String {
        let state = if loaded {
            &self.loaded_class
        } else {
            &self.loading_class
        };
        let error = if errored { self.error_class.as_str() } else { "" };

        [self.lazy_class.as_str(), state.as_str(), error]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
