use crate::config::LazyConfig;
use leptos::*;

/// Provides the class and attribute names every `<LazyImage/>` below this
/// point uses.
///
/// This should go in the base of your Leptos <App/>.
///
/// Example
///
/// ```
/// use leptos::*;
/// use leptos_pixel_perfect::config::{ConfigOverride, LazyConfig};
/// use leptos_pixel_perfect::provider::provide_lazy_config;
///
/// #[component]
/// pub fn App() -> impl IntoView {
///     provide_lazy_config(LazyConfig::default().merged(ConfigOverride {
///         loaded_class: Some("is-loaded".into()),
///         ..Default::default()
///     }));
///
///     view!{
///       <div/>
///     }
/// }
///
/// ```
pub fn provide_lazy_config(config: LazyConfig) {
    provide_context(config);
}

/// The provided config, or the defaults when none was provided.
pub fn use_lazy_config() -> LazyConfig {
    use_context::<LazyConfig>().unwrap_or_default()
}
