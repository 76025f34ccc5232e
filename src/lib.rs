pub mod config;
#[cfg(feature = "web")]
pub mod dom;
pub mod error;
pub mod fit;
pub mod image;
pub mod machine;
pub mod network;
pub mod options;
pub mod provider;
pub mod render;
pub mod thumbnail;

pub use config::{ConfigOverride, LazyConfig};
pub use image::*;
pub use options::{BlurUp, ParentFit, PerformanceMetrics, QualityTier};
pub use provider::{provide_lazy_config, use_lazy_config};
