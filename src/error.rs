use thiserror::Error;

/// Failures the lazy loader can run into. None of these reach the host
/// application: the component logs them and falls back to a visible state.
#[derive(Debug, Error)]
pub enum LazyError {
    #[error("IntersectionObserver polyfill unavailable: {0}")]
    PolyfillUnavailable(String),
    #[error("failed to create blur placeholder: {0}")]
    Thumbnail(#[from] ThumbnailError),
    #[error("DOM operation failed: {0}")]
    Dom(String),
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("could not decode source image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
    #[error("source image has no pixels")]
    EmptyImage,
    #[error("could not load source image: {0}")]
    Load(String),
    #[error("`{0}` points outside the image root")]
    OutsideRoot(String),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[cfg(feature = "ssr")]
    #[error(transparent)]
    JoinError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parent fit `{0}`, expected one of contain, cover, fill, none")]
pub struct ParseFitError(pub String);
