use std::fmt;

use crate::options::ParentFit;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn ratio(&self) -> Option<f64> {
        (self.width > 0.0 && self.height > 0.0).then(|| self.width / self.height)
    }
}

/// Value of the `background-size` property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundSize {
    /// `100% auto`
    FitWidth,
    /// `auto 100%`
    FitHeight,
    /// `100% 100%`
    Stretch,
    /// `auto`
    Auto,
}

impl BackgroundSize {
    pub fn as_css(&self) -> &'static str {
        match self {
            BackgroundSize::FitWidth => "100% auto",
            BackgroundSize::FitHeight => "auto 100%",
            BackgroundSize::Stretch => "100% 100%",
            BackgroundSize::Auto => "auto",
        }
    }
}

impl fmt::Display for BackgroundSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_css())
    }
}

/// Picks the background size for an image of `intrinsic` size shown in a
/// `container`.
pub fn background_size(mode: ParentFit, intrinsic: Size, container: Size) -> BackgroundSize {
    let wider = || match (intrinsic.ratio(), container.ratio()) {
        (Some(image), Some(parent)) => Some(image > parent),
        _ => None,
    };

    match mode {
        ParentFit::Contain => match wider() {
            Some(true) => BackgroundSize::FitWidth,
            Some(false) => BackgroundSize::FitHeight,
            None => BackgroundSize::Auto,
        },
        ParentFit::Cover => match wider() {
            Some(true) => BackgroundSize::FitHeight,
            Some(false) => BackgroundSize::FitWidth,
            None => BackgroundSize::Auto,
        },
        ParentFit::Fill => BackgroundSize::Stretch,
        ParentFit::None => BackgroundSize::Auto,
    }
}

#[cfg(test)]
mod fit_tests {
    use super::*;

    const WIDE: Size = Size {
        width: 1600.0,
        height: 900.0,
    };
    const SQUARE: Size = Size {
        width: 300.0,
        height: 300.0,
    };
    const TALL: Size = Size {
        width: 400.0,
        height: 800.0,
    };

    #[test]
    fn contain_and_cover_are_opposites() {
        assert_eq!(
            background_size(ParentFit::Contain, WIDE, SQUARE),
            BackgroundSize::FitWidth
        );
        assert_eq!(
            background_size(ParentFit::Cover, WIDE, SQUARE),
            BackgroundSize::FitHeight
        );

        assert_eq!(
            background_size(ParentFit::Contain, TALL, SQUARE),
            BackgroundSize::FitHeight
        );
        assert_eq!(
            background_size(ParentFit::Cover, TALL, SQUARE),
            BackgroundSize::FitWidth
        );
    }

    #[test]
    fn equal_ratios_fit_height_for_contain() {
        assert_eq!(
            background_size(ParentFit::Contain, SQUARE, Size::new(50.0, 50.0)),
            BackgroundSize::FitHeight
        );
        assert_eq!(
            background_size(ParentFit::Cover, SQUARE, Size::new(50.0, 50.0)),
            BackgroundSize::FitWidth
        );
    }

    #[test]
    fn fill_always_stretches() {
        for (intrinsic, container) in [(WIDE, SQUARE), (TALL, WIDE), (SQUARE, Size::new(0.0, 0.0))] {
            let size = background_size(ParentFit::Fill, intrinsic, container);
            assert_eq!(size.as_css(), "100% 100%");
        }
    }

    #[test]
    fn none_and_degenerate_sizes_are_auto() {
        assert_eq!(
            background_size(ParentFit::None, WIDE, SQUARE),
            BackgroundSize::Auto
        );
        assert_eq!(
            background_size(ParentFit::Contain, WIDE, Size::new(300.0, 0.0)),
            BackgroundSize::Auto
        );
    }
}
