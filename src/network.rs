use std::str::FromStr;

use crate::options::QualityTier;

/// `navigator.connection.effectiveType` as reported by the browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
}

impl EffectiveType {
    pub fn is_constrained(&self) -> bool {
        matches!(self, EffectiveType::Slow2g | EffectiveType::TwoG)
    }
}

impl FromStr for EffectiveType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slow-2g" => Ok(EffectiveType::Slow2g),
            "2g" => Ok(EffectiveType::TwoG),
            "3g" => Ok(EffectiveType::ThreeG),
            "4g" => Ok(EffectiveType::FourG),
            _ => Err(()),
        }
    }
}

/// Quality tier to use given whether adaptation is requested and what the
/// network reports. Unknown connections are treated as fast.
pub fn quality_for(adaptive: bool, effective: Option<EffectiveType>) -> QualityTier {
    match effective {
        Some(kind) if adaptive && kind.is_constrained() => QualityTier::Low,
        _ => QualityTier::High,
    }
}
