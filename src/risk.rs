//! Risk tiers and the threshold configuration that maps k values onto them.

use std::fmt;

use serde::Serialize;

use crate::error::{ConfigurationError, InvariantViolation, Result};

/// Re-identification risk tier derived from a k-anonymity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::High => "high",
            RiskTier::Medium => "medium",
            RiskTier::Low => "low",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold bands for tier classification.
///
/// `high_max` is the largest k still classified high risk; `medium_max` is
/// the smallest k classified low risk. The defaults follow the common
/// k >= 10 adequacy convention: k in {1, 2} is high, k in [3, 9] is medium,
/// k >= 10 is low. Both bounds are caller configuration, not constants of
/// the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskThresholds {
    high_max: usize,
    medium_max: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_max: 2,
            medium_max: 10,
        }
    }
}

impl RiskThresholds {
    /// Build thresholds, requiring `1 <= high_max < medium_max`.
    pub fn new(high_max: usize, medium_max: usize) -> Result<Self> {
        if high_max < 1 || high_max >= medium_max {
            return Err(ConfigurationError::InvalidThresholds {
                high_max,
                medium_max,
            }
            .into());
        }
        Ok(Self {
            high_max,
            medium_max,
        })
    }

    pub fn high_max(&self) -> usize {
        self.high_max
    }

    pub fn medium_max(&self) -> usize {
        self.medium_max
    }

    /// Map a k-anonymity value to its tier.
    ///
    /// k below 1 cannot come out of a valid partition; it is rejected as an
    /// invariant violation rather than clamped.
    pub fn classify(&self, k: usize) -> Result<RiskTier> {
        if k < 1 {
            return Err(InvariantViolation::InvalidK { k }.into());
        }
        if k <= self.high_max {
            Ok(RiskTier::High)
        } else if k < self.medium_max {
            Ok(RiskTier::Medium)
        } else {
            Ok(RiskTier::Low)
        }
    }
}
