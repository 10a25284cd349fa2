//! Run configuration for merging and classification.
//!
//! Values are validated when they are set, so a misconfigured run fails
//! before any record is read.

use crate::interval::Position;
use thiserror::Error;

/// Default upstream window for 5' associations.
pub const DEFAULT_MAX_DIST_5_PRIME: Position = 300;

/// Default flanking window for antisense associations.
pub const DEFAULT_MAX_DIST_ANTISENSE: Position = 100;

/// Separator placed between the names of fused intervals.
pub const MERGE_SEPARATOR: &str = "_merged_with_";

/// Errors raised while building a configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Minimum overlap percentage must be in (0, 100], got {0}")]
    InvalidPercentage(f64),

    #[error("{name} must not be negative, got {value}")]
    NegativeDistance { name: &'static str, value: Position },
}

/// Interval merger configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    min_overlap_percentage: Option<f64>,
    perform_merging: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeConfig {
    /// Any positive overlap qualifies, overlapping intervals are fused.
    pub fn new() -> Self {
        Self {
            min_overlap_percentage: None,
            perform_merging: true,
        }
    }

    /// Require the overlap to cover at least `percentage` of both intervals.
    pub fn with_min_overlap_percentage(mut self, percentage: f64) -> Result<Self, ConfigError> {
        // NaN fails both comparisons
        if !(percentage > 0.0 && percentage <= 100.0) {
            return Err(ConfigError::InvalidPercentage(percentage));
        }
        self.min_overlap_percentage = Some(percentage);
        Ok(self)
    }

    /// When disabled, an overlapping newcomer is dropped and the first-seen interval kept.
    pub fn with_merging(mut self, perform_merging: bool) -> Self {
        self.perform_merging = perform_merging;
        self
    }

    #[inline]
    pub fn min_overlap_percentage(&self) -> Option<f64> {
        self.min_overlap_percentage
    }

    #[inline]
    pub fn perform_merging(&self) -> bool {
        self.perform_merging
    }
}

/// TSS classifier configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyConfig {
    max_dist_5_prime: Position,
    max_dist_antisense: Position,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            max_dist_5_prime: DEFAULT_MAX_DIST_5_PRIME,
            max_dist_antisense: DEFAULT_MAX_DIST_ANTISENSE,
        }
    }
}

impl ClassifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest distance upstream of a gene at which a TSS is still 5' associated.
    pub fn with_max_dist_5_prime(mut self, distance: Position) -> Result<Self, ConfigError> {
        if distance < 0 {
            return Err(ConfigError::NegativeDistance {
                name: "max_dist_5_prime",
                value: distance,
            });
        }
        self.max_dist_5_prime = distance;
        Ok(self)
    }

    /// Flank on both sides of a gene in which an opposite-strand TSS is antisense.
    pub fn with_max_dist_antisense(mut self, distance: Position) -> Result<Self, ConfigError> {
        if distance < 0 {
            return Err(ConfigError::NegativeDistance {
                name: "max_dist_antisense",
                value: distance,
            });
        }
        self.max_dist_antisense = distance;
        Ok(self)
    }

    #[inline]
    pub fn max_dist_5_prime(&self) -> Position {
        self.max_dist_5_prime
    }

    #[inline]
    pub fn max_dist_antisense(&self) -> Position {
        self.max_dist_antisense
    }
}
