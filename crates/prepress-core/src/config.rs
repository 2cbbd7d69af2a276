// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.
//
// Loaded once at startup and injected into the orchestrator. The numeric
// defaults are the calibrated production values; tests vary them by building
// a config rather than touching shared state.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PreflightError, Result};

const MB: u64 = 1024 * 1024;

/// Weights and threshold for the spread scoring heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpreadWeights {
    /// Every page matches the expected spread size.
    pub all_pages_match: u32,
    /// At least `majority_ratio` of pages match the expected spread size.
    pub majority_match: u32,
    /// Fraction of matching pages that earns `majority_match`.
    pub majority_ratio: f64,
    /// Every page height matches the ordered height.
    pub height_match: u32,
    /// Average aspect ratio above `aspect_ratio_min`.
    pub aspect_ratio: u32,
    pub aspect_ratio_min: f64,
    /// Page widths are consistent (std-dev below `consistency_max_std_dev`).
    pub size_consistency: u32,
    pub consistency_max_std_dev: f64,
    /// Score at or above which the file is classified as spreads.
    pub threshold: u32,
    /// Width std-dev above which the file is classified as mixed.
    pub mixed_std_dev: f64,
}

impl Default for SpreadWeights {
    fn default() -> Self {
        Self {
            all_pages_match: 60,
            majority_match: 50,
            majority_ratio: 0.9,
            height_match: 20,
            aspect_ratio: 15,
            aspect_ratio_min: 1.25,
            size_consistency: 10,
            consistency_max_std_dev: 1.0,
            threshold: 70,
            mixed_std_dev: 10.0,
        }
    }
}

/// Process-wide preflight settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreflightConfig {
    /// Files larger than this are rejected with `FILE_TOO_LARGE`.
    pub max_file_size: u64,
    /// Hard upper bound on physical page count.
    pub max_pages: u32,
    /// Files larger than this skip external and auxiliary analysis.
    pub large_file_threshold: u64,
    /// Per-axis trim size tolerance in mm.
    pub size_tolerance_mm: f64,
    /// Cover width tolerance for the spine rule in mm.
    pub spine_tolerance_mm: f64,
    pub saddle_max_pages: u32,
    pub saddle_min_pages: u32,
    pub min_acceptable_dpi: f64,
    pub recommended_dpi: f64,
    pub spread: SpreadWeights,
    /// Hard timeout for a single external analysis, in milliseconds.
    pub tool_timeout_ms: u64,
    /// Ink coverage analyses at most this many pages.
    pub ink_coverage_max_pages: u32,
    /// Concurrent external-tool invocations per worker.
    pub tool_concurrency: usize,
    /// Ghostscript executable name or path.
    pub ghostscript_binary: String,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * MB,
            max_pages: 2000,
            large_file_threshold: 50 * MB,
            size_tolerance_mm: 1.0,
            spine_tolerance_mm: 2.0,
            saddle_max_pages: 64,
            saddle_min_pages: 8,
            min_acceptable_dpi: 150.0,
            recommended_dpi: 300.0,
            spread: SpreadWeights::default(),
            tool_timeout_ms: 5000,
            ink_coverage_max_pages: 50,
            tool_concurrency: 2,
            ghostscript_binary: "gs".into(),
        }
    }
}

impl PreflightConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.tool_concurrency == 0 {
            return Err(PreflightError::Config(
                "toolConcurrency must be at least 1".into(),
            ));
        }
        if self.size_tolerance_mm < 0.0 || self.spine_tolerance_mm < 0.0 {
            return Err(PreflightError::Config("tolerances must not be negative".into()));
        }
        if self.min_acceptable_dpi > self.recommended_dpi {
            return Err(PreflightError::Config(format!(
                "minAcceptableDpi ({}) exceeds recommendedDpi ({})",
                self.min_acceptable_dpi, self.recommended_dpi
            )));
        }
        if self.spread.threshold > 100 {
            return Err(PreflightError::Config(
                "spread threshold must be within 0..=100".into(),
            ));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_calibrated_values() {
        let config = PreflightConfig::default();
        assert_eq!(config.max_file_size, 100 * MB);
        assert_eq!(config.large_file_threshold, 50 * MB);
        assert_eq!(config.spread.threshold, 70);
        assert_eq!(config.tool_timeout(), Duration::from_secs(5));
        assert_eq!(config.tool_concurrency, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PreflightConfig =
            serde_json::from_str(r#"{"maxPages": 500, "spread": {"threshold": 75}}"#).unwrap();
        assert_eq!(config.max_pages, 500);
        assert_eq!(config.spread.threshold, 75);
        assert_eq!(config.spread.all_pages_match, 60);
        assert_eq!(config.saddle_max_pages, 64);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = PreflightConfig {
            tool_concurrency: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PreflightError::Config(_))));
    }
}
