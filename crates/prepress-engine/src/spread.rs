// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spread detection.
//
// Decides whether a file was exported as two-page spreads rather than single
// pages. Geometry is first reduced to a `SpreadSignals` value; scoring is a
// pure function of those signals and the configured weights.

use prepress_core::{
    Confidence, IssueDetails, MetadataPatch, OrderOptions, SizeMm, SpreadInfo, SpreadType,
    SpreadWeights, ValidationWarning, WarningCode,
};
use serde_json::json;
use tracing::debug;

use crate::report::StageReport;

/// An order wider than this ratio is already a landscape single page.
const LANDSCAPE_ORDER_RATIO: f64 = 1.2;

/// Geometry facts the spread score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpreadSignals {
    pub page_count: u32,
    /// Pages within tolerance of the expected spread size.
    pub matching_pages: u32,
    /// Every page height is within tolerance of the ordered height.
    pub all_heights_match: bool,
    pub average_aspect_ratio: f64,
    /// Population standard deviation of page widths, in mm.
    pub width_std_dev: f64,
}

impl SpreadSignals {
    /// Reduce page geometry against the order.
    pub fn measure(page_sizes: &[SizeMm], order: &OrderOptions) -> Self {
        if page_sizes.is_empty() {
            return Self::default();
        }

        let expected = expected_spread_size(&order.size);
        let width_tolerance = 4.0 * order.bleed + 2.0;
        let height_tolerance = 2.0 * order.bleed + 2.0;
        let height_fits = |size: &SizeMm| (size.height - expected.height).abs() <= height_tolerance;

        let matching_pages = page_sizes
            .iter()
            .filter(|size| (size.width - expected.width).abs() <= width_tolerance && height_fits(*size))
            .count() as u32;

        let count = page_sizes.len() as f64;
        let average_aspect_ratio =
            page_sizes.iter().map(SizeMm::aspect_ratio).sum::<f64>() / count;
        let mean_width = page_sizes.iter().map(|s| s.width).sum::<f64>() / count;
        let variance = page_sizes
            .iter()
            .map(|s| (s.width - mean_width).powi(2))
            .sum::<f64>()
            / count;

        Self {
            page_count: page_sizes.len() as u32,
            matching_pages,
            all_heights_match: page_sizes.iter().all(height_fits),
            average_aspect_ratio,
            width_std_dev: variance.sqrt(),
        }
    }
}

/// Whether a spread for this order is two ordered pages side by side.
///
/// False for orders that are already clearly landscape; their spread size
/// is the order size itself.
pub fn spread_doubles_width(order: &SizeMm) -> bool {
    order.width <= order.height * LANDSCAPE_ORDER_RATIO
}

/// Size of one spread for the given single-page order.
pub fn expected_spread_size(order: &SizeMm) -> SizeMm {
    if spread_doubles_width(order) {
        SizeMm::new(order.width * 2.0, order.height)
    } else {
        *order
    }
}

/// Weighted score in `0..=100`.
pub fn score(signals: &SpreadSignals, weights: &SpreadWeights) -> u32 {
    if signals.page_count == 0 {
        return 0;
    }

    let mut score = 0;

    let match_ratio = f64::from(signals.matching_pages) / f64::from(signals.page_count);
    if signals.matching_pages == signals.page_count {
        score += weights.all_pages_match;
    } else if match_ratio >= weights.majority_ratio {
        score += weights.majority_match;
    }

    if signals.all_heights_match {
        score += weights.height_match;
    }
    if signals.average_aspect_ratio > weights.aspect_ratio_min {
        score += weights.aspect_ratio;
    }
    if signals.width_std_dev < weights.consistency_max_std_dev {
        score += weights.size_consistency;
    }

    score.min(100)
}

/// Classify signals into a [`SpreadInfo`].
pub fn classify(signals: &SpreadSignals, weights: &SpreadWeights) -> SpreadInfo {
    let score = score(signals, weights);
    let is_spread = score >= weights.threshold;
    let confidence = match score {
        80.. => Confidence::High,
        60..80 => Confidence::Medium,
        _ => Confidence::Low,
    };
    let detected_type = if signals.width_std_dev > weights.mixed_std_dev {
        SpreadType::Mixed
    } else if is_spread {
        SpreadType::Spread
    } else {
        SpreadType::Single
    };

    debug!(?signals, score, is_spread, ?detected_type, "spread scored");
    SpreadInfo {
        is_spread,
        score,
        confidence,
        detected_type,
    }
}

/// Spread stage: metadata plus the `MIXED_PDF` warning for heterogeneous
/// page widths.
pub fn spread_report(info: &SpreadInfo, signals: &SpreadSignals) -> StageReport {
    let mut report = StageReport::new().with_patch(MetadataPatch {
        spread_info: Some(info.clone()),
        ..Default::default()
    });

    if info.detected_type == SpreadType::Mixed {
        report = report.warning(
            ValidationWarning::new(
                WarningCode::MixedPdf,
                format!(
                    "Page widths vary by {:.1}mm; the file may combine cover and content pages",
                    signals.width_std_dev
                ),
            )
            .with_details(IssueDetails::new().actual(json!({
                "widthStdDev": signals.width_std_dev,
            }))),
        );
    }

    report
}
