// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auxiliary detectors: spot colors, transparency/overprint, and image
// resolution.
//
// The three are independent walks over the document the orchestrator has
// already parsed, so they run concurrently on the blocking pool against one
// shared `PdfInspector`. A detector that fails or overruns the tool timeout
// contributes an analysis note instead of a finding.

use std::sync::Arc;
use std::time::Duration;

use prepress_core::error::{PreflightError, Result};
use prepress_core::{
    IssueDetails, MetadataPatch, PreflightConfig, ValidationWarning, WarningCode,
};
use prepress_document::{
    PdfInspector, ResolutionReport, TransparencyReport, detect_transparency, find_spot_colors,
    measure_resolution,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::report::StageReport;

/// Run all three detectors and return their reports in stage order:
/// spot colors, transparency/overprint, resolution.
///
/// `file_size` is the submitted byte length, checked against the
/// large-file threshold.
pub async fn run_auxiliary(
    inspector: Arc<PdfInspector>,
    file_size: u64,
    config: &PreflightConfig,
) -> Vec<StageReport> {
    if file_size > config.large_file_threshold {
        info!(
            threshold = config.large_file_threshold,
            "file above large-file threshold, skipping auxiliary detectors"
        );
        return vec![StageReport::new().with_patch(MetadataPatch {
            notes: vec![
                "spot color, transparency and resolution checks skipped: file too large".into(),
            ],
            ..Default::default()
        })];
    }

    let timeout = config.tool_timeout();
    let (spots, transparency, resolution) = tokio::join!(
        run_detector("spot color", Arc::clone(&inspector), timeout, |inspector| {
            find_spot_colors(inspector.document())
        }),
        run_detector("transparency", Arc::clone(&inspector), timeout, detect_transparency),
        run_detector("resolution", inspector, timeout, measure_resolution),
    );

    vec![
        degrade("spot color", spots.map(spot_report)),
        degrade("transparency", transparency.map(transparency_report)),
        degrade(
            "resolution",
            resolution.map(|report| resolution_report(&report, config)),
        ),
    ]
}

/// Walk the shared document on the blocking pool under `timeout`.
///
/// A timed-out walk finishes on its pool thread and its result is dropped.
async fn run_detector<T, F>(
    label: &'static str,
    inspector: Arc<PdfInspector>,
    timeout: Duration,
    analyse: F,
) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&PdfInspector) -> T + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || analyse(&inspector));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(found)) => Ok(found),
        Ok(Err(join_err)) => Err(PreflightError::Inspection(format!(
            "{label} detector aborted: {join_err}"
        ))),
        Err(_) => Err(PreflightError::ToolTimeout {
            tool: format!("{label} detector"),
            millis: timeout.as_millis(),
        }),
    }
}

fn degrade(label: &str, outcome: Result<StageReport>) -> StageReport {
    outcome.unwrap_or_else(|err| {
        warn!(detector = label, %err, "auxiliary detector degraded");
        StageReport::new().with_patch(MetadataPatch {
            notes: vec![format!("{label} check skipped: {err}")],
            ..Default::default()
        })
    })
}

// -- Findings -------------------------------------------------------------------

fn spot_report(spots: Vec<String>) -> StageReport {
    debug!(?spots, "spot colors");
    StageReport::new().with_patch(MetadataPatch {
        spot_colors: Some(spots),
        ..Default::default()
    })
}

fn transparency_report(found: TransparencyReport) -> StageReport {
    let mut report = StageReport::new();

    if found.has_transparency() {
        report = report.warning(
            ValidationWarning::new(
                WarningCode::TransparencyDetected,
                format!(
                    "Transparency on {} page(s); it will be flattened for print",
                    found.transparency_pages.len()
                ),
            )
            .with_details(IssueDetails::new().pages(found.transparency_pages.clone())),
        );
    }
    if found.has_overprint() {
        report = report.warning(
            ValidationWarning::new(
                WarningCode::OverprintDetected,
                format!(
                    "Overprint is set on {} page(s); check the intended result",
                    found.overprint_pages.len()
                ),
            )
            .with_details(IssueDetails::new().pages(found.overprint_pages.clone())),
        );
    }

    report.with_patch(MetadataPatch {
        has_transparency: Some(found.has_transparency()),
        has_overprint: Some(found.has_overprint()),
        ..Default::default()
    })
}

fn resolution_report(found: &ResolutionReport, config: &PreflightConfig) -> StageReport {
    let mut report = StageReport::new().with_patch(MetadataPatch {
        image_count: Some(found.image_count()),
        resolution: found.min_dpi(),
        ..Default::default()
    });

    let Some(lowest) = found.min_dpi() else {
        return report;
    };

    let pages_below = |threshold: f64| {
        let mut pages: Vec<u32> = found.below(threshold).map(|p| p.page).collect();
        pages.dedup();
        pages
    };

    if lowest < config.min_acceptable_dpi {
        report = report.warning(
            ValidationWarning::new(
                WarningCode::ResolutionLow,
                format!(
                    "Image resolution as low as {lowest:.0} DPI; at least {:.0} DPI is needed for print",
                    config.min_acceptable_dpi
                ),
            )
            .with_details(
                IssueDetails::new()
                    .expected(config.min_acceptable_dpi)
                    .actual(json!(lowest.round()))
                    .pages(pages_below(config.min_acceptable_dpi)),
            ),
        );
    } else if lowest < config.recommended_dpi {
        report = report.warning(
            ValidationWarning::new(
                WarningCode::ResolutionLow,
                format!(
                    "Image resolution as low as {lowest:.0} DPI; {:.0} DPI is recommended",
                    config.recommended_dpi
                ),
            )
            .with_details(
                IssueDetails::new()
                    .expected(config.recommended_dpi)
                    .actual(json!(lowest.round()))
                    .pages(pages_below(config.recommended_dpi))
                    .advisory(),
            ),
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepress_document::SamplePdf;

    fn open(pdf: SamplePdf) -> (Arc<PdfInspector>, u64) {
        let bytes = pdf.build().unwrap();
        let inspector = PdfInspector::from_bytes(&bytes).unwrap();
        (Arc::new(inspector), bytes.len() as u64)
    }

    #[tokio::test]
    async fn reports_arrive_in_stage_order() {
        let (inspector, size) = open(
            SamplePdf::new()
                .page_mm(210.0, 297.0)
                .separation("CutContour")
                .page_mm(210.0, 297.0)
                .blend_mode("Multiply")
                .overprint()
                .image(100, 100, 25.4, 25.4),
        );

        let reports = run_auxiliary(Arc::clone(&inspector), size, &PreflightConfig::default()).await;
        assert_eq!(reports.len(), 3);
        // Every detector walked the one parsed document and released it.
        assert_eq!(Arc::strong_count(&inspector), 1);

        assert_eq!(reports[0].patch.spot_colors, Some(vec!["CutContour".to_string()]));

        let codes: Vec<_> = reports[1].warnings.iter().map(|w| w.code).collect();
        assert_eq!(
            codes,
            vec![WarningCode::TransparencyDetected, WarningCode::OverprintDetected]
        );
        assert_eq!(reports[1].warnings[0].details.pages, vec![2]);

        assert_eq!(reports[2].patch.image_count, Some(1));
        let low = &reports[2].warnings[0];
        assert_eq!(low.code, WarningCode::ResolutionLow);
        assert!(!low.details.advisory);
    }

    #[tokio::test]
    async fn mid_resolution_is_advisory() {
        let (inspector, size) =
            open(SamplePdf::new().page_mm(210.0, 297.0).image(200, 200, 25.4, 25.4));
        let reports = run_auxiliary(inspector, size, &PreflightConfig::default()).await;

        let warning = &reports[2].warnings[0];
        assert_eq!(warning.code, WarningCode::ResolutionLow);
        assert!(warning.details.advisory);
        assert_eq!(reports[2].patch.resolution.map(f64::round), Some(200.0));
    }

    #[tokio::test]
    async fn sharp_images_pass() {
        let (inspector, size) =
            open(SamplePdf::new().page_mm(210.0, 297.0).image(300, 300, 25.4, 25.4));
        let reports = run_auxiliary(inspector, size, &PreflightConfig::default()).await;
        assert!(reports.iter().all(StageReport::is_clean));
    }

    #[tokio::test]
    async fn large_files_are_skipped_with_a_note() {
        let (inspector, size) = open(SamplePdf::new().page_mm(210.0, 297.0).overprint());
        let config = PreflightConfig {
            large_file_threshold: 16,
            ..Default::default()
        };

        let reports = run_auxiliary(inspector, size, &config).await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].warnings.is_empty());
        assert_eq!(reports[0].patch.notes.len(), 1);
    }

    #[tokio::test]
    async fn aborted_detector_degrades_to_a_note() {
        let (inspector, _) = open(SamplePdf::new().page_mm(210.0, 297.0));
        let outcome = run_detector(
            "resolution",
            inspector,
            Duration::from_secs(5),
            |_: &PdfInspector| -> StageReport { panic!("walk failed") },
        )
        .await;

        let report = degrade("resolution", outcome);
        assert!(report.is_clean());
        assert_eq!(report.patch.notes.len(), 1);
        assert!(report.patch.notes[0].starts_with("resolution check skipped"));
    }

    #[tokio::test]
    async fn slow_detector_times_out() {
        let (inspector, _) = open(SamplePdf::new().page_mm(210.0, 297.0));
        let outcome = run_detector("spot color", inspector, Duration::from_millis(20), |_| {
            std::thread::sleep(Duration::from_millis(200));
        })
        .await;

        assert!(matches!(outcome, Err(PreflightError::ToolTimeout { .. })));
    }
}
