// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Two-stage color-mode decision.
//
// Stage one is the structural byte scan. Only when it suspects CMYK is the
// ink-coverage probe consulted, and any probe failure degrades to the
// structural verdict at low confidence instead of failing the call. A file
// suspected only through `/DeviceN` has no CMYK signature, so without a
// measurement it stays RGB.

use prepress_core::{
    ColorMode, Confidence, ErrorCode, FileType, IssueDetails, MetadataPatch, PageInkCoverage,
    PreflightConfig, ValidationError, ValidationWarning, WarningCode,
};
use prepress_core::error::PreflightError;
use prepress_document::StructuralScan;
use tracing::{debug, info, instrument, warn};

use crate::ink::{InkCoverageProbe, ToolLimiter};
use crate::report::StageReport;

/// Total coverage (percent, all four inks) below which a page counts as
/// carrying no process ink.
const NO_INK_EPSILON: f64 = 0.01;

/// Outcome of the color decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorVerdict {
    pub mode: ColorMode,
    pub confidence: Confidence,
    /// Per-page coverage when the probe ran successfully.
    pub coverage: Vec<PageInkCoverage>,
    /// Why the verdict is weaker than it could be.
    pub note: Option<String>,
}

impl ColorVerdict {
    fn structural(mode: ColorMode, confidence: Confidence, note: Option<String>) -> Self {
        Self {
            mode,
            confidence,
            coverage: Vec::new(),
            note,
        }
    }
}

/// Decide the color mode of `data`.
///
/// Never fails: tool problems become a low-confidence structural verdict
/// with a note.
#[instrument(skip_all, fields(bytes_len = data.len(), suspected = scan.suspected_cmyk))]
pub async fn decide_color_mode<P: InkCoverageProbe>(
    scan: &StructuralScan,
    data: &[u8],
    probe: &P,
    limiter: &ToolLimiter,
    config: &PreflightConfig,
) -> ColorVerdict {
    if !scan.suspected_cmyk {
        debug!("no CMYK signature, skipping ink coverage");
        return ColorVerdict::structural(ColorMode::Rgb, Confidence::Medium, None);
    }

    let structural_mode = if scan.has_cmyk_signature {
        ColorMode::Cmyk
    } else {
        ColorMode::Rgb
    };

    if !probe.is_available().await {
        warn!(tool = probe.name(), "ink coverage tool unavailable, using structural verdict");
        return ColorVerdict::structural(
            structural_mode,
            Confidence::Low,
            Some(format!(
                "color mode estimated from structure only: {} unavailable",
                probe.name()
            )),
        );
    }

    if data.len() as u64 > config.large_file_threshold {
        info!(
            threshold = config.large_file_threshold,
            "file above large-file threshold, skipping ink coverage"
        );
        return ColorVerdict::structural(
            structural_mode,
            Confidence::Low,
            Some("color mode estimated from structure only: file too large for ink coverage".into()),
        );
    }

    match measure_bounded(data, probe, limiter, config).await {
        Ok(coverage) => {
            let refuted = coverage.iter().all(|page| page.total() < NO_INK_EPSILON);
            let mode = if refuted { ColorMode::Rgb } else { ColorMode::Cmyk };
            info!(pages = coverage.len(), ?mode, "ink coverage measured");
            ColorVerdict {
                mode,
                confidence: Confidence::High,
                coverage,
                note: None,
            }
        }
        Err(err) => {
            warn!(tool = probe.name(), %err, "ink coverage failed, using structural verdict");
            ColorVerdict::structural(
                structural_mode,
                Confidence::Low,
                Some(format!("color mode estimated from structure only: {err}")),
            )
        }
    }
}

/// Run the probe under the shared limiter and the tool timeout.
///
/// The timeout also covers waiting for a permit. On expiry the probe future
/// is dropped, which kills any subprocess it spawned.
async fn measure_bounded<P: InkCoverageProbe>(
    data: &[u8],
    probe: &P,
    limiter: &ToolLimiter,
    config: &PreflightConfig,
) -> Result<Vec<PageInkCoverage>, PreflightError> {
    let timeout = config.tool_timeout();
    let run = async {
        let _permit = limiter.acquire().await?;
        let coverage = probe.measure(data, config.ink_coverage_max_pages).await?;
        Ok::<_, PreflightError>(coverage)
    };

    tokio::time::timeout(timeout, run)
        .await
        .map_err(|_| PreflightError::ToolTimeout {
            tool: probe.name().to_string(),
            millis: timeout.as_millis(),
        })?
}

/// Color stage findings for a verdict.
pub fn color_report(verdict: ColorVerdict, file_type: FileType) -> StageReport {
    let mut report = StageReport::new();

    if verdict.mode == ColorMode::Cmyk {
        let inked_pages = verdict
            .coverage
            .iter()
            .filter(|page| page.total() >= NO_INK_EPSILON)
            .map(|page| page.page)
            .collect();
        let details = IssueDetails::new().actual("CMYK").pages(inked_pages);
        if file_type == FileType::PostProcess {
            report = report.error(
                ValidationError::new(
                    ErrorCode::PostProcessCmyk,
                    "Post-processing files must use spot colors only, but CMYK content was found",
                )
                .with_details(details.expected("spot colors only")),
            );
        } else {
            report = report.warning(
                ValidationWarning::new(
                    WarningCode::CmykStructureDetected,
                    "The file contains CMYK color; check it was prepared for print",
                )
                .with_details(details),
            );
        }
    }

    report.with_patch(MetadataPatch {
        color_mode: Some(verdict.mode),
        color_confidence: Some(verdict.confidence),
        ink_coverage: Some(verdict.coverage),
        notes: verdict.note.into_iter().collect(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use prepress_core::error::Result;

    use crate::ink::NullProbe;

    /// Returns fixed coverage and counts invocations.
    struct ScriptedProbe {
        coverage: Vec<PageInkCoverage>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn with_total(per_ink: f64) -> Self {
            Self {
                coverage: vec![PageInkCoverage {
                    page: 1,
                    cyan: per_ink,
                    magenta: per_ink,
                    yellow: per_ink,
                    black: per_ink,
                }],
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl InkCoverageProbe for ScriptedProbe {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn measure(&self, _data: &[u8], _max_pages: u32) -> Result<Vec<PageInkCoverage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.coverage.clone())
        }
    }

    struct FailingProbe;

    impl InkCoverageProbe for FailingProbe {
        fn name(&self) -> &str {
            "failing"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn measure(&self, _data: &[u8], _max_pages: u32) -> Result<Vec<PageInkCoverage>> {
            Err(PreflightError::ToolFailed("exit status 1".into()))
        }
    }

    struct SleepingProbe;

    impl InkCoverageProbe for SleepingProbe {
        fn name(&self) -> &str {
            "sleeping"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn measure(&self, _data: &[u8], _max_pages: u32) -> Result<Vec<PageInkCoverage>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn suspected() -> StructuralScan {
        StructuralScan {
            has_cmyk_signature: true,
            suspected_cmyk: true,
            ..Default::default()
        }
    }

    fn device_n_only() -> StructuralScan {
        StructuralScan {
            has_cmyk_signature: false,
            suspected_cmyk: true,
            ..Default::default()
        }
    }

    fn fast_config() -> PreflightConfig {
        PreflightConfig {
            tool_timeout_ms: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_suspicion_never_calls_the_tool() {
        let probe = ScriptedProbe::with_total(10.0);
        let verdict = decide_color_mode(
            &StructuralScan::default(),
            b"%PDF-1.4",
            &probe,
            &ToolLimiter::new(1),
            &PreflightConfig::default(),
        )
        .await;

        assert_eq!(verdict.mode, ColorMode::Rgb);
        assert_eq!(verdict.confidence, Confidence::Medium);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn measured_ink_confirms_cmyk() {
        let probe = ScriptedProbe::with_total(5.0);
        let verdict = decide_color_mode(
            &suspected(),
            b"%PDF-1.4",
            &probe,
            &ToolLimiter::new(1),
            &PreflightConfig::default(),
        )
        .await;

        assert_eq!(verdict.mode, ColorMode::Cmyk);
        assert_eq!(verdict.confidence, Confidence::High);
        assert_eq!(verdict.coverage.len(), 1);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_ink_refutes_cmyk() {
        let probe = ScriptedProbe::with_total(0.0);
        let verdict = decide_color_mode(
            &suspected(),
            b"%PDF-1.4",
            &probe,
            &ToolLimiter::new(1),
            &PreflightConfig::default(),
        )
        .await;

        assert_eq!(verdict.mode, ColorMode::Rgb);
        assert_eq!(verdict.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn unavailable_tool_degrades() {
        let verdict = decide_color_mode(
            &suspected(),
            b"%PDF-1.4",
            &NullProbe,
            &ToolLimiter::new(1),
            &PreflightConfig::default(),
        )
        .await;

        assert_eq!(verdict.mode, ColorMode::Cmyk);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert!(verdict.note.unwrap().contains("structure only"));
    }

    #[tokio::test]
    async fn large_files_skip_the_tool() {
        let probe = ScriptedProbe::with_total(5.0);
        let config = PreflightConfig {
            large_file_threshold: 4,
            ..Default::default()
        };
        let verdict =
            decide_color_mode(&suspected(), b"%PDF-1.4", &probe, &ToolLimiter::new(1), &config)
                .await;

        assert_eq!(verdict.confidence, Confidence::Low);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_tool_degrades() {
        let verdict = decide_color_mode(
            &suspected(),
            b"%PDF-1.4",
            &FailingProbe,
            &ToolLimiter::new(1),
            &fast_config(),
        )
        .await;

        assert_eq!(verdict.mode, ColorMode::Cmyk);
        assert_eq!(verdict.confidence, Confidence::Low);
        assert!(verdict.note.is_some());
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let limiter = ToolLimiter::new(1);
        let verdict =
            decide_color_mode(&suspected(), b"%PDF-1.4", &SleepingProbe, &limiter, &fast_config())
                .await;

        assert_eq!(verdict.confidence, Confidence::Low);
        assert!(verdict.note.unwrap().contains("timed out"));
        // The permit was released with the cancelled run.
        assert_eq!(limiter.available_permits(), 1);
    }

    #[test]
    fn post_process_cmyk_is_an_error() {
        let verdict = ColorVerdict::structural(ColorMode::Cmyk, Confidence::Low, None);
        let report = color_report(verdict.clone(), FileType::PostProcess);
        assert_eq!(report.errors[0].code, ErrorCode::PostProcessCmyk);
        assert!(report.warnings.is_empty());

        let report = color_report(verdict, FileType::Content);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings[0].code, WarningCode::CmykStructureDetected);
    }

    #[test]
    fn rgb_verdict_has_no_findings() {
        let verdict = ColorVerdict::structural(ColorMode::Rgb, Confidence::Medium, None);
        let report = color_report(verdict, FileType::PostProcess);
        assert!(report.is_clean());
        assert_eq!(report.patch.color_mode, Some(ColorMode::Rgb));
    }

    #[tokio::test]
    async fn device_n_without_measurement_stays_rgb() {
        let limiter = ToolLimiter::new(1);
        let unavailable =
            decide_color_mode(&device_n_only(), b"%PDF-1.4", &NullProbe, &limiter, &fast_config())
                .await;
        assert_eq!(unavailable.mode, ColorMode::Rgb);
        assert_eq!(unavailable.confidence, Confidence::Low);
        assert!(unavailable.note.is_some());

        let failed =
            decide_color_mode(&device_n_only(), b"%PDF-1.4", &FailingProbe, &limiter, &fast_config())
                .await;
        assert_eq!(failed.mode, ColorMode::Rgb);
        assert_eq!(failed.confidence, Confidence::Low);

        let report = color_report(unavailable, FileType::PostProcess);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn device_n_with_measured_ink_is_cmyk() {
        let probe = ScriptedProbe::with_total(5.0);
        let verdict = decide_color_mode(
            &device_n_only(),
            b"%PDF-1.4",
            &probe,
            &ToolLimiter::new(1),
            &PreflightConfig::default(),
        )
        .await;

        assert_eq!(verdict.mode, ColorMode::Cmyk);
        assert_eq!(verdict.confidence, Confidence::High);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }
}
