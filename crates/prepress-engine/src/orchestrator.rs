// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validation pipeline.
//
// Runs the stages in order: file-size gate → parse → page count → size and
// bleed → spine → orientation → saddle → spread → structural color scan →
// color decision → spot colors, transparency/overprint and resolution
// (concurrently). Only the first two stages can end the run early; every
// later stage contributes findings and the call always returns a complete
// `ValidationResult`.

use std::sync::Arc;

use prepress_core::error::PreflightError;
use prepress_core::{
    ErrorCode, MetadataPatch, PreflightConfig, ValidationError, ValidationOptions,
    ValidationResult,
};
use prepress_document::{PageLayout, PdfInspector, scan_color_structure};
use tracing::{debug, info, instrument, warn};

use crate::auxiliary::run_auxiliary;
use crate::color::{color_report, decide_color_mode};
use crate::ink::{InkCoverageProbe, ToolLimiter};
use crate::report::{ReportFold, StageReport};
use crate::rules::{self, RuleInput};
use crate::spread::{self, SpreadSignals};

/// The preflight engine.
///
/// Holds only immutable configuration and shared handles, so one instance
/// serves any number of concurrent `validate` calls.
pub struct Preflight<P: InkCoverageProbe> {
    config: PreflightConfig,
    probe: P,
    limiter: ToolLimiter,
}

impl<P: InkCoverageProbe> Preflight<P> {
    /// `limiter` is owned by the host and may be shared with other
    /// engines in the same process.
    pub fn new(config: PreflightConfig, probe: P, limiter: ToolLimiter) -> Self {
        Self {
            config,
            probe,
            limiter,
        }
    }

    /// Validate one submitted file against its order.
    ///
    /// Dropping the returned future cancels the run and kills any external
    /// tool it started.
    #[instrument(skip_all, fields(bytes_len = data.len(), file_type = ?options.file_type))]
    pub async fn validate(&self, data: &[u8], options: &ValidationOptions) -> ValidationResult {
        if let Some(error) = rules::check_file_size(data.len() as u64, options, &self.config) {
            info!(code = ?error.code, "rejected before parsing");
            return ValidationResult::rejected(error);
        }

        let (inspector, layout) = match open_document(Arc::from(data)).await {
            Ok(opened) => opened,
            Err(err) => {
                warn!(%err, "PDF could not be opened");
                return ValidationResult::rejected(parse_failure(&err));
            }
        };
        debug!(pages = layout.page_count, "layout extracted");

        // Spread classification is pure and feeds the page-count, size and
        // orientation rules, so it is computed up front and reported at its
        // own position in the stage order.
        let signals = SpreadSignals::measure(&layout.page_sizes, &options.order_options);
        let spread_info = spread::classify(&signals, &self.config.spread);

        let input = RuleInput {
            options,
            config: &self.config,
            layout: &layout,
            is_spread: spread_info.is_spread,
        };

        let mut fold = ReportFold::new();
        fold.absorb(StageReport::new().with_patch(MetadataPatch {
            page_sizes: Some(layout.page_sizes.clone()),
            ..Default::default()
        }));
        fold.absorb(rules::page_count_rule(&input));
        fold.absorb(rules::size_rule(&input));
        fold.absorb(rules::spine_rule(&input));
        fold.absorb(rules::orientation_rule(&input));
        fold.absorb(rules::saddle_rule(&input));
        fold.absorb(spread::spread_report(&spread_info, &signals));

        let scan = scan_color_structure(data);
        debug!(signatures = ?scan.signatures, suspected = scan.suspected_cmyk, "structural scan");
        // Spot names seen by the byte scan stand until the object-graph
        // detector replaces them.
        fold.absorb(StageReport::new().with_patch(MetadataPatch {
            spot_colors: Some(scan.spot_names.clone()),
            ..Default::default()
        }));

        let verdict =
            decide_color_mode(&scan, data, &self.probe, &self.limiter, &self.config).await;
        fold.absorb(color_report(verdict, options.file_type));

        for report in run_auxiliary(inspector, data.len() as u64, &self.config).await {
            fold.absorb(report);
        }

        let result = fold.finish();
        info!(
            is_valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validation finished"
        );
        result
    }
}

/// Parse once on the blocking pool and read the page tree. The parsed
/// document is shared with the auxiliary detectors.
async fn open_document(
    data: Arc<[u8]>,
) -> Result<(Arc<PdfInspector>, PageLayout), PreflightError> {
    tokio::task::spawn_blocking(move || {
        let inspector = PdfInspector::from_bytes(&data)?;
        let layout = inspector.layout();
        Ok::<_, PreflightError>((Arc::new(inspector), layout))
    })
    .await
    .map_err(|err| PreflightError::Inspection(format!("PDF parsing aborted: {err}")))?
}

fn parse_failure(err: &PreflightError) -> ValidationError {
    match err {
        PreflightError::UnsupportedFormat(_) => ValidationError::new(
            ErrorCode::UnsupportedFormat,
            "The file is not a PDF document",
        ),
        _ => ValidationError::new(
            ErrorCode::FileCorrupted,
            format!("The PDF could not be read: {err}"),
        ),
    }
}
