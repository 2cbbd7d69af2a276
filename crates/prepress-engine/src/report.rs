// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-stage partial results.
//
// Every rule and detector returns its own `StageReport`; the orchestrator
// folds them into a `ValidationResult` by concatenating findings and
// applying metadata patches in stage order.

use prepress_core::{
    MetadataPatch, PdfMetadata, ValidationError, ValidationResult, ValidationWarning,
};

/// Findings and metadata produced by one stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub patch: MetadataPatch,
}

impl StageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(mut self, error: ValidationError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn warning(mut self, warning: ValidationWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn with_patch(mut self, patch: MetadataPatch) -> Self {
        self.patch = patch;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Folds stage reports into a final result.
#[derive(Debug, Default)]
pub struct ReportFold {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
    metadata: PdfMetadata,
}

impl ReportFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, report: StageReport) {
        self.errors.extend(report.errors);
        self.warnings.extend(report.warnings);
        self.metadata.apply(report.patch);
    }

    pub fn metadata(&self) -> &PdfMetadata {
        &self.metadata
    }

    pub fn finish(self) -> ValidationResult {
        ValidationResult::new(self.errors, self.warnings, self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepress_core::{ErrorCode, WarningCode};

    #[test]
    fn fold_concatenates_in_order() {
        let mut fold = ReportFold::new();
        fold.absorb(
            StageReport::new()
                .warning(ValidationWarning::new(WarningCode::BleedMissing, "first")),
        );
        fold.absorb(
            StageReport::new()
                .error(ValidationError::new(ErrorCode::SizeMismatch, "second"))
                .warning(ValidationWarning::new(WarningCode::LandscapePage, "third")),
        );

        let result = fold.finish();
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        let codes: Vec<_> = result.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::BleedMissing, WarningCode::LandscapePage]);
    }

    #[test]
    fn later_patches_override_earlier_fields() {
        let mut fold = ReportFold::new();
        fold.absorb(StageReport::new().with_patch(MetadataPatch {
            page_count: Some(3),
            notes: vec!["a".into()],
            ..Default::default()
        }));
        fold.absorb(StageReport::new().with_patch(MetadataPatch {
            page_count: Some(4),
            notes: vec!["b".into()],
            ..Default::default()
        }));

        let result = fold.finish();
        assert!(result.is_valid);
        assert_eq!(result.metadata.page_count, 4);
        assert_eq!(result.metadata.analysis_notes, vec!["a", "b"]);
    }
}
