// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the preflight engine: order options, extracted
// metadata, the closed error/warning taxonomy, and the validation result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Millimetres per PDF point (1/72 inch).
pub const PT_TO_MM: f64 = 0.352778;

// -- Input ------------------------------------------------------------------

/// Role of the uploaded file within the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Cover,
    Content,
    /// Die-cut / crease / foil layer. Must use spot colors only.
    PostProcess,
}

/// Binding method of the ordered product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// Glued spine.
    Perfect,
    /// Stapled through the fold.
    Saddle,
    /// Coil / wire-o.
    Spring,
}

impl Binding {
    /// Whether the binding folds sheets into 4-page signatures.
    pub fn requires_multiple_of_four(&self) -> bool {
        matches!(self, Self::Perfect | Self::Saddle)
    }
}

/// A width/height pair in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizeMm {
    pub width: f64,
    pub height: f64,
}

impl SizeMm {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Convert a size measured in PDF points.
    pub fn from_points(width_pt: f64, height_pt: f64) -> Self {
        Self::new(width_pt * PT_TO_MM, height_pt * PT_TO_MM)
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        }
    }

    /// Grow both axes by `2 × bleed`.
    pub fn with_bleed(&self, bleed: f64) -> Self {
        Self::new(self.width + 2.0 * bleed, self.height + 2.0 * bleed)
    }

    /// Both axes within `tolerance` mm of `other` (inclusive).
    pub fn matches(&self, other: &SizeMm, tolerance: f64) -> bool {
        within(self.width, other.width, tolerance) && within(self.height, other.height, tolerance)
    }
}

impl std::fmt::Display for SizeMm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}×{:.1}mm", self.width, self.height)
    }
}

/// Inclusive tolerance comparison.
///
/// Differences are rounded to a hundredth of a millimetre first so that
/// a value exactly `tolerance` off passes despite float noise from the
/// point→mm conversion.
pub fn within(actual: f64, expected: f64, tolerance: f64) -> bool {
    let diff = ((actual - expected).abs() * 100.0).round() / 100.0;
    diff <= tolerance
}

/// What the customer ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOptions {
    /// Trim size of a single page.
    pub size: SizeMm,
    /// Ordered page count (interior pages for covers).
    pub page_count: u32,
    pub binding: Binding,
    /// Bleed per edge in mm.
    #[serde(default)]
    pub bleed: f64,
    /// Paper thickness per leaf in mm; enables the spine rule for covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_thickness: Option<f64>,
}

/// Per-call validation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    pub file_type: FileType,
    pub order_options: OrderOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
}

// -- Metadata ---------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "CMYK")]
    Cmyk,
}

/// Confidence of a heuristic verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadType {
    #[default]
    Single,
    Spread,
    /// Heterogeneous page widths, typically cover and content in one file.
    Mixed,
}

/// Outcome of spread detection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadInfo {
    pub is_spread: bool,
    /// 0..=100
    pub score: u32,
    pub confidence: Confidence,
    pub detected_type: SpreadType,
}

/// Process ink usage of one rendered page, in percent of page area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInkCoverage {
    /// 1-based page number.
    pub page: u32,
    pub cyan: f64,
    pub magenta: f64,
    pub yellow: f64,
    pub black: f64,
}

impl PageInkCoverage {
    pub fn total(&self) -> f64 {
        self.cyan + self.magenta + self.yellow + self.black
    }
}

/// Everything the engine learned about the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    pub page_count: u32,
    /// First page size.
    pub page_size: SizeMm,
    pub page_sizes: Vec<SizeMm>,
    pub has_bleed: bool,
    pub bleed_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spine_size: Option<f64>,
    pub color_mode: ColorMode,
    pub color_confidence: Confidence,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ink_coverage: Vec<PageInkCoverage>,
    /// Lowest effective image DPI, if the file places any raster images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
    pub image_count: u32,
    pub spread_info: SpreadInfo,
    pub has_spot_colors: bool,
    pub spot_colors: Vec<String>,
    pub has_transparency: bool,
    pub has_overprint: bool,
    /// Why a detector fell back to a weaker verdict.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub analysis_notes: Vec<String>,
}

/// The fields a single stage contributes to [`PdfMetadata`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataPatch {
    pub page_count: Option<u32>,
    pub page_sizes: Option<Vec<SizeMm>>,
    pub has_bleed: Option<bool>,
    pub bleed_size: Option<f64>,
    pub spine_size: Option<f64>,
    pub color_mode: Option<ColorMode>,
    pub color_confidence: Option<Confidence>,
    pub ink_coverage: Option<Vec<PageInkCoverage>>,
    pub resolution: Option<f64>,
    pub image_count: Option<u32>,
    pub spread_info: Option<SpreadInfo>,
    pub spot_colors: Option<Vec<String>>,
    pub has_transparency: Option<bool>,
    pub has_overprint: Option<bool>,
    pub notes: Vec<String>,
}

impl PdfMetadata {
    /// Assign every field the patch sets; notes are appended.
    pub fn apply(&mut self, patch: MetadataPatch) {
        if let Some(count) = patch.page_count {
            self.page_count = count;
        }
        if let Some(sizes) = patch.page_sizes {
            self.page_size = sizes.first().copied().unwrap_or_default();
            self.page_sizes = sizes;
        }
        if let Some(has_bleed) = patch.has_bleed {
            self.has_bleed = has_bleed;
        }
        if let Some(bleed) = patch.bleed_size {
            self.bleed_size = bleed;
        }
        if let Some(spine) = patch.spine_size {
            self.spine_size = Some(spine);
        }
        if let Some(mode) = patch.color_mode {
            self.color_mode = mode;
        }
        if let Some(confidence) = patch.color_confidence {
            self.color_confidence = confidence;
        }
        if let Some(coverage) = patch.ink_coverage {
            self.ink_coverage = coverage;
        }
        if let Some(dpi) = patch.resolution {
            self.resolution = Some(dpi);
        }
        if let Some(count) = patch.image_count {
            self.image_count = count;
        }
        if let Some(spread) = patch.spread_info {
            self.spread_info = spread;
        }
        if let Some(spots) = patch.spot_colors {
            self.has_spot_colors = !spots.is_empty();
            self.spot_colors = spots;
        }
        if let Some(transparency) = patch.has_transparency {
            self.has_transparency = transparency;
        }
        if let Some(overprint) = patch.has_overprint {
            self.has_overprint = overprint;
        }
        self.analysis_notes.extend(patch.notes);
    }
}

// -- Findings ---------------------------------------------------------------

/// Blocking defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnsupportedFormat,
    FileCorrupted,
    FileTooLarge,
    PageCountInvalid,
    PageCountExceeded,
    SizeMismatch,
    SpineSizeMismatch,
    SaddleStitchInvalid,
    PostProcessCmyk,
}

/// Non-blocking findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    PageCountMismatch,
    BleedMissing,
    ResolutionLow,
    LandscapePage,
    CenterObjectCheck,
    MixedPdf,
    CmykStructureDetected,
    TransparencyDetected,
    OverprintDetected,
}

/// Remediation the conversion stage can apply automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FixMethod {
    AddBlankPages,
    ExtendBleed,
    AdjustSpine,
    ResizeWithPadding,
}

/// Structured context attached to a finding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_page_count: Option<u32>,
    /// Set on findings that are advice rather than a defect.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub advisory: bool,
}

impl IssueDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected(mut self, value: impl Into<Value>) -> Self {
        self.expected = Some(value.into());
        self
    }

    pub fn actual(mut self, value: impl Into<Value>) -> Self {
        self.actual = Some(value.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn pages(mut self, pages: Vec<u32>) -> Self {
        self.pages = pages;
        self
    }

    pub fn suggested_page_count(mut self, count: u32) -> Self {
        self.suggested_page_count = Some(count);
        self
    }

    pub fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: IssueDetails,
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_method: Option<FixMethod>,
}

impl ValidationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: IssueDetails::default(),
            auto_fixable: false,
            fix_method: None,
        }
    }

    pub fn with_details(mut self, details: IssueDetails) -> Self {
        self.details = details;
        self
    }

    pub fn fixable_by(mut self, method: FixMethod) -> Self {
        self.auto_fixable = true;
        self.fix_method = Some(method);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub message: String,
    #[serde(default)]
    pub details: IssueDetails,
    pub auto_fixable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_method: Option<FixMethod>,
}

impl ValidationWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: IssueDetails::default(),
            auto_fixable: false,
            fix_method: None,
        }
    }

    pub fn with_details(mut self, details: IssueDetails) -> Self {
        self.details = details;
        self
    }

    pub fn fixable_by(mut self, method: FixMethod) -> Self {
        self.auto_fixable = true;
        self.fix_method = Some(method);
        self
    }
}

/// The sole output of a validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub metadata: PdfMetadata,
}

impl ValidationResult {
    /// Assemble a result; validity is derived from the error list.
    pub fn new(
        errors: Vec<ValidationError>,
        warnings: Vec<ValidationWarning>,
        metadata: PdfMetadata,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            metadata,
        }
    }

    /// Short-circuit result for a file that could not be analysed at all.
    pub fn rejected(error: ValidationError) -> Self {
        Self::new(vec![error], Vec::new(), PdfMetadata::default())
    }

    pub fn has_error(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}
