// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rule-based validation of page count, trim size, bleed, spine width,
// orientation, and saddle-stitch constraints.
//
// Every rule is a pure function of a `RuleInput` and returns its own
// `StageReport`.

use prepress_core::{
    Binding, ErrorCode, FileType, FixMethod, IssueDetails, MetadataPatch, PreflightConfig, SizeMm,
    ValidationError, ValidationOptions, ValidationWarning, WarningCode, within,
};
use prepress_document::PageLayout;
use serde_json::json;

use crate::report::StageReport;
use crate::spread::{expected_spread_size, spread_doubles_width};

/// Valid physical page counts for a cover file: flat, front/back, or
/// outside/inside pairs.
const COVER_PAGE_COUNTS: [u32; 3] = [1, 2, 4];

/// Everything the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub options: &'a ValidationOptions,
    pub config: &'a PreflightConfig,
    pub layout: &'a PageLayout,
    /// The file was classified as two-page spreads.
    pub is_spread: bool,
}

impl RuleInput<'_> {
    fn is_content(&self) -> bool {
        self.options.file_type == FileType::Content
    }

    /// Spread content whose every physical page carries two ordered pages.
    /// A landscape order can score as a spread without that being true.
    fn holds_page_pairs(&self) -> bool {
        self.is_content()
            && self.is_spread
            && spread_doubles_width(&self.options.order_options.size)
    }

    /// Page count as the customer counts pages: each spread holds two.
    pub fn logical_page_count(&self) -> u32 {
        if self.holds_page_pairs() {
            self.layout.page_count * 2
        } else {
            self.layout.page_count
        }
    }

    fn max_pages(&self) -> u32 {
        self.options.max_pages.unwrap_or(self.config.max_pages)
    }

    fn is_flat_cover_with_spine(&self) -> bool {
        self.options.file_type == FileType::Cover
            && self.options.order_options.paper_thickness.is_some()
            && self.layout.page_count == 1
    }
}

/// Round up to the next multiple of four.
pub fn next_multiple_of_four(count: u32) -> u32 {
    count.div_ceil(4) * 4
}

// -- File size ----------------------------------------------------------------

/// `FILE_TOO_LARGE` if `size` exceeds the per-call or configured limit.
pub fn check_file_size(
    size: u64,
    options: &ValidationOptions,
    config: &PreflightConfig,
) -> Option<ValidationError> {
    let limit = options.max_file_size.unwrap_or(config.max_file_size);
    (size > limit).then(|| {
        ValidationError::new(
            ErrorCode::FileTooLarge,
            format!("File is {size} bytes; the limit is {limit} bytes"),
        )
        .with_details(IssueDetails::new().expected(limit).actual(size))
    })
}

// -- Page count -----------------------------------------------------------------

pub fn page_count_rule(input: &RuleInput<'_>) -> StageReport {
    let order = &input.options.order_options;
    let physical = input.layout.page_count;
    let logical = input.logical_page_count();
    let mut report = StageReport::new().with_patch(MetadataPatch {
        page_count: Some(physical),
        ..Default::default()
    });

    if physical > input.max_pages() {
        report = report.error(
            ValidationError::new(
                ErrorCode::PageCountExceeded,
                format!("File has {physical} pages; at most {} are accepted", input.max_pages()),
            )
            .with_details(IssueDetails::new().expected(input.max_pages()).actual(physical)),
        );
    }

    match input.options.file_type {
        FileType::Cover => {
            if !COVER_PAGE_COUNTS.contains(&physical) {
                report = report.error(
                    ValidationError::new(
                        ErrorCode::PageCountInvalid,
                        format!("A cover file must have 1, 2 or 4 pages, found {physical}"),
                    )
                    .with_details(
                        IssueDetails::new()
                            .expected(COVER_PAGE_COUNTS.to_vec())
                            .actual(physical),
                    ),
                );
            }
        }
        FileType::Content => {
            if order.binding.requires_multiple_of_four() && logical % 4 != 0 {
                let suggested = next_multiple_of_four(logical);
                report = report.error(
                    ValidationError::new(
                        ErrorCode::PageCountInvalid,
                        format!(
                            "{logical} pages cannot be bound; the page count must be a multiple of 4"
                        ),
                    )
                    .with_details(
                        IssueDetails::new()
                            .actual(logical)
                            .suggested_page_count(suggested),
                    )
                    .fixable_by(FixMethod::AddBlankPages),
                );
            }

            if order.binding == Binding::Saddle
                && logical > input.config.saddle_max_pages
                && physical <= input.max_pages()
            {
                report = report.error(
                    ValidationError::new(
                        ErrorCode::PageCountExceeded,
                        format!(
                            "Saddle stitching holds at most {} pages, found {logical}",
                            input.config.saddle_max_pages
                        ),
                    )
                    .with_details(
                        IssueDetails::new()
                            .expected(input.config.saddle_max_pages)
                            .actual(logical),
                    ),
                );
            }

            if logical != order.page_count {
                let mut warning = ValidationWarning::new(
                    WarningCode::PageCountMismatch,
                    format!("Ordered {} pages, file has {logical}", order.page_count),
                )
                .with_details(
                    IssueDetails::new()
                        .expected(order.page_count)
                        .actual(logical),
                );
                if logical < order.page_count {
                    warning = warning.fixable_by(FixMethod::AddBlankPages);
                }
                report = report.warning(warning);
            }
        }
        FileType::PostProcess => {}
    }

    report
}

// -- Size and bleed -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    WithBleed,
    WithoutBleed,
    None,
}

/// Compare one page against a trim size, optionally ignoring width.
fn fit(page: &SizeMm, trim: &SizeMm, bleed: f64, tolerance: f64, check_width: bool) -> Fit {
    let matches = |target: &SizeMm| {
        within(page.height, target.height, tolerance)
            && (!check_width || within(page.width, target.width, tolerance))
    };
    if bleed > 0.0 && matches(&trim.with_bleed(bleed)) {
        Fit::WithBleed
    } else if matches(trim) {
        Fit::WithoutBleed
    } else {
        Fit::None
    }
}

/// Trim sizes the first page may legitimately have, and whether width is
/// compared at all.
fn candidate_trims(input: &RuleInput<'_>) -> (Vec<SizeMm>, bool) {
    let ordered = input.options.order_options.size;
    let doubled = SizeMm::new(ordered.width * 2.0, ordered.height);

    match input.options.file_type {
        // Width belongs to the spine rule.
        FileType::Cover if input.is_flat_cover_with_spine() => (vec![ordered], false),
        FileType::Cover => (vec![ordered, doubled], true),
        FileType::Content if input.is_spread => (vec![expected_spread_size(&ordered)], true),
        _ => (vec![ordered], true),
    }
}

pub fn size_rule(input: &RuleInput<'_>) -> StageReport {
    let order = &input.options.order_options;
    let page = input.layout.first_page();
    let tolerance = input.config.size_tolerance_mm;
    let (trims, check_width) = candidate_trims(input);

    let best = trims
        .iter()
        .map(|trim| (trim, fit(&page, trim, order.bleed, tolerance, check_width)))
        .find(|(_, fit)| *fit != Fit::None);

    let Some((trim, fit)) = best else {
        let expected = trims[0].with_bleed(order.bleed);
        return StageReport::new()
            .error(
                ValidationError::new(
                    ErrorCode::SizeMismatch,
                    format!("Page size {page} does not match the ordered {expected} (including bleed)"),
                )
                .with_details(
                    IssueDetails::new()
                        .expected(json!({ "width": expected.width, "height": expected.height }))
                        .actual(json!({ "width": page.width, "height": page.height }))
                        .page(1),
                )
                .fixable_by(FixMethod::ResizeWithPadding),
            )
            .with_patch(MetadataPatch {
                has_bleed: Some(false),
                bleed_size: Some(0.0),
                ..Default::default()
            });
    };

    if fit == Fit::WithBleed {
        return StageReport::new().with_patch(MetadataPatch {
            has_bleed: Some(true),
            bleed_size: Some(order.bleed),
            ..Default::default()
        });
    }

    let mut report = StageReport::new().with_patch(MetadataPatch {
        has_bleed: Some(false),
        bleed_size: Some(0.0),
        ..Default::default()
    });
    if order.bleed > 0.0 {
        report = report.warning(
            ValidationWarning::new(
                WarningCode::BleedMissing,
                format!(
                    "Page matches the trim size {trim} but has no {:.1}mm bleed",
                    order.bleed
                ),
            )
            .with_details(IssueDetails::new().expected(order.bleed).actual(0.0))
            .fixable_by(FixMethod::ExtendBleed),
        );
    }
    report
}

// -- Spine ----------------------------------------------------------------------

/// Flat covers only: front + spine + back must match the ordered interior.
pub fn spine_rule(input: &RuleInput<'_>) -> StageReport {
    if !input.is_flat_cover_with_spine() {
        return StageReport::new();
    }
    let order = &input.options.order_options;
    let Some(thickness) = order.paper_thickness else {
        return StageReport::new();
    };

    let expected_spine = thickness * f64::from(order.page_count) / 2.0;
    let expected_width = 2.0 * order.size.width + expected_spine + 2.0 * order.bleed;
    let actual_width = input.layout.first_page().width;

    let mut report = StageReport::new().with_patch(MetadataPatch {
        spine_size: Some(expected_spine),
        ..Default::default()
    });

    if !within(actual_width, expected_width, input.config.spine_tolerance_mm) {
        report = report.error(
            ValidationError::new(
                ErrorCode::SpineSizeMismatch,
                format!(
                    "Cover is {actual_width:.1}mm wide; a {expected_spine:.1}mm spine needs {expected_width:.1}mm"
                ),
            )
            .with_details(
                IssueDetails::new()
                    .expected(json!({ "spine": expected_spine, "width": expected_width }))
                    .actual(json!({ "width": actual_width })),
            )
            .fixable_by(FixMethod::AdjustSpine),
        );
    }

    report
}

// -- Orientation ------------------------------------------------------------------

/// Landscape pages in a portrait single-page content order.
pub fn orientation_rule(input: &RuleInput<'_>) -> StageReport {
    if !input.is_content() || input.is_spread || input.options.order_options.size.is_landscape() {
        return StageReport::new();
    }

    input
        .layout
        .page_sizes
        .iter()
        .enumerate()
        .filter(|(_, size)| size.is_landscape())
        .fold(StageReport::new(), |report, (index, size)| {
            let page = index as u32 + 1;
            report.warning(
                ValidationWarning::new(
                    WarningCode::LandscapePage,
                    format!("Page {page} is landscape ({size}) in a portrait order"),
                )
                .with_details(IssueDetails::new().page(page)),
            )
        })
}

// -- Saddle stitch ----------------------------------------------------------------

pub fn saddle_rule(input: &RuleInput<'_>) -> StageReport {
    if !input.is_content() || input.options.order_options.binding != Binding::Saddle {
        return StageReport::new();
    }

    let mut report = StageReport::new();
    let logical = input.logical_page_count();
    let minimum = input.config.saddle_min_pages;

    if logical < minimum {
        report = report.error(
            ValidationError::new(
                ErrorCode::SaddleStitchInvalid,
                format!("Saddle stitching needs at least {minimum} pages, found {logical}"),
            )
            .with_details(
                IssueDetails::new()
                    .expected(minimum)
                    .actual(logical)
                    .suggested_page_count(next_multiple_of_four(minimum)),
            )
            .fixable_by(FixMethod::AddBlankPages),
        );
    }

    if input.holds_page_pairs() {
        report = report.warning(ValidationWarning::new(
            WarningCode::CenterObjectCheck,
            "Spread pages will be stapled through the fold; keep objects clear of the centre",
        ));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use prepress_core::OrderOptions;

    fn options(file_type: FileType, binding: Binding, pages: u32) -> ValidationOptions {
        ValidationOptions {
            file_type,
            order_options: OrderOptions {
                size: SizeMm::new(210.0, 297.0),
                page_count: pages,
                binding,
                bleed: 3.0,
                paper_thickness: None,
            },
            max_file_size: None,
            max_pages: None,
        }
    }

    fn layout(count: u32, width: f64, height: f64) -> PageLayout {
        PageLayout {
            page_count: count,
            page_sizes: vec![SizeMm::new(width, height); count as usize],
        }
    }

    fn run(
        rule: fn(&RuleInput<'_>) -> StageReport,
        options: &ValidationOptions,
        layout: &PageLayout,
        is_spread: bool,
    ) -> StageReport {
        let config = PreflightConfig::default();
        rule(&RuleInput {
            options,
            config: &config,
            layout,
            is_spread,
        })
    }

    #[test]
    fn file_size_limit_is_exclusive() {
        let config = PreflightConfig::default();
        let opts = options(FileType::Content, Binding::Perfect, 4);
        assert!(check_file_size(config.max_file_size, &opts, &config).is_none());
        let error = check_file_size(config.max_file_size + 1, &opts, &config).unwrap();
        assert_eq!(error.code, ErrorCode::FileTooLarge);
    }

    #[test]
    fn per_call_file_size_override_wins() {
        let config = PreflightConfig::default();
        let mut opts = options(FileType::Content, Binding::Perfect, 4);
        opts.max_file_size = Some(10);
        assert!(check_file_size(11, &opts, &config).is_some());
    }

    #[test]
    fn multiples_of_four_bind() {
        for pages in (4..=64).step_by(4) {
            for binding in [Binding::Perfect, Binding::Saddle] {
                let report = run(
                    page_count_rule,
                    &options(FileType::Content, binding, pages),
                    &layout(pages, 216.0, 303.0),
                    false,
                );
                assert!(
                    report.errors.iter().all(|e| e.code != ErrorCode::PageCountInvalid),
                    "{pages} pages {binding:?}"
                );
            }
        }
    }

    #[test]
    fn odd_counts_suggest_padding() {
        for pages in [1, 2, 3, 5, 6, 7, 9, 33, 101] {
            let report = run(
                page_count_rule,
                &options(FileType::Content, Binding::Perfect, pages),
                &layout(pages, 216.0, 303.0),
                false,
            );
            let error = report
                .errors
                .iter()
                .find(|e| e.code == ErrorCode::PageCountInvalid)
                .unwrap();
            assert!(error.auto_fixable);
            assert_eq!(error.fix_method, Some(FixMethod::AddBlankPages));
            assert_eq!(error.details.suggested_page_count, Some(pages.div_ceil(4) * 4));
        }
    }

    #[test]
    fn spring_binding_accepts_any_count() {
        let report = run(
            page_count_rule,
            &options(FileType::Content, Binding::Spring, 7),
            &layout(7, 216.0, 303.0),
            false,
        );
        assert!(report.errors.is_empty());
    }

    #[test]
    fn three_pages_for_four_ordered() {
        let report = run(
            page_count_rule,
            &options(FileType::Content, Binding::Perfect, 4),
            &layout(3, 216.0, 303.0),
            false,
        );

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, ErrorCode::PageCountInvalid);
        assert_eq!(report.errors[0].details.suggested_page_count, Some(4));

        assert_eq!(report.warnings.len(), 1);
        let warning = &report.warnings[0];
        assert_eq!(warning.code, WarningCode::PageCountMismatch);
        assert_eq!(warning.details.expected, Some(json!(4)));
        assert_eq!(warning.details.actual, Some(json!(3)));
        assert!(warning.auto_fixable);
    }

    #[test]
    fn surplus_pages_are_not_fixable() {
        let report = run(
            page_count_rule,
            &options(FileType::Content, Binding::Perfect, 4),
            &layout(8, 216.0, 303.0),
            false,
        );
        assert!(!report.warnings[0].auto_fixable);
    }

    #[test]
    fn saddle_65_is_invalid_and_exceeded() {
        let report = run(
            page_count_rule,
            &options(FileType::Content, Binding::Saddle, 65),
            &layout(65, 216.0, 303.0),
            false,
        );
        let codes: Vec<_> = report.errors.iter().map(|e| e.code).collect();
        assert!(codes.contains(&ErrorCode::PageCountInvalid));
        assert!(codes.contains(&ErrorCode::PageCountExceeded));
        let exceeded = report
            .errors
            .iter()
            .find(|e| e.code == ErrorCode::PageCountExceeded)
            .unwrap();
        assert!(!exceeded.auto_fixable);
    }

    #[test]
    fn cover_page_counts() {
        for (pages, ok) in [(1, true), (2, true), (3, false), (4, true), (5, false)] {
            let report = run(
                page_count_rule,
                &options(FileType::Cover, Binding::Perfect, 100),
                &layout(pages, 431.0, 303.0),
                false,
            );
            assert_eq!(report.errors.is_empty(), ok, "{pages} cover pages");
            assert!(report.warnings.is_empty());
        }
    }

    #[test]
    fn spreads_count_double() {
        let report = run(
            page_count_rule,
            &options(FileType::Content, Binding::Perfect, 20),
            &layout(10, 432.0, 303.0),
            true,
        );
        assert!(report.is_clean());
        assert_eq!(report.patch.page_count, Some(10));
    }

    #[test]
    fn max_pages_override() {
        let mut opts = options(FileType::Content, Binding::Perfect, 8);
        opts.max_pages = Some(4);
        let report = run(page_count_rule, &opts, &layout(8, 216.0, 303.0), false);
        assert!(report.errors.iter().any(|e| e.code == ErrorCode::PageCountExceeded));
    }

    #[test]
    fn size_tolerance_is_symmetric_and_inclusive() {
        let opts = options(FileType::Content, Binding::Perfect, 4);
        for width in [215.0, 217.0] {
            let report = run(size_rule, &opts, &layout(4, width, 303.0), false);
            assert!(report.errors.is_empty(), "{width}");
            assert_eq!(report.patch.has_bleed, Some(true));
            assert_eq!(report.patch.bleed_size, Some(3.0));
        }
        for width in [214.99, 217.01] {
            let report = run(size_rule, &opts, &layout(4, width, 303.0), false);
            assert_eq!(report.errors[0].code, ErrorCode::SizeMismatch, "{width}");
            assert_eq!(report.errors[0].fix_method, Some(FixMethod::ResizeWithPadding));
        }
    }

    #[test]
    fn trim_size_without_bleed_warns() {
        let report = run(
            size_rule,
            &options(FileType::Content, Binding::Perfect, 4),
            &layout(4, 210.0, 297.0),
            false,
        );
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings[0].code, WarningCode::BleedMissing);
        assert_eq!(report.warnings[0].fix_method, Some(FixMethod::ExtendBleed));
        assert_eq!(report.patch.has_bleed, Some(false));
    }

    #[test]
    fn zero_bleed_order_needs_no_bleed() {
        let mut opts = options(FileType::Content, Binding::Perfect, 4);
        opts.order_options.bleed = 0.0;
        let report = run(size_rule, &opts, &layout(4, 210.0, 297.0), false);
        assert!(report.is_clean());
    }

    #[test]
    fn spread_content_compares_doubled_width() {
        let mut opts = options(FileType::Content, Binding::Perfect, 20);
        opts.order_options.size = SizeMm::new(216.0, 303.0);
        opts.order_options.bleed = 0.0;
        let report = run(size_rule, &opts, &layout(10, 432.0, 303.0), true);
        assert!(report.is_clean());
    }

    fn cover_options() -> ValidationOptions {
        let mut opts = options(FileType::Cover, Binding::Perfect, 100);
        opts.order_options.paper_thickness = Some(0.10);
        opts
    }

    #[test]
    fn spine_width_within_tolerance_passes() {
        let opts = cover_options();
        let report = run(spine_rule, &opts, &layout(1, 431.5, 303.0), false);
        assert!(report.errors.is_empty());
        let spine = report.patch.spine_size.unwrap();
        assert!((spine - 5.0).abs() < 1e-9);

        // Height carries the bleed; width is left to the spine rule.
        let size = run(size_rule, &opts, &layout(1, 431.5, 303.0), false);
        assert!(size.is_clean());
    }

    #[test]
    fn narrow_cover_fails_spine() {
        let report = run(spine_rule, &cover_options(), &layout(1, 420.0, 303.0), false);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, ErrorCode::SpineSizeMismatch);
        assert_eq!(report.errors[0].fix_method, Some(FixMethod::AdjustSpine));
    }

    #[test]
    fn spine_rule_needs_thickness() {
        let opts = options(FileType::Cover, Binding::Perfect, 100);
        let report = run(spine_rule, &opts, &layout(1, 420.0, 303.0), false);
        assert!(report.is_clean());
        assert_eq!(report.patch.spine_size, None);
    }

    #[test]
    fn two_page_cover_accepts_single_width() {
        let opts = options(FileType::Cover, Binding::Perfect, 100);
        let report = run(size_rule, &opts, &layout(2, 216.0, 303.0), false);
        assert!(report.is_clean());
    }

    #[test]
    fn landscape_pages_are_reported_by_number() {
        let mut layout = layout(4, 216.0, 303.0);
        layout.page_sizes[2] = SizeMm::new(303.0, 216.0);
        let opts = options(FileType::Content, Binding::Perfect, 4);

        let report = run(orientation_rule, &opts, &layout, false);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, WarningCode::LandscapePage);
        assert_eq!(report.warnings[0].details.page, Some(3));

        // Spreads are landscape by nature.
        assert!(run(orientation_rule, &opts, &layout, true).is_clean());
    }

    #[test]
    fn short_saddle_booklet_is_invalid() {
        let report = run(
            saddle_rule,
            &options(FileType::Content, Binding::Saddle, 4),
            &layout(4, 216.0, 303.0),
            false,
        );
        assert_eq!(report.errors[0].code, ErrorCode::SaddleStitchInvalid);
        assert_eq!(report.errors[0].details.suggested_page_count, Some(8));
    }

    #[test]
    fn saddle_spreads_need_centre_check() {
        let report = run(
            saddle_rule,
            &options(FileType::Content, Binding::Saddle, 16),
            &layout(8, 432.0, 303.0),
            true,
        );
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings[0].code, WarningCode::CenterObjectCheck);
    }

    #[test]
    fn landscape_order_pages_are_not_page_pairs() {
        let mut opts = options(FileType::Content, Binding::Saddle, 40);
        opts.order_options.size = SizeMm::new(297.0, 210.0);
        let pages = layout(40, 303.0, 216.0);

        let counted = run(page_count_rule, &opts, &pages, true);
        assert!(counted.errors.is_empty(), "{:?}", counted.errors);
        assert!(counted.warnings.is_empty(), "{:?}", counted.warnings);

        let saddle = run(saddle_rule, &opts, &pages, true);
        assert!(saddle.is_clean());

        assert!(run(size_rule, &opts, &pages, true).is_clean());
    }

    #[test]
    fn portrait_order_spreads_count_double() {
        let opts = options(FileType::Content, Binding::Perfect, 20);
        let report = run(page_count_rule, &opts, &layout(10, 426.0, 303.0), true);
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(report.patch.page_count, Some(10));
    }
}
