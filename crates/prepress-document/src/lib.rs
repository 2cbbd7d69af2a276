// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prepress-document — PDF inspection for the prepress preflight engine.
//
// Opens submitted PDFs with lopdf and answers the questions the validators
// ask: how many pages and how big, which color spaces are declared, which
// named inks are used, whether transparency or overprint is set, and how
// sharp the placed images are.

pub mod pdf;

// Re-export the primary items so callers can use `prepress_document::PdfInspector` etc.
pub use pdf::names::decode_pdf_name;
pub use pdf::{
    ColorSignature, ImagePlacement, PageLayout, PdfInspector, ResolutionReport, StructuralScan,
    TransparencyReport, check_header, detect_transparency, find_spot_colors, measure_resolution,
    scan_color_structure,
};
#[cfg(any(test, feature = "test-util"))]
pub use pdf::SamplePdf;
