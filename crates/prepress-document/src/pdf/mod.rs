// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page geometry, color-space scanning, spot colors,
// transparency, and image resolution.

pub mod color_scan;
pub mod metadata;
pub mod names;
pub(crate) mod objects;
pub mod resolution;
#[cfg(any(test, feature = "test-util"))]
pub mod sample;
pub mod spot;
pub mod transparency;

pub use color_scan::{ColorSignature, StructuralScan, scan_color_structure};
pub use metadata::{PageLayout, PdfInspector, check_header};
pub use resolution::{ImagePlacement, ResolutionReport, measure_resolution};
#[cfg(any(test, feature = "test-util"))]
pub use sample::SamplePdf;
pub use spot::find_spot_colors;
pub use transparency::{TransparencyReport, detect_transparency};
