// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Effective image resolution.
//
// An image XObject is painted into the unit square of the current
// transformation matrix, so its placed size in points is the length of the
// CTM's x and y basis vectors at the `Do` operator. Effective DPI is
// pixels / (points / 72), taken on the weaker axis. Inline images and
// shading patterns are not measured.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;
use tracing::debug;

use super::metadata::PdfInspector;
use super::objects::{as_dict, as_stream, entry, name, number, page_resources, stream_bytes};

const MAX_FORM_DEPTH: usize = 4;

/// One placement of a raster image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlacement {
    /// 1-based page number.
    pub page: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Effective resolution on the weaker axis.
    pub effective_dpi: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub placements: Vec<ImagePlacement>,
}

impl ResolutionReport {
    pub fn image_count(&self) -> u32 {
        self.placements.len() as u32
    }

    /// Lowest effective DPI across all placements.
    pub fn min_dpi(&self) -> Option<f64> {
        self.placements
            .iter()
            .map(|p| p.effective_dpi)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Placements below `threshold` DPI.
    pub fn below(&self, threshold: f64) -> impl Iterator<Item = &ImagePlacement> {
        self.placements
            .iter()
            .filter(move |p| p.effective_dpi < threshold)
    }
}

/// A PDF affine matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn from_objects(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut values = [0.0; 6];
        for (slot, operand) in values.iter_mut().zip(operands) {
            *slot = number(operand)?;
        }
        Some(Matrix(values))
    }

    /// `self × other`: apply `self` first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [oa, ob, oc, od, oe, of] = other.0;
        Matrix([
            a * oa + b * oc,
            a * ob + b * od,
            c * oa + d * oc,
            c * ob + d * od,
            e * oa + f * oc + oe,
            e * ob + f * od + of,
        ])
    }

    /// Placed width and height of the unit square, in points.
    fn unit_extent(&self) -> (f64, f64) {
        let [a, b, c, d, _, _] = self.0;
        (a.hypot(b), c.hypot(d))
    }
}

/// Measure every image placement in the document.
pub fn measure_resolution(inspector: &PdfInspector) -> ResolutionReport {
    let doc = inspector.document();
    let mut report = ResolutionReport::default();

    for (index, &page_id) in inspector.page_ids().iter().enumerate() {
        let page = index as u32 + 1;
        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(err) => {
                debug!(page, %err, "page content unreadable, skipping");
                continue;
            }
        };
        let resources = page_resources(doc, page_id);
        walk_content(doc, &content, resources, Matrix::IDENTITY, page, 0, &mut report);
    }

    report
}

fn walk_content(
    doc: &Document,
    content: &[u8],
    resources: Option<&Dictionary>,
    base: Matrix,
    page: u32,
    depth: usize,
    report: &mut ResolutionReport,
) {
    let Ok(content) = Content::decode(content) else {
        debug!(page, "content stream did not decode, skipping");
        return;
    };

    let mut ctm = base;
    let mut saved = Vec::new();

    for operation in &content.operations {
        match operation.operator.as_str() {
            "q" => saved.push(ctm),
            "Q" => ctm = saved.pop().unwrap_or(base),
            "cm" => {
                if let Some(matrix) = Matrix::from_objects(&operation.operands) {
                    ctm = matrix.then(&ctm);
                }
            }
            "Do" => {
                let Some(xobject_name) = operation.operands.first().and_then(name) else {
                    continue;
                };
                let Some(xobject) = resources
                    .and_then(|r| entry(doc, r, b"XObject"))
                    .and_then(|o| as_dict(doc, o))
                    .and_then(|xobjects| xobjects.get(xobject_name).ok())
                    .and_then(|o| as_stream(doc, o))
                else {
                    continue;
                };

                match xobject.dict.get(b"Subtype").ok().and_then(name) {
                    Some(b"Image") => {
                        if let Some(placement) = placement(&xobject.dict, &ctm, page) {
                            report.placements.push(placement);
                        }
                    }
                    Some(b"Form") if depth < MAX_FORM_DEPTH => {
                        let form_matrix = xobject
                            .dict
                            .get(b"Matrix")
                            .ok()
                            .and_then(|o| o.as_array().ok())
                            .and_then(|items| Matrix::from_objects(items))
                            .unwrap_or(Matrix::IDENTITY);
                        let form_resources = entry(doc, &xobject.dict, b"Resources")
                            .and_then(|o| as_dict(doc, o))
                            .or(resources);
                        walk_content(
                            doc,
                            &stream_bytes(xobject),
                            form_resources,
                            form_matrix.then(&ctm),
                            page,
                            depth + 1,
                            report,
                        );
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn placement(image: &Dictionary, ctm: &Matrix, page: u32) -> Option<ImagePlacement> {
    let pixel_width = image.get(b"Width").ok().and_then(number)?;
    let pixel_height = image.get(b"Height").ok().and_then(number)?;
    let (width_pt, height_pt) = ctm.unit_extent();
    if width_pt <= f64::EPSILON || height_pt <= f64::EPSILON {
        return None;
    }

    let dpi_x = pixel_width / (width_pt / 72.0);
    let dpi_y = pixel_height / (height_pt / 72.0);

    Some(ImagePlacement {
        page,
        pixel_width: pixel_width as u32,
        pixel_height: pixel_height as u32,
        effective_dpi: dpi_x.min(dpi_y),
    })
}
