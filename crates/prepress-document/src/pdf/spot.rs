// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spot color detection.
//
// Walks every object in the parsed document (including objects that lived in
// compressed object streams, which the byte scan cannot see) for
// `[/Separation name ...]` and `[/DeviceN [names] ...]` color-space arrays.

use lopdf::{Document, Object};

use super::names::{decode_pdf_name, is_spot_colorant};
use super::objects::{as_array, name};

/// Nesting depth limit for direct (non-referenced) objects.
const MAX_NESTING: usize = 32;

/// Named inks found in the document, in first-seen order, deduplicated.
pub fn find_spot_colors(doc: &Document) -> Vec<String> {
    let mut spots = Vec::new();
    for object in doc.objects.values() {
        collect(doc, object, 0, &mut spots);
    }
    spots
}

fn collect(doc: &Document, object: &Object, depth: usize, spots: &mut Vec<String>) {
    if depth > MAX_NESTING {
        return;
    }

    match object {
        Object::Array(items) => {
            if let Some(kind) = items.first().and_then(name) {
                match kind {
                    b"Separation" => {
                        if let Some(raw) = items.get(1).and_then(name) {
                            push_spot(spots, raw);
                        }
                    }
                    b"DeviceN" => {
                        let colorants = items.get(1).and_then(|o| as_array(doc, o));
                        for raw in colorants.into_iter().flatten().filter_map(name) {
                            push_spot(spots, raw);
                        }
                    }
                    _ => {}
                }
            }
            for item in items {
                collect(doc, item, depth + 1, spots);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect(doc, value, depth + 1, spots);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect(doc, value, depth + 1, spots);
            }
        }
        _ => {}
    }
}

fn push_spot(spots: &mut Vec<String>, raw: &[u8]) {
    let decoded = decode_pdf_name(raw);
    if is_spot_colorant(&decoded) && !spots.contains(&decoded) {
        spots.push(decoded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::metadata::PdfInspector;
    use crate::pdf::sample::SamplePdf;

    #[test]
    fn finds_separation_and_device_n_inks() {
        let bytes = SamplePdf::new()
            .page_mm(210.0, 297.0)
            .separation("PANTONE Red 032 C")
            .device_n(&["CutContour", "Cyan", "White Ink"])
            .build()
            .unwrap();
        let inspector = PdfInspector::from_bytes(&bytes).unwrap();

        let spots = find_spot_colors(inspector.document());
        assert_eq!(spots, vec!["PANTONE Red 032 C", "CutContour", "White Ink"]);
    }

    #[test]
    fn plain_file_has_no_spots() {
        let bytes = SamplePdf::new().page_mm(210.0, 297.0).build().unwrap();
        let inspector = PdfInspector::from_bytes(&bytes).unwrap();
        assert!(find_spot_colors(inspector.document()).is_empty());
    }

    #[test]
    fn registration_all_is_ignored() {
        let bytes = SamplePdf::new()
            .page_mm(210.0, 297.0)
            .separation("All")
            .build()
            .unwrap();
        let inspector = PdfInspector::from_bytes(&bytes).unwrap();
        assert!(find_spot_colors(inspector.document()).is_empty());
    }
}
