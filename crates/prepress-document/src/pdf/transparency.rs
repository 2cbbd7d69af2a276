// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transparency and overprint detection.
//
// Both live in graphics-state (ExtGState) dictionaries. A page is flagged if
// any graphics state reachable from its resources, including those of form
// XObjects it uses, sets a non-normal blend mode, a soft mask, a constant
// alpha below 1, or overprint.

use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

use super::metadata::PdfInspector;
use super::objects::{as_dict, entry, name, number, page_resources};

const MAX_FORM_DEPTH: usize = 4;

/// Pages (1-based) carrying transparency or overprint settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransparencyReport {
    pub transparency_pages: Vec<u32>,
    pub overprint_pages: Vec<u32>,
}

impl TransparencyReport {
    pub fn has_transparency(&self) -> bool {
        !self.transparency_pages.is_empty()
    }

    pub fn has_overprint(&self) -> bool {
        !self.overprint_pages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct StateFlags {
    transparency: bool,
    overprint: bool,
}

impl StateFlags {
    fn merge(&mut self, other: StateFlags) {
        self.transparency |= other.transparency;
        self.overprint |= other.overprint;
    }
}

/// Inspect every page's graphics states.
pub fn detect_transparency(inspector: &PdfInspector) -> TransparencyReport {
    let doc = inspector.document();
    let mut report = TransparencyReport::default();

    for (index, &page_id) in inspector.page_ids().iter().enumerate() {
        let page_number = index as u32 + 1;
        let Some(resources) = page_resources(doc, page_id) else {
            continue;
        };

        let flags = resource_flags(doc, resources, 0);
        if flags.transparency {
            report.transparency_pages.push(page_number);
        }
        if flags.overprint {
            report.overprint_pages.push(page_number);
        }
    }

    report
}

fn resource_flags(doc: &Document, resources: &Dictionary, depth: usize) -> StateFlags {
    let mut flags = StateFlags::default();

    if let Some(states) = entry(doc, resources, b"ExtGState").and_then(|o| as_dict(doc, o)) {
        for (_, state) in states.iter() {
            if let Some(state) = as_dict(doc, state) {
                flags.merge(graphics_state_flags(doc, state));
            }
        }
    }

    if depth < MAX_FORM_DEPTH
        && let Some(xobjects) = entry(doc, resources, b"XObject").and_then(|o| as_dict(doc, o))
    {
        for (_, xobject) in xobjects.iter() {
            let Some(form) = as_dict(doc, xobject) else {
                continue;
            };
            if form.get(b"Subtype").ok().and_then(name) != Some(b"Form".as_slice()) {
                continue;
            }
            if let Some(form_resources) = entry(doc, form, b"Resources").and_then(|o| as_dict(doc, o)) {
                flags.merge(resource_flags(doc, form_resources, depth + 1));
            }
        }
    }

    flags
}

fn graphics_state_flags(doc: &Document, state: &Dictionary) -> StateFlags {
    let blend = entry(doc, state, b"BM").is_some_and(|mode| match mode {
        Object::Name(mode) => !is_normal_blend(mode),
        // An array lists fallbacks; the first entry is the one applied.
        Object::Array(modes) => modes
            .first()
            .and_then(name)
            .is_some_and(|mode| !is_normal_blend(mode)),
        _ => false,
    });
    let soft_mask = entry(doc, state, b"SMask").is_some_and(|mask| name(mask) != Some(b"None".as_slice()));
    let alpha = [b"CA".as_slice(), b"ca".as_slice()]
        .iter()
        .filter_map(|key| entry(doc, state, key).and_then(number))
        .any(|value| value < 1.0);
    let overprint = [b"OP".as_slice(), b"op".as_slice()]
        .iter()
        .any(|key| entry(doc, state, key).is_some_and(|v| matches!(v, Object::Boolean(true))));

    StateFlags {
        transparency: blend || soft_mask || alpha,
        overprint,
    }
}

fn is_normal_blend(mode: &[u8]) -> bool {
    mode == b"Normal" || mode == b"Compatible"
}
