// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural color-space scan over the raw PDF bytes.
//
// This is the cheap first gate of color-mode detection: no parsing, no
// external process, no failure path. Matching with `regex::bytes` is
// equivalent to searching the Latin-1 decoding of the file for ASCII
// signatures. Signatures inside compressed object streams are invisible
// here; the ink-coverage stage is what confirms or refutes.

use std::sync::OnceLock;

use regex::bytes::Regex;
use serde::Serialize;
use tracing::debug;

use super::names::{decode_pdf_name, is_spot_colorant};

/// A color-space marker found in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorSignature {
    /// `/DeviceCMYK` used directly, not only as the alternate space of a
    /// spot color.
    DeviceCmyk,
    /// `/ICCBased` stream declaring four components.
    IccCmyk,
    /// Image XObject in DeviceCMYK.
    CmykImage,
    Separation,
    DeviceN,
}

/// Outcome of the byte-level scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralScan {
    /// A process-CMYK color space is declared somewhere.
    pub has_cmyk_signature: bool,
    /// CMYK output is likely enough to justify ink-coverage analysis.
    pub suspected_cmyk: bool,
    pub signatures: Vec<ColorSignature>,
    /// Spot names visible in uncompressed `/Separation` arrays.
    pub spot_names: Vec<String>,
}

static DEVICE_CMYK: OnceLock<Option<Regex>> = OnceLock::new();
static ICC_BASED: OnceLock<Option<Regex>> = OnceLock::new();
static FOUR_COMPONENTS: OnceLock<Option<Regex>> = OnceLock::new();
static CMYK_IMAGE: OnceLock<Option<Regex>> = OnceLock::new();
static SEPARATION: OnceLock<Option<Regex>> = OnceLock::new();
static DEVICE_N: OnceLock<Option<Regex>> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Option<Regex>>, source: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(source).ok()).as_ref()
}

fn found(cell: &'static OnceLock<Option<Regex>>, source: &str, data: &[u8]) -> bool {
    pattern(cell, source).is_some_and(|re| re.is_match(data))
}

/// Scan raw PDF bytes for color-space signatures.
pub fn scan_color_structure(data: &[u8]) -> StructuralScan {
    let mut signatures = Vec::new();

    if declares_process_cmyk(data) {
        signatures.push(ColorSignature::DeviceCmyk);
    }
    if found(&ICC_BASED, r"(?-u)/ICCBased\b", data) && found(&FOUR_COMPONENTS, r"(?-u)/N\s+4\b", data) {
        signatures.push(ColorSignature::IccCmyk);
    }
    if found(
        &CMYK_IMAGE,
        r"(?s-u)/Subtype\s*/Image.{0,512}?/ColorSpace\s*/DeviceCMYK|/ColorSpace\s*/DeviceCMYK.{0,512}?/Subtype\s*/Image",
        data,
    ) {
        signatures.push(ColorSignature::CmykImage);
    }

    let spot_names = separation_names(data);
    if found(&SEPARATION, r"(?-u)/Separation\b", data) {
        signatures.push(ColorSignature::Separation);
    }
    if found(&DEVICE_N, r"(?-u)/DeviceN\b", data) {
        signatures.push(ColorSignature::DeviceN);
    }

    let has_cmyk_signature = signatures.iter().any(|s| {
        matches!(
            s,
            ColorSignature::DeviceCmyk | ColorSignature::IccCmyk | ColorSignature::CmykImage
        )
    });
    let suspected_cmyk = has_cmyk_signature || signatures.contains(&ColorSignature::DeviceN);

    debug!(?signatures, has_cmyk_signature, suspected_cmyk, "structural color scan");

    StructuralScan {
        has_cmyk_signature,
        suspected_cmyk,
        signatures,
        spot_names,
    }
}

static SPOT_ALTERNATE: OnceLock<Option<Regex>> = OnceLock::new();

/// `/DeviceCMYK` anywhere other than as the alternate space of a
/// `/Separation` or `/DeviceN` array. Spot inks almost always declare a
/// CMYK fallback without painting any process color.
fn declares_process_cmyk(data: &[u8]) -> bool {
    let Some(device_cmyk) = pattern(&DEVICE_CMYK, r"(?-u)/DeviceCMYK\b") else {
        return false;
    };
    let alternates: Vec<usize> = pattern(
        &SPOT_ALTERNATE,
        r"(?-u)/Separation\s*/[^\s/\[\]<>()]+\s*(/DeviceCMYK)\b|/DeviceN\s*\[[^\]]*\]\s*(/DeviceCMYK)\b",
    )
    .map(|re| {
        re.captures_iter(data)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.start())
            .collect()
    })
    .unwrap_or_default();

    device_cmyk
        .find_iter(data)
        .any(|m| !alternates.contains(&m.start()))
}

static SEPARATION_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn separation_names(data: &[u8]) -> Vec<String> {
    let Some(re) = pattern(&SEPARATION_NAME, r"(?-u)/Separation\s*/([^\s/\[\]<>()]+)") else {
        return Vec::new();
    };

    let mut names: Vec<String> = Vec::new();
    for caps in re.captures_iter(data) {
        if let Some(raw) = caps.get(1) {
            let decoded = decode_pdf_name(raw.as_bytes());
            if is_spot_colorant(&decoded) && !names.contains(&decoded) {
                names.push(decoded);
            }
        }
    }
    names
}
