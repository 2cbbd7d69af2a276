// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF name decoding.
//
// Names may escape any byte as `#XX` (PDF 1.2+), so spot colors arrive as
// `/PANTONE#20Red#20032#20C`. We decode them back to the human-readable ink
// name before reporting.

/// Colorant names that are not spot inks.
const NON_SPOT_COLORANTS: [&str; 6] = ["All", "None", "Cyan", "Magenta", "Yellow", "Black"];

/// Decode `#XX` escapes in a raw PDF name (without the leading slash).
///
/// A `#` not followed by two hex digits is kept literally.
pub fn decode_pdf_name(raw: &[u8]) -> String {
    let mut decoded = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#'
            && i + 2 < raw.len()
            && let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2]))
        {
            decoded.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        decoded.push(raw[i]);
        i += 1;
    }

    String::from_utf8(decoded)
        .unwrap_or_else(|err| err.into_bytes().iter().map(|&b| b as char).collect())
}

/// Whether a decoded colorant name designates a dedicated spot ink.
pub fn is_spot_colorant(name: &str) -> bool {
    !name.is_empty() && !NON_SPOT_COLORANTS.contains(&name)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
