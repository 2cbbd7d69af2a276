// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF metadata extraction — open a submitted file with `lopdf` and read its
// page tree: page count and per-page trim geometry in millimetres.

use lopdf::{Document, Object, ObjectId};
use prepress_core::SizeMm;
use prepress_core::error::PreflightError;
use tracing::{debug, instrument, warn};

use super::objects::{self, number};

/// The `%PDF-` marker must appear within this many leading bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// US Letter in points, the PDF default when no MediaBox is present.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page-tree facts the rule validators and spread detector consume.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_count: u32,
    /// Size of every page, in page order.
    pub page_sizes: Vec<SizeMm>,
}

impl PageLayout {
    /// First page size, or zero for an empty layout.
    pub fn first_page(&self) -> SizeMm {
        self.page_sizes.first().copied().unwrap_or_default()
    }
}

/// A parsed submission.
///
/// Wraps `lopdf::Document` together with the ordered page object IDs so the
/// analyzers can walk pages by 1-based number.
pub struct PdfInspector {
    /// The underlying lopdf document.
    document: Document,
    /// Page object IDs in page order.
    page_ids: Vec<ObjectId>,
}

impl PdfInspector {
    // -- Construction ---------------------------------------------------------

    /// Parse raw PDF bytes.
    ///
    /// Fails with [`PreflightError::UnsupportedFormat`] when the bytes carry no
    /// PDF header and with [`PreflightError::Corrupted`] when lopdf cannot
    /// build a document with at least one page.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PreflightError> {
        check_header(data)?;

        let document = Document::load_mem(data)
            .map_err(|err| PreflightError::Corrupted(format!("failed to load PDF: {err}")))?;

        // get_pages returns a BTreeMap keyed by 1-based page number.
        let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();
        if page_ids.is_empty() {
            return Err(PreflightError::Corrupted("document has no pages".into()));
        }

        debug!(pages = page_ids.len(), "PDF loaded from bytes");
        Ok(Self { document, page_ids })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// Access the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Page object IDs in page order.
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    /// MediaBox size of every page, in millimetres.
    pub fn page_sizes(&self) -> Vec<SizeMm> {
        self.page_ids
            .iter()
            .enumerate()
            .map(|(index, &page_id)| self.page_size(index as u32 + 1, page_id))
            .collect()
    }

    /// Page count and geometry in one pass.
    pub fn layout(&self) -> PageLayout {
        PageLayout {
            page_count: self.page_count(),
            page_sizes: self.page_sizes(),
        }
    }

    // -- Helpers --------------------------------------------------------------

    fn page_size(&self, page_number: u32, page_id: ObjectId) -> SizeMm {
        let [x0, y0, x1, y1] = objects::inherited(&self.document, page_id, b"MediaBox")
            .and_then(media_box_coords)
            .unwrap_or_else(|| {
                warn!(page_number, "page has no usable MediaBox, assuming US Letter");
                DEFAULT_MEDIA_BOX
            });

        SizeMm::from_points((x1 - x0).abs(), (y1 - y0).abs())
    }
}

/// Reject input that is not a PDF before handing it to the parser.
pub fn check_header(data: &[u8]) -> Result<(), PreflightError> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(PreflightError::UnsupportedFormat(
            "missing %PDF- header".to_string(),
        ))
    }
}

fn media_box_coords(object: &Object) -> Option<[f64; 4]> {
    let items = object.as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    Some([
        number(&items[0])?,
        number(&items[1])?,
        number(&items[2])?,
        number(&items[3])?,
    ])
}
