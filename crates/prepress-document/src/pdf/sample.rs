// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic PDF builder for tests and benchmarks.
//
// Produces small, uncompressed documents with exactly the features a check
// needs: page geometry, spot color spaces, CMYK fills, graphics states, and
// placed raster images.

use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use prepress_core::PT_TO_MM;
use prepress_core::error::PreflightError;

#[derive(Debug, Clone)]
struct SampleImage {
    pixel_width: u32,
    pixel_height: u32,
    display_width_pt: f64,
    display_height_pt: f64,
}

#[derive(Debug, Clone)]
struct SamplePage {
    width_pt: f64,
    height_pt: f64,
    color_spaces: Vec<Object>,
    cmyk_fill: bool,
    graphics_states: Vec<Dictionary>,
    images: Vec<SampleImage>,
}

impl SamplePage {
    fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
            color_spaces: Vec::new(),
            cmyk_fill: false,
            graphics_states: Vec::new(),
            images: Vec::new(),
        }
    }
}

/// Builder for synthetic PDFs.
///
/// Feature methods apply to the most recently added page (an A4 page is
/// added first if there is none).
#[derive(Debug, Clone, Default)]
pub struct SamplePdf {
    pages: Vec<SamplePage>,
}

impl SamplePdf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page measured in millimetres.
    pub fn page_mm(mut self, width: f64, height: f64) -> Self {
        self.pages.push(SamplePage::new(width / PT_TO_MM, height / PT_TO_MM));
        self
    }

    /// Append `count` identical pages.
    pub fn pages_mm(mut self, count: u32, width: f64, height: f64) -> Self {
        for _ in 0..count {
            self = self.page_mm(width, height);
        }
        self
    }

    /// Declare a `/Separation` color space for `ink` (decoded name).
    pub fn separation(mut self, ink: &str) -> Self {
        let space = Object::Array(vec![
            Object::Name(b"Separation".to_vec()),
            Object::Name(ink.as_bytes().to_vec()),
            Object::Name(b"DeviceCMYK".to_vec()),
            Object::Null,
        ]);
        self.current().color_spaces.push(space);
        self
    }

    /// Declare a `/DeviceN` color space over `inks`.
    pub fn device_n(mut self, inks: &[&str]) -> Self {
        let names = inks
            .iter()
            .map(|ink| Object::Name(ink.as_bytes().to_vec()))
            .collect();
        let space = Object::Array(vec![
            Object::Name(b"DeviceN".to_vec()),
            Object::Array(names),
            Object::Name(b"DeviceCMYK".to_vec()),
            Object::Null,
        ]);
        self.current().color_spaces.push(space);
        self
    }

    /// Paint a rectangle in DeviceCMYK.
    pub fn cmyk_fill(mut self) -> Self {
        self.current().cmyk_fill = true;
        self
    }

    /// Apply a graphics state with the given blend mode.
    pub fn blend_mode(mut self, mode: &str) -> Self {
        let state = dictionary! {
            "Type" => "ExtGState",
            "BM" => Object::Name(mode.as_bytes().to_vec()),
        };
        self.current().graphics_states.push(state);
        self
    }

    /// Apply a graphics state with fill overprint enabled.
    pub fn overprint(mut self) -> Self {
        let state = dictionary! {
            "Type" => "ExtGState",
            "op" => true,
            "OPM" => 1,
        };
        self.current().graphics_states.push(state);
        self
    }

    /// Apply a graphics state with constant fill alpha.
    pub fn fill_alpha(mut self, alpha: f32) -> Self {
        let state = dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(alpha),
        };
        self.current().graphics_states.push(state);
        self
    }

    /// Place a `pixel_width × pixel_height` RGB image scaled to the given
    /// display size in millimetres.
    pub fn image(
        mut self,
        pixel_width: u32,
        pixel_height: u32,
        display_width_mm: f64,
        display_height_mm: f64,
    ) -> Self {
        self.current().images.push(SampleImage {
            pixel_width,
            pixel_height,
            display_width_pt: display_width_mm / PT_TO_MM,
            display_height_pt: display_height_mm / PT_TO_MM,
        });
        self
    }

    /// Serialise the document.
    pub fn build(&self) -> Result<Vec<u8>, PreflightError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(self.pages.len());

        for page in &self.pages {
            let mut resources = Dictionary::new();
            let mut content = String::new();

            if !page.color_spaces.is_empty() {
                let mut spaces = Dictionary::new();
                for (index, space) in page.color_spaces.iter().enumerate() {
                    spaces.set(format!("CS{index}"), space.clone());
                }
                resources.set("ColorSpace", spaces);
            }

            if !page.graphics_states.is_empty() {
                let mut states = Dictionary::new();
                for (index, state) in page.graphics_states.iter().enumerate() {
                    let state_id = doc.add_object(state.clone());
                    states.set(format!("GS{index}"), state_id);
                    content.push_str(&format!("/GS{index} gs\n"));
                }
                resources.set("ExtGState", states);
            }

            if page.cmyk_fill {
                content.push_str("/DeviceCMYK cs\n0 0.5 1 0 sc\n10 10 50 50 re\nf\n");
            }

            if !page.images.is_empty() {
                let mut xobjects = Dictionary::new();
                for (index, image) in page.images.iter().enumerate() {
                    let samples =
                        vec![0u8; image.pixel_width as usize * image.pixel_height as usize * 3];
                    let image_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => image.pixel_width as i64,
                            "Height" => image.pixel_height as i64,
                            "ColorSpace" => "DeviceRGB",
                            "BitsPerComponent" => 8,
                        },
                        samples,
                    ));
                    xobjects.set(format!("Im{index}"), image_id);
                    content.push_str(&format!(
                        "q\n{:.4} 0 0 {:.4} 20 20 cm\n/Im{index} Do\nQ\n",
                        image.display_width_pt, image.display_height_pt
                    ));
                }
                resources.set("XObject", xobjects);
            }

            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(page.width_pt as f32),
                    Object::Real(page.height_pt as f32),
                ],
                "Resources" => resources,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        doc.save_to(&mut output).map_err(|err| {
            PreflightError::Inspection(format!("failed to serialise sample PDF: {err}"))
        })?;
        Ok(output)
    }

    fn current(&mut self) -> &mut SamplePage {
        if self.pages.is_empty() {
            self.pages.push(SamplePage::new(210.0 / PT_TO_MM, 297.0 / PT_TO_MM));
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}
