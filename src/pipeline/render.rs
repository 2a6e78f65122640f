//! PDF decoding and rasterisation: bytes → open document → RGB pages.
//!
//! The engine sits behind two traits so the rest of the pipeline never names
//! pdfium directly:
//!
//! * [`Rasterizer`] opens a byte slice as a document.
//! * [`RasterDocument`] is the open document handle. It reports its page
//!   count and renders one page at a time.
//!
//! Closing is tied to scope: a handle is released when its `Box` drops, on
//! success, on an early `?` return, and while unwinding from a panic.
//!
//! ## Scaling
//!
//! EPS consumers place the raster at the page's physical size. Rendering at
//! a fixed DPI keeps a known pixel-to-point ratio (`72 / dpi`) that the
//! encoder writes into the bounding box.

use crate::error::Pdf2EpsError;
use image::RgbImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// PostScript points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// One rendered page: RGB pixels (no alpha) plus the DPI they were made at.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub image: RgbImage,
    pub dpi: u32,
}

impl PageRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Row-major RGB samples, 3 bytes per pixel.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// An open, decoded document. Dropping it closes the document.
pub trait RasterDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render the page at `index` (0-based) to RGB at `dpi`.
    fn render_page(&self, index: usize, dpi: u32) -> Result<PageRaster, Pdf2EpsError>;
}

/// Opens PDF bytes as a [`RasterDocument`].
///
/// Implementations must be shareable across request handlers.
pub trait Rasterizer: Send + Sync {
    /// Decode `bytes` as a PDF.
    ///
    /// Fails with [`Pdf2EpsError::CorruptPdf`] or
    /// [`Pdf2EpsError::PasswordRequired`] when the bytes cannot be opened.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>, Pdf2EpsError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`Rasterizer`] backed by a bound pdfium library.
///
/// Build one with [`crate::engine::bind_pdfium`]. The `thread_safe` feature
/// of `pdfium-render` serialises calls into the C library, so a single
/// instance can be shared by every request.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>, Pdf2EpsError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(classify_load_error)?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// Map a pdfium load failure to an input error.
fn classify_load_error(e: PdfiumError) -> Pdf2EpsError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        Pdf2EpsError::PasswordRequired
    } else {
        Pdf2EpsError::CorruptPdf { detail }
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<PageRaster, Pdf2EpsError> {
        let page_num = index + 1;
        let page_index = u16::try_from(index).map_err(|_| Pdf2EpsError::RasterisationFailed {
            page: page_num,
            detail: format!("page index {index} exceeds pdfium's range"),
        })?;

        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| Pdf2EpsError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
            .set_clear_color(PdfColor::WHITE);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| Pdf2EpsError::RasterisationFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        // Transparent regions were cleared to white above; dropping alpha
        // here leaves plain RGB.
        let image = bitmap.as_image().to_rgb8();
        debug!(
            "Rendered page {} → {}x{} px @ {} dpi",
            page_num,
            image.width(),
            image.height(),
            dpi
        );

        Ok(PageRaster { image, dpi })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn page_raster_exposes_rgb_samples() {
        let raster = PageRaster {
            image: RgbImage::from_pixel(4, 2, Rgb([10, 20, 30])),
            dpi: 300,
        };
        assert_eq!(raster.width(), 4);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.pixels().len(), 4 * 2 * 3);
        assert_eq!(&raster.pixels()[..3], &[10, 20, 30]);
    }

    #[test]
    fn password_errors_are_classified() {
        let e = classify_load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(e, Pdf2EpsError::PasswordRequired));

        let e = classify_load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError,
        ));
        assert!(matches!(e, Pdf2EpsError::CorruptPdf { .. }));
    }
}
