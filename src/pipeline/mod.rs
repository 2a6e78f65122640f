//! Pipeline stages for PDF-to-EPS conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the rendering engine can be swapped without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ package
//! (name)   (pdfium)    (EPS)     (EPS | ZIP)
//! ```
//!
//! 1. [`input`]: validate the upload's filename and derive the base name
//! 2. [`render`]: open the PDF and rasterise each page to RGB at fixed DPI
//! 3. [`encode`]: write one RGB raster as an EPS file
//! 4. [`package`]: return a lone EPS directly or zip several together

pub mod encode;
pub mod input;
pub mod package;
pub mod render;
