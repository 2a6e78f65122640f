//! Conversion entry points: upload in, EPS or ZIP payload out.
//!
//! The pipeline is strictly linear and all-or-nothing:
//!
//! ```text
//! validate name → open document → (0 pages? reject) →
//!   for each page: rasterise → encode → collect
//! → close document → package
//! ```
//!
//! Any error short-circuits with `?`. The open document is a boxed
//! [`RasterDocument`]; it is closed when it drops, whichever way the function
//! exits, and explicitly before packaging on the success path.

use crate::config::ConversionConfig;
use crate::error::Pdf2EpsError;
use crate::output::{ConversionOutput, ConversionStats, EpsPage};
use crate::pipeline::input::{self, Upload};
use crate::pipeline::render::{RasterDocument, Rasterizer};
use crate::pipeline::{encode, package};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert an upload on the blocking thread pool.
///
/// pdfium rendering and EPS encoding are CPU-bound; running them inside
/// `spawn_blocking` keeps the async workers free to accept other requests.
pub async fn convert_upload(
    rasterizer: Arc<dyn Rasterizer>,
    upload: Upload,
    config: ConversionConfig,
) -> Result<ConversionOutput, Pdf2EpsError> {
    tokio::task::spawn_blocking(move || convert_blocking(rasterizer.as_ref(), &upload, &config))
        .await
        .map_err(|e| Pdf2EpsError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Convert an upload on the current thread.
pub fn convert_blocking(
    rasterizer: &dyn Rasterizer,
    upload: &Upload,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2EpsError> {
    let total_start = Instant::now();

    // ── Step 1: Validate name ────────────────────────────────────────────
    let filename = input::validate_filename(Some(&upload.filename))?;
    let base_name = input::base_name(filename, &config.fallback_base_name);
    info!(
        "Starting conversion: {} ({} bytes) → base '{}'",
        filename,
        upload.bytes.len(),
        base_name
    );

    // ── Step 2: Open document ────────────────────────────────────────────
    let document = rasterizer.open(&upload.bytes)?;
    let page_count = document.page_count();
    if page_count == 0 {
        return Err(Pdf2EpsError::NoPages);
    }

    // ── Step 3: Rasterise and encode every page ──────────────────────────
    let (pages, timings) = convert_pages(document.as_ref(), &base_name, config)?;

    // ── Step 4: Close document ───────────────────────────────────────────
    drop(document);

    // ── Step 5: Package ──────────────────────────────────────────────────
    let payload = package::package(&base_name, pages)?;

    let stats = ConversionStats {
        page_count,
        dpi: config.dpi,
        output_bytes: payload.data.len(),
        render_duration_ms: timings.render_ms,
        encode_duration_ms: timings.encode_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages → {} ({} bytes) in {}ms",
        page_count, payload.filename, stats.output_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        base_name,
        payload,
        stats,
    })
}

/// Convert a local PDF and write the result into `output_dir`.
///
/// The output is written atomically (temp file + rename) under the same name
/// the HTTP endpoint would suggest. Returns the written path.
pub async fn convert_to_dir(
    rasterizer: Arc<dyn Rasterizer>,
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: ConversionConfig,
) -> Result<(PathBuf, ConversionStats), Pdf2EpsError> {
    let input_path = input_path.as_ref();
    let output_dir = output_dir.as_ref();

    let bytes = tokio::fs::read(input_path)
        .await
        .map_err(|e| Pdf2EpsError::InputReadFailed {
            path: input_path.to_path_buf(),
            source: e,
        })?;
    let filename = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let output = convert_upload(rasterizer, Upload::new(filename, bytes), config).await?;

    let path = output_dir.join(&output.payload.filename);
    let write_err = |source| Pdf2EpsError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(output_dir).await.map_err(write_err)?;

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, &output.payload.data)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    Ok((path, output.stats))
}

// ── Internal helpers ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StageTimings {
    render_ms: u64,
    encode_ms: u64,
}

/// Rasterise and encode every page in document order.
fn convert_pages(
    document: &dyn RasterDocument,
    base_name: &str,
    config: &ConversionConfig,
) -> Result<(Vec<EpsPage>, StageTimings), Pdf2EpsError> {
    let total = document.page_count();
    let cb = config.progress_callback.as_ref();
    let mut timings = StageTimings::default();
    let mut pages = Vec::with_capacity(total);

    if let Some(cb) = cb {
        cb.on_conversion_start(total);
    }

    for idx in 0..total {
        let page_num = idx + 1;
        if let Some(cb) = cb {
            cb.on_page_start(page_num, total);
        }

        let result = convert_page(document, idx, base_name, config, &mut timings);
        match result {
            Ok(page) => {
                if let Some(cb) = cb {
                    cb.on_page_complete(page_num, total, page.data.len());
                }
                pages.push(page);
            }
            Err(e) => {
                warn!("Page {}/{} failed: {}", page_num, total, e);
                if let Some(cb) = cb {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
                return Err(e);
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_conversion_complete(total);
    }

    Ok((pages, timings))
}

fn convert_page(
    document: &dyn RasterDocument,
    idx: usize,
    base_name: &str,
    config: &ConversionConfig,
    timings: &mut StageTimings,
) -> Result<EpsPage, Pdf2EpsError> {
    let page_num = idx + 1;

    let render_start = Instant::now();
    let raster = document.render_page(idx, config.dpi)?;
    timings.render_ms += render_start.elapsed().as_millis() as u64;

    let encode_start = Instant::now();
    let data = encode::encode_page(&raster, config.encoding).map_err(|e| {
        Pdf2EpsError::EncodingFailed {
            page: page_num,
            detail: e.to_string(),
        }
    })?;
    timings.encode_ms += encode_start.elapsed().as_millis() as u64;

    debug!("Page {} → {} bytes EPS", page_num, data.len());

    Ok(EpsPage {
        page_num,
        filename: input::page_filename(base_name, page_num),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ConversionProgressCallback;
    use crate::pipeline::render::PageRaster;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves a fixed number of pages; page `fail_on` (1-indexed) fails.
    struct FakeRasterizer {
        pages: usize,
        fail_on: Option<usize>,
        closed: Arc<AtomicUsize>,
    }

    struct FakeDocument {
        pages: usize,
        fail_on: Option<usize>,
        closed: Arc<AtomicUsize>,
    }

    impl Drop for FakeDocument {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RasterDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render_page(&self, index: usize, dpi: u32) -> Result<PageRaster, Pdf2EpsError> {
            if self.fail_on == Some(index + 1) {
                return Err(Pdf2EpsError::RasterisationFailed {
                    page: index + 1,
                    detail: "boom".into(),
                });
            }
            let shade = (index * 40) as u8;
            Ok(PageRaster {
                image: RgbImage::from_pixel(3, 2, Rgb([shade, 0, 255])),
                dpi,
            })
        }
    }

    impl Rasterizer for FakeRasterizer {
        fn open<'a>(
            &'a self,
            bytes: &'a [u8],
        ) -> Result<Box<dyn RasterDocument + 'a>, Pdf2EpsError> {
            if !bytes.starts_with(b"%PDF") {
                return Err(Pdf2EpsError::CorruptPdf {
                    detail: "missing header".into(),
                });
            }
            Ok(Box::new(FakeDocument {
                pages: self.pages,
                fail_on: self.fail_on,
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn fake(pages: usize, fail_on: Option<usize>) -> FakeRasterizer {
        FakeRasterizer {
            pages,
            fail_on,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn upload(name: &str) -> Upload {
        Upload::new(name, b"%PDF-1.7 fake".to_vec())
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_conversion_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }
        fn on_page_complete(&self, page: usize, _total: usize, _eps_len: usize) {
            self.events.lock().unwrap().push(format!("done {page}"));
        }
        fn on_page_error(&self, page: usize, _total: usize, _error: &str) {
            self.events.lock().unwrap().push(format!("error {page}"));
        }
        fn on_conversion_complete(&self, total: usize) {
            self.events.lock().unwrap().push(format!("complete {total}"));
        }
    }

    #[test]
    fn single_page_yields_bare_eps() {
        let r = fake(1, None);
        let out = convert_blocking(&r, &upload("Report.PDF"), &ConversionConfig::default()).unwrap();
        assert_eq!(out.base_name, "Report");
        assert_eq!(out.payload.filename, "Report_page_1.eps");
        assert!(out.payload.data.starts_with(b"%!PS-Adobe-3.0 EPSF-3.0"));
        assert_eq!(out.stats.page_count, 1);
        assert_eq!(r.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multi_page_yields_zip_and_closes_once() {
        let r = fake(3, None);
        let out = convert_blocking(&r, &upload("scan.pdf"), &ConversionConfig::default()).unwrap();
        assert_eq!(out.payload.filename, "scan_eps.zip");
        assert_eq!(out.payload.content_type, "application/zip");
        assert_eq!(r.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_pages_is_rejected_and_closed() {
        let r = fake(0, None);
        let err = convert_blocking(&r, &upload("empty.pdf"), &ConversionConfig::default())
            .unwrap_err();
        assert!(matches!(err, Pdf2EpsError::NoPages));
        assert_eq!(r.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_failure_aborts_and_closes() {
        let r = fake(3, Some(2));
        let recorder = Arc::new(Recorder::default());
        let config = ConversionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let err = convert_blocking(&r, &upload("doc.pdf"), &config).unwrap_err();
        assert!(matches!(err, Pdf2EpsError::RasterisationFailed { page: 2, .. }));
        assert_eq!(r.closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["start 3", "done 1", "error 2"]
        );
    }

    #[test]
    fn bad_name_is_rejected_before_opening() {
        let r = fake(1, None);
        let err = convert_blocking(&r, &upload("notes.txt"), &ConversionConfig::default())
            .unwrap_err();
        assert!(matches!(err, Pdf2EpsError::NotPdfExtension { .. }));
        assert_eq!(r.closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn progress_reports_every_page() {
        let r = fake(2, None);
        let recorder = Arc::new(Recorder::default());
        let config = ConversionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        convert_blocking(&r, &upload("doc.pdf"), &config).unwrap();
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["start 2", "done 1", "done 2", "complete 2"]
        );
    }

    #[tokio::test]
    async fn convert_to_dir_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("My Doc.pdf");
        std::fs::write(&input, b"%PDF-1.4 fake").unwrap();
        let out_dir = dir.path().join("out");

        let (path, stats) = convert_to_dir(
            Arc::new(fake(2, None)),
            &input,
            &out_dir,
            ConversionConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(path, out_dir.join("My_Doc_eps.zip"));
        assert_eq!(stats.page_count, 2);
        assert!(path.exists());
        assert!(!out_dir.join("My_Doc_eps.tmp").exists());
    }

    #[tokio::test]
    async fn convert_to_dir_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_to_dir(
            Arc::new(fake(1, None)),
            dir.path().join("absent.pdf"),
            dir.path(),
            ConversionConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Pdf2EpsError::InputReadFailed { .. }));
    }
}
