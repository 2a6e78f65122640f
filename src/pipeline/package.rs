//! Output packaging: one EPS is returned as-is, several are zipped.
//!
//! The branch depends only on how many pages were converted. ZIP entries
//! keep page order and carry a fixed timestamp (1980-01-01, the DOS epoch),
//! so converting the same document twice yields the same archive bytes.

use crate::error::Pdf2EpsError;
use crate::output::{EpsPage, Payload, PayloadKind};
use crate::pipeline::input::archive_filename;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// MIME type of a single EPS response.
pub const EPS_MIME: &str = "application/postscript";

/// MIME type of a multi-page response.
pub const ZIP_MIME: &str = "application/zip";

/// Package converted pages into the response payload.
///
/// * one page → the EPS bytes under the page's own filename;
/// * more → a deflate ZIP named `{base_name}_eps.zip`.
pub fn package(base_name: &str, mut pages: Vec<EpsPage>) -> Result<Payload, Pdf2EpsError> {
    match pages.len() {
        0 => Err(Pdf2EpsError::Internal("no pages to package".to_string())),
        1 => {
            let page = pages.remove(0);
            Ok(Payload {
                kind: PayloadKind::Eps,
                filename: page.filename,
                content_type: EPS_MIME,
                data: page.data,
            })
        }
        n => {
            let data = zip_pages(&pages)?;
            debug!("Packaged {} pages → {} byte ZIP", n, data.len());
            Ok(Payload {
                kind: PayloadKind::Zip,
                filename: archive_filename(base_name),
                content_type: ZIP_MIME,
                data,
            })
        }
    }
}

/// Write every page into an in-memory ZIP, in order.
fn zip_pages(pages: &[EpsPage]) -> Result<Vec<u8>, Pdf2EpsError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for page in pages {
        zip.start_file(page.filename.as_str(), options)
            .map_err(|e| Pdf2EpsError::ArchiveFailed(format!("entry {}: {e}", page.filename)))?;
        zip.write_all(&page.data)
            .map_err(|e| Pdf2EpsError::ArchiveFailed(format!("entry {}: {e}", page.filename)))?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| Pdf2EpsError::ArchiveFailed(e.to_string()))?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn page(name: &str, body: &str) -> EpsPage {
        EpsPage {
            page_num: 0,
            filename: name.to_string(),
            data: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn single_page_is_returned_unwrapped() {
        let payload = package("doc", vec![page("doc_page_1.eps", "%!PS")]).unwrap();
        assert_eq!(payload.kind, PayloadKind::Eps);
        assert_eq!(payload.content_type, "application/postscript");
        assert_eq!(payload.filename, "doc_page_1.eps");
        assert_eq!(payload.data, b"%!PS");
    }

    #[test]
    fn multiple_pages_are_zipped_in_order() {
        let pages = vec![
            page("doc_page_1.eps", "one"),
            page("doc_page_2.eps", "two"),
            page("doc_page_3.eps", "three"),
        ];
        let payload = package("doc", pages).unwrap();
        assert_eq!(payload.kind, PayloadKind::Zip);
        assert_eq!(payload.content_type, "application/zip");
        assert_eq!(payload.filename, "doc_eps.zip");

        let mut archive = ZipArchive::new(Cursor::new(payload.data)).unwrap();
        assert_eq!(archive.len(), 3);
        for (i, expected) in ["one", "two", "three"].iter().enumerate() {
            let mut entry = archive.by_index(i).unwrap();
            assert_eq!(entry.name(), format!("doc_page_{}.eps", i + 1));
            assert_eq!(entry.compression(), CompressionMethod::Deflated);
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            assert_eq!(body, *expected);
        }
    }

    #[test]
    fn zip_output_is_deterministic() {
        let make = || {
            package(
                "doc",
                vec![page("doc_page_1.eps", "a"), page("doc_page_2.eps", "b")],
            )
            .unwrap()
            .data
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn zero_pages_is_an_internal_error() {
        let err = package("doc", Vec::new()).unwrap_err();
        assert!(matches!(err, Pdf2EpsError::Internal(_)));
    }
}
