//! EPS encoding: RGB raster → Encapsulated PostScript bytes.
//!
//! The output is a single-page EPSF-3.0 file that paints the raster with one
//! image operator. Nothing in the header varies between runs (no creation
//! date, no random IDs), so the same pixels always give the same bytes.
//!
//! The image is scaled to its physical size: at `dpi` pixels per inch one
//! pixel covers `72 / dpi` points, so a 300 DPI Letter page has a
//! `0 0 612 792` bounding box and places at its original size.
//!
//! Two sample encodings are supported, see [`EpsEncoding`]:
//!
//! * `Hex` writes samples as hex and paints them with `colorimage`
//!   reading through `readhexstring`. LanguageLevel 1, readable by anything.
//! * `Flate` deflates the samples and wraps them in ASCII85, decoded by an
//!   image dictionary's `/DataSource` filter chain. LanguageLevel 3.

use crate::config::EpsEncoding;
use crate::pipeline::render::{PageRaster, POINTS_PER_INCH};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write as _;
use thiserror::Error;
use tracing::debug;

/// Bytes of pixel data per hex line (64 hex characters).
const HEX_BYTES_PER_LINE: usize = 32;

/// ASCII85 characters per line.
const A85_CHARS_PER_LINE: usize = 75;

/// Why a raster could not be encoded.
#[derive(Debug, Error)]
pub enum EpsError {
    #[error("image has zero width or height ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGB")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("DPI must be positive")]
    ZeroDpi,

    #[error("compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

/// Encode a rendered page as EPS.
pub fn encode_page(raster: &PageRaster, encoding: EpsEncoding) -> Result<Vec<u8>, EpsError> {
    encode_rgb(
        raster.width(),
        raster.height(),
        raster.pixels(),
        raster.dpi,
        encoding,
    )
}

/// Encode a row-major RGB buffer (`width * height * 3` bytes) as EPS.
pub fn encode_rgb(
    width: u32,
    height: u32,
    pixels: &[u8],
    dpi: u32,
    encoding: EpsEncoding,
) -> Result<Vec<u8>, EpsError> {
    if width == 0 || height == 0 {
        return Err(EpsError::EmptyImage { width, height });
    }
    if dpi == 0 {
        return Err(EpsError::ZeroDpi);
    }
    let expected = width as usize * height as usize * 3;
    if pixels.len() != expected {
        return Err(EpsError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }

    let mut out = Vec::with_capacity(match encoding {
        EpsEncoding::Hex => expected * 2 + expected / HEX_BYTES_PER_LINE + 1024,
        EpsEncoding::Flate => expected / 4 + 1024,
    });

    out.extend_from_slice(header(width, height, dpi, encoding).as_bytes());
    match encoding {
        EpsEncoding::Hex => write_hex_body(&mut out, width, height, pixels),
        EpsEncoding::Flate => write_flate_body(&mut out, width, height, pixels)?,
    }
    out.extend_from_slice(TRAILER.as_bytes());

    debug!(
        "Encoded {}x{} px → {} bytes EPS ({})",
        width,
        height,
        out.len(),
        encoding
    );
    Ok(out)
}

const TRAILER: &str = "grestore\nshowpage\n%%Trailer\n%%EOF\n";

/// DSC header up to and including `gsave` and the placement transform.
fn header(width: u32, height: u32, dpi: u32, encoding: EpsEncoding) -> String {
    let scale = POINTS_PER_INCH as f64 / dpi as f64;
    let w_pt = width as f64 * scale;
    let h_pt = height as f64 * scale;

    format!(
        "%!PS-Adobe-3.0 EPSF-3.0\n\
         %%Creator: pdf2eps {version}\n\
         %%Title: page raster {width}x{height} @ {dpi} dpi\n\
         %%BoundingBox: 0 0 {bb_w} {bb_h}\n\
         %%HiResBoundingBox: 0 0 {w_pt:.4} {h_pt:.4}\n\
         %%LanguageLevel: {level}\n\
         %%Pages: 1\n\
         %%EndComments\n\
         %%BeginProlog\n\
         %%EndProlog\n\
         %%Page: 1 1\n\
         gsave\n\
         {w_pt:.4} {h_pt:.4} scale\n",
        version = env!("CARGO_PKG_VERSION"),
        bb_w = w_pt.ceil() as u64,
        bb_h = h_pt.ceil() as u64,
        level = encoding.language_level(),
    )
}

fn write_hex_body(out: &mut Vec<u8>, width: u32, height: u32, pixels: &[u8]) {
    let program = format!(
        "/rowbuf {row} string def\n\
         {width} {height} 8 [{width} 0 0 -{height} 0 {height}]\n\
         {{ currentfile rowbuf readhexstring pop }} bind\n\
         false 3 colorimage\n",
        row = width as usize * 3,
    );
    out.extend_from_slice(program.as_bytes());

    let mut line = [0u8; HEX_BYTES_PER_LINE * 2];
    for chunk in pixels.chunks(HEX_BYTES_PER_LINE) {
        let n = chunk.len() * 2;
        // `line` is always large enough for a full chunk.
        if hex::encode_to_slice(chunk, &mut line[..n]).is_ok() {
            out.extend_from_slice(&line[..n]);
        }
        out.push(b'\n');
    }
}

fn write_flate_body(
    out: &mut Vec<u8>,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<(), EpsError> {
    let program = format!(
        "/DeviceRGB setcolorspace\n\
         <<\n\
         /ImageType 1\n\
         /Width {width}\n\
         /Height {height}\n\
         /BitsPerComponent 8\n\
         /Decode [0 1 0 1 0 1]\n\
         /ImageMatrix [{width} 0 0 -{height} 0 {height}]\n\
         /DataSource currentfile /ASCII85Decode filter /FlateDecode filter\n\
         >> image\n"
    );
    out.extend_from_slice(program.as_bytes());

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(pixels)?;
    let compressed = encoder.finish()?;

    write_ascii85(out, &compressed);
    Ok(())
}

/// Append `data` as ASCII85 (Adobe flavour: `z` for zero groups, `~>` EOD).
fn write_ascii85(out: &mut Vec<u8>, data: &[u8]) {
    let mut encoded = Vec::with_capacity(data.len() / 4 * 5 + 5);

    let mut chunks = data.chunks_exact(4);
    for group in &mut chunks {
        let word = u32::from_be_bytes([group[0], group[1], group[2], group[3]]);
        if word == 0 {
            encoded.push(b'z');
        } else {
            encoded.extend_from_slice(&a85_digits(word));
        }
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut padded = [0u8; 4];
        padded[..rest.len()].copy_from_slice(rest);
        let digits = a85_digits(u32::from_be_bytes(padded));
        encoded.extend_from_slice(&digits[..rest.len() + 1]);
    }

    for line in encoded.chunks(A85_CHARS_PER_LINE) {
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    out.extend_from_slice(b"~>\n");
}

fn a85_digits(mut word: u32) -> [u8; 5] {
    let mut digits = [0u8; 5];
    for d in digits.iter_mut().rev() {
        *d = (word % 85) as u8 + b'!';
        word /= 85;
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{Rgb, RgbImage};
    use std::io::Read;

    fn raster(width: u32, height: u32, dpi: u32) -> PageRaster {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8])
        });
        PageRaster { image, dpi }
    }

    fn text(bytes: &[u8]) -> &str {
        std::str::from_utf8(bytes).expect("EPS output is ASCII")
    }

    /// Decode the ASCII85 payload between `>> image\n` and `~>`.
    fn decode_a85(body: &str) -> Vec<u8> {
        let start = body.find(">> image\n").expect("image operator") + ">> image\n".len();
        let end = body[start..].find("~>").expect("EOD marker") + start;
        let mut out = Vec::new();
        let mut group = Vec::with_capacity(5);
        for c in body[start..end].bytes().filter(|c| !c.is_ascii_whitespace()) {
            if c == b'z' && group.is_empty() {
                out.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            group.push(c);
            if group.len() == 5 {
                let word = group.iter().fold(0u64, |acc, &d| acc * 85 + (d - b'!') as u64) as u32;
                out.extend_from_slice(&word.to_be_bytes());
                group.clear();
            }
        }
        if !group.is_empty() {
            let n = group.len();
            while group.len() < 5 {
                group.push(b'u');
            }
            let word = group.iter().fold(0u64, |acc, &d| acc * 85 + (d - b'!') as u64) as u32;
            out.extend_from_slice(&word.to_be_bytes()[..n - 1]);
        }
        out
    }

    #[test]
    fn hex_output_has_dsc_header_and_trailer() {
        let eps = encode_page(&raster(10, 4, 72), EpsEncoding::Hex).unwrap();
        let s = text(&eps);
        assert!(s.starts_with("%!PS-Adobe-3.0 EPSF-3.0\n"));
        assert!(s.contains("%%BoundingBox: 0 0 10 4\n"));
        assert!(s.contains("%%LanguageLevel: 1\n"));
        assert!(s.contains("false 3 colorimage\n"));
        assert!(s.ends_with("showpage\n%%Trailer\n%%EOF\n"));
    }

    #[test]
    fn bounding_box_is_physical_size() {
        // 8.5 x 11 in at 300 dpi
        let eps = encode_rgb(2550, 3300, &vec![255; 2550 * 3300 * 3], 300, EpsEncoding::Flate)
            .unwrap();
        let s = text(&eps);
        assert!(s.contains("%%BoundingBox: 0 0 612 792\n"), "{}", &s[..300]);
        assert!(s.contains("%%HiResBoundingBox: 0 0 612.0000 792.0000\n"));
    }

    #[test]
    fn bounding_box_rounds_up() {
        // 1 px at 300 dpi = 0.24 pt
        let eps = encode_rgb(1, 1, &[0, 0, 0], 300, EpsEncoding::Hex).unwrap();
        assert!(text(&eps).contains("%%BoundingBox: 0 0 1 1\n"));
    }

    #[test]
    fn hex_body_round_trips_pixels() {
        let r = raster(9, 5, 150);
        let eps = encode_page(&r, EpsEncoding::Hex).unwrap();
        let s = text(&eps);
        let start = s.find("colorimage\n").unwrap() + "colorimage\n".len();
        let end = s.find("grestore").unwrap();
        let hex_text: String = s[start..end].split_whitespace().collect();
        assert_eq!(hex::decode(hex_text).unwrap(), r.pixels());
        assert!(s[start..end].lines().all(|l| l.len() <= 64));
    }

    #[test]
    fn flate_body_round_trips_pixels() {
        let r = raster(33, 17, 300);
        let eps = encode_page(&r, EpsEncoding::Flate).unwrap();
        let s = text(&eps);
        assert!(s.contains("%%LanguageLevel: 3\n"));
        assert!(s.contains("/FlateDecode filter"));

        let compressed = decode_a85(s);
        let mut pixels = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut pixels)
            .unwrap();
        assert_eq!(pixels, r.pixels());
    }

    #[test]
    fn ascii85_edge_cases() {
        let mut out = Vec::new();
        write_ascii85(&mut out, &[0, 0, 0, 0, 0xff]);
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with('z'));
        assert!(s.ends_with("~>\n"));

        let mut out = Vec::new();
        write_ascii85(&mut out, b"");
        assert_eq!(out, b"~>\n");
    }

    #[test]
    fn encoding_is_deterministic() {
        let r = raster(20, 20, 300);
        for enc in [EpsEncoding::Hex, EpsEncoding::Flate] {
            assert_eq!(encode_page(&r, enc).unwrap(), encode_page(&r, enc).unwrap());
        }
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let err = encode_rgb(4, 4, &[0; 10], 300, EpsEncoding::Hex).unwrap_err();
        assert!(matches!(err, EpsError::BufferSize { expected: 48, actual: 10, .. }));
    }

    #[test]
    fn rejects_empty_image_and_zero_dpi() {
        assert!(matches!(
            encode_rgb(0, 5, &[], 300, EpsEncoding::Hex),
            Err(EpsError::EmptyImage { .. })
        ));
        assert!(matches!(
            encode_rgb(1, 1, &[1, 2, 3], 0, EpsEncoding::Hex),
            Err(EpsError::ZeroDpi)
        ));
    }
}
