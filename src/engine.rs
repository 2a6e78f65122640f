//! Locate and bind the pdfium shared library.
//!
//! `pdfium-render` loads pdfium at runtime, so the library has to be found
//! before the first document is opened. The server binds once at startup and
//! refuses to start without it; a missing engine is a deployment problem,
//! not something to report per request.
//!
//! Resolution order (first hit wins):
//!
//! 1. `PDFIUM_LIB_PATH`: the library file itself, or the directory holding it.
//! 2. The directory containing the running executable.
//! 3. The current working directory.
//! 4. The system library search path.

use crate::error::Pdf2EpsError;
use crate::pipeline::render::PdfiumRasterizer;
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium location.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Candidate library files, in resolution order, excluding the system path.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !p.is_empty() {
            let p = PathBuf::from(p);
            if p.is_dir() {
                candidates.push(Pdfium::pdfium_platform_library_name_at_path(&p));
            } else {
                candidates.push(p);
            }
        }
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(&dir));
    }

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(&cwd));
    }

    candidates
}

/// Bind pdfium, trying each candidate path and finally the system library.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2EpsError> {
    let mut failures = Vec::new();

    for path in candidate_paths() {
        if !path.exists() {
            debug!("pdfium not at {}", path.display());
            continue;
        }
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => {
                info!("Bound pdfium from {}", path.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => failures.push(format!("{}: {:?}", path.display(), e)),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            info!("Bound system pdfium library");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            failures.push(format!("system library: {:?}", e));
            Err(Pdf2EpsError::PdfiumBindingFailed(failures.join("; ")))
        }
    }
}

/// Bind pdfium and wrap it as the production rasterizer.
pub fn pdfium_rasterizer() -> Result<PdfiumRasterizer, Pdf2EpsError> {
    bind_pdfium().map(PdfiumRasterizer::new)
}
