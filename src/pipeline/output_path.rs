//! Output path resolution: where the PDF lands, without clobbering anything.
//!
//! Relative filenames are placed in the output directory (`M2P_OUTPUT_DIR`,
//! else the home directory, else the working directory). An existing file is
//! never overwritten: `report.pdf` becomes `report-1.pdf`, then `report-2.pdf`,
//! and so on.
//!
//! Resolution and the later write are not atomic with respect to other
//! callers; two concurrent calls can resolve the same free name.

use crate::config::OUTPUT_DIR_ENV;
use crate::error::Md2PdfError;
use crate::request::DEFAULT_OUTPUT_FILENAME;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory used for relative output filenames.
pub fn default_output_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Ensure the filename ends in `.pdf` (checked case-insensitively).
pub fn normalize_filename(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return DEFAULT_OUTPUT_FILENAME.to_string();
    }
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

/// Place a normalized filename: absolute names are kept, relative names are
/// joined onto `dir`. The result is absolute.
pub fn target_path(dir: &Path, filename: &str) -> Result<PathBuf, Md2PdfError> {
    let name = PathBuf::from(normalize_filename(filename));
    let joined = if name.is_absolute() {
        name
    } else {
        dir.join(name)
    };
    std::path::absolute(&joined).map_err(|e| Md2PdfError::OutputDirFailed {
        path: joined.clone(),
        source: e,
    })
}

/// Create the destination directory, then return the first free variant of
/// `requested`.
pub fn resolve(requested: &Path) -> Result<PathBuf, Md2PdfError> {
    let dir = requested
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir).map_err(|e| Md2PdfError::OutputDirFailed {
        path: dir.clone(),
        source: e,
    })?;

    if !requested.exists() {
        return Ok(requested.to_path_buf());
    }

    let stem = requested
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = requested
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}-{counter}{extension}"));
        if !candidate.exists() {
            debug!(
                "{} exists, using {}",
                requested.display(),
                candidate.display()
            );
            return Ok(candidate);
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this crate that touches the process environment.
    #[test]
    fn output_dir_follows_environment() {
        let saved = std::env::var_os(OUTPUT_DIR_ENV);
        let dir = tempfile::tempdir().unwrap();

        std::env::set_var(OUTPUT_DIR_ENV, dir.path());
        assert_eq!(default_output_dir(), dir.path());

        std::env::set_var(OUTPUT_DIR_ENV, "  ");
        let fallback = dirs::home_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        assert_eq!(default_output_dir(), fallback);

        std::env::remove_var(OUTPUT_DIR_ENV);
        assert_eq!(default_output_dir(), fallback);

        match saved {
            Some(v) => std::env::set_var(OUTPUT_DIR_ENV, v),
            None => std::env::remove_var(OUTPUT_DIR_ENV),
        }
    }

    #[test]
    fn normalize_appends_suffix() {
        assert_eq!(normalize_filename("report"), "report.pdf");
        assert_eq!(normalize_filename("report.pdf"), "report.pdf");
        assert_eq!(normalize_filename("REPORT.PDF"), "REPORT.PDF");
        assert_eq!(normalize_filename("notes.md"), "notes.md.pdf");
        assert_eq!(normalize_filename("  "), "output.pdf");
    }

    #[test]
    fn target_keeps_absolute_names() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("abs.pdf");
        let t = target_path(Path::new("/somewhere/else"), abs.to_str().unwrap()).unwrap();
        assert_eq!(t, abs);

        let t = target_path(dir.path(), "rel").unwrap();
        assert_eq!(t, dir.path().join("rel.pdf"));
    }

    #[test]
    fn resolve_free_path_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("output.pdf");
        assert_eq!(resolve(&p).unwrap(), p);
    }

    #[test]
    fn resolve_increments_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("output.pdf");

        std::fs::write(&p, b"x").unwrap();
        let first = resolve(&p).unwrap();
        assert_eq!(first, dir.path().join("output-1.pdf"));

        std::fs::write(&first, b"x").unwrap();
        let second = resolve(&p).unwrap();
        assert_eq!(second, dir.path().join("output-2.pdf"));
    }

    #[test]
    fn resolve_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a/b/c/out.pdf");
        assert_eq!(resolve(&p).unwrap(), p);
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[test]
    fn resolve_reports_directory_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = resolve(&blocker.join("out.pdf")).unwrap_err();
        assert!(matches!(err, Md2PdfError::OutputDirFailed { .. }));
    }
}
