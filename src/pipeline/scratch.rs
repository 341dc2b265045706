//! Scratch space for the temporary HTML documents handed to the browser.
//!
//! One [`ScratchSpace`] is created at startup and owns a private temporary
//! directory. Each call writes its document into a [`ScratchFile`] inside it;
//! the file is removed as soon as the handle is dropped, right after the
//! render whether it succeeded or not. [`ScratchSpace::drain`] removes the
//! directory and anything a crashed call might have left behind; the server
//! runs it on shutdown, including after SIGINT/SIGTERM.

use crate::error::Md2PdfError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

/// Process-scoped registry of scratch files.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

/// A scratch HTML document, deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl ScratchSpace {
    /// Create the scratch directory under the system temp dir.
    pub fn new() -> Result<Self, Md2PdfError> {
        let dir = tempfile::Builder::new()
            .prefix("md2pdf-")
            .tempdir()
            .map_err(Md2PdfError::ScratchFailed)?;
        debug!("Scratch space at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `html` to a fresh scratch file.
    pub fn create_html(&self, html: &str) -> Result<ScratchFile, Md2PdfError> {
        let mut file = tempfile::Builder::new()
            .prefix("document-")
            .suffix(".html")
            .tempfile_in(self.dir.path())
            .map_err(Md2PdfError::ScratchFailed)?;
        file.write_all(html.as_bytes())
            .and_then(|_| file.flush())
            .map_err(Md2PdfError::ScratchFailed)?;
        Ok(ScratchFile { file })
    }

    /// Files currently present in the scratch directory.
    pub fn live_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }

    /// Remove the scratch directory and everything in it.
    pub fn drain(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed scratch space {}", path.display()),
            Err(e) => warn!("Failed to remove scratch space {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_file_is_removed_on_drop() {
        let scratch = ScratchSpace::new().unwrap();
        let file = scratch.create_html("<p>hi</p>").unwrap();
        let path = file.path().to_path_buf();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>hi</p>");
        assert!(path.extension().is_some_and(|e| e == "html"));
        assert_eq!(scratch.live_files(), vec![path.clone()]);

        drop(file);
        assert!(!path.exists());
        assert!(scratch.live_files().is_empty());
    }

    #[test]
    fn drain_removes_directory() {
        let scratch = ScratchSpace::new().unwrap();
        let dir = scratch.path().to_path_buf();
        let leaked = scratch.create_html("x").unwrap();
        let (_, leaked_path) = leaked.file.keep().unwrap();
        assert!(leaked_path.exists());

        scratch.drain();
        assert!(!dir.exists());
        assert!(!leaked_path.exists());
    }
}
