//! Result types returned by a successful conversion.

use crate::error::BlockError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A written PDF plus what happened along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Absolute path of the written PDF.
    pub path: PathBuf,
    pub stats: ConversionStats,
    /// Blocks that degraded (undecodable diagram, failed highlighting).
    pub issues: Vec<BlockError>,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub diagram_count: usize,
    pub code_blocks: usize,
    pub highlighted_blocks: usize,
    /// Settle delay actually used for this document.
    pub render_delay_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ConversionOutput {
    /// Human-readable success message for tool results and the CLI.
    pub fn message(&self) -> String {
        format!("Successfully created PDF at {}", self.path.display())
    }
}
