//! Render metrics.
//!
//! Counters collected while rendering one document. They cost a few integer
//! increments per line and are always collected; [`Renderer::render`]
//! simply drops them.
//!
//! [`Renderer::render`]: crate::Renderer::render

use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderMetrics {
    /// Total elapsed time, hooks included.
    pub total: Duration,
    /// Input lines after `on_start`.
    pub lines: usize,
    /// Persistent blocks opened.
    pub blocks_opened: usize,
    /// Single-line (close-now) blocks emitted.
    pub immediate_blocks: usize,
    /// Non-blank lines no catalog rule accepted.
    pub fallback_lines: usize,
    /// Blank lines outside any block.
    pub blank_lines: usize,
    /// Lines recorded in the error map.
    pub error_lines: usize,
}

/// Renderer output bundled with its metrics.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub text: String,
    pub metrics: RenderMetrics,
}
