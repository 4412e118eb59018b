use crate::dialects;
use crate::engine::{RenderMetrics, Renderer};
use crate::error::ConfigError;
use std::collections::BTreeMap;

/// Result from [`render_verbose_with`].
#[derive(Debug, Clone)]
pub struct RenderReport {
    /// The converted document.
    pub text: String,
    /// Lines whose inline markup did not resolve, keyed by 1-based line number.
    pub errors: BTreeMap<usize, String>,
    /// Kind of the last block closed in the document.
    pub previous_block: Option<&'static str>,
    pub metrics: RenderMetrics,
}

/// Convert `text` with the default dialect.
///
/// # Example
/// ```
/// use wikirender::render;
///
/// let html = render("!!! Hello\n__world__").unwrap();
/// assert_eq!(html, "<h1>Hello</h1>\n<p><strong>world</strong></p>");
/// ```
pub fn render(text: &str) -> Result<String, ConfigError> {
    render_with(text, dialects::DEFAULT)
}

/// Convert `text` with the built-in dialect called `dialect`.
pub fn render_with(text: &str, dialect: &str) -> Result<String, ConfigError> {
    let mut renderer = Renderer::for_dialect(dialect)?;
    Ok(renderer.render(text))
}

/// Convert `text` and return the error lines and run metrics with it.
///
/// The plain [`render_with`] path keeps the same counters internally; this
/// only adds copying them out.
pub fn render_verbose_with(text: &str, dialect: &str) -> Result<RenderReport, ConfigError> {
    let mut renderer = Renderer::for_dialect(dialect)?;
    let run = renderer.render_with_metrics(text);

    Ok(RenderReport {
        text: run.text,
        errors: renderer.errors().clone(),
        previous_block: renderer.previous_block(),
        metrics: run.metrics,
    })
}
