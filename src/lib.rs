extern crate self as wikirender;

#[macro_use]
mod macros;
mod api;
pub mod dialects;
mod engine;
mod error;

pub use api::{RenderReport, render, render_verbose_with, render_with};
pub use engine::{InlineParser, LineContext, ParsedInline, RenderMetrics, RenderResult, Renderer};
pub use error::ConfigError;

// --- Inline tag rules ---------------------------------------------------------

pub type TagRender = Box<dyn Fn(&TagContent, &mut DocumentState) -> String + Send + Sync>;

/// One inline tag: an open marker, a close marker, optional separators that
/// split the content into positional parts, and a render function that
/// receives the already-rendered content.
///
/// Markers are compared literally. Build rules with the `tag!` macro.
pub struct TagRule {
    pub name: &'static str,
    pub open: &'static str,
    pub close: &'static str,
    /// Markers splitting the content into parts (`[[label|url]]`).
    pub separators: &'static [&'static str],
    /// Whether other tags may open inside this one. Inline code sets this to
    /// false so its content is only escaped.
    pub nested: bool,
    pub render: TagRender,
}

impl std::fmt::Debug for TagRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagRule")
            .field("name", &self.name)
            .field("open", &self.open)
            .field("close", &self.close)
            .field("separators", &self.separators)
            .field("nested", &self.nested)
            .field("render", &"<function>")
            .finish()
    }
}

/// A fixed marker replaced by fixed output (`%%%` -> `<br />`).
#[derive(Debug, Clone, Copy)]
pub struct SimpleTag {
    pub marker: &'static str,
    pub output: &'static str,
}

/// Content captured between a tag's markers.
///
/// `parts` hold rendered text (escaped, nested tags applied); `raw` holds the
/// matching source slices, for values that go into attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagContent {
    pub parts: Vec<String>,
    pub raw: Vec<String>,
}

impl TagContent {
    /// Rendered part `idx`, or `""` when the source had fewer parts.
    pub fn text(&self, idx: usize) -> &str {
        self.parts.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Raw source of part `idx`, or `""`.
    pub fn raw(&self, idx: usize) -> &str {
        self.raw.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| p.is_empty())
    }
}

/// Inline configuration of a dialect.
pub struct InlineRules {
    /// Tag rules, in priority order: the first open marker that matches wins.
    pub tags: Vec<TagRule>,
    pub simple: Vec<SimpleTag>,
    /// Character making the next character literal.
    pub escape_char: Option<char>,
    /// Escaping applied to plain text (and to literal fallbacks).
    pub escape: fn(&str) -> String,
}

impl InlineRules {
    /// No tags, no escaping.
    pub fn plain() -> Self {
        InlineRules { tags: Vec::new(), simple: Vec::new(), escape_char: None, escape: |s| s.to_string() }
    }
}

// --- Block rules --------------------------------------------------------------

bitflags::bitflags! {
    /// Static behaviour of a block rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u8 {
        /// A match is a complete block: open, render and close on one line.
        const CLOSE_NOW  = 1 << 0;
        /// The rule carries per-block state and must be instantiated from
        /// its template before becoming active.
        const MUST_CLONE = 1 << 1;
    }
}

/// A block-level rule.
///
/// The renderer holds one template per rule for a whole document. `detect`
/// records the match payload on the receiver and the renderer calls
/// `render_line` right after a successful `detect`. Rules flagged
/// [`BlockFlags::MUST_CLONE`] are copied with [`BlockRule::instantiate`]
/// before they become active, so only the copy ever carries block state.
pub trait BlockRule: Send + Sync {
    /// Kind name, used for `previous_block` and in logs.
    fn kind(&self) -> &'static str;

    fn flags(&self) -> BlockFlags {
        BlockFlags::empty()
    }

    /// Test `line`. With `in_block` the rule is the active block and tests
    /// continuation; otherwise it tests a fresh start.
    fn detect(&mut self, line: &str, in_block: bool) -> bool;

    /// Wrapper text emitted once when the block opens.
    fn open(&mut self) -> String {
        String::new()
    }

    /// Wrapper text emitted once when the block closes.
    fn close(&mut self) -> String {
        String::new()
    }

    /// Output for the line accepted by the last `detect` call. `None` consumes
    /// a continuation line without producing output.
    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String>;

    /// A fresh copy of this template, carrying the last match payload.
    fn instantiate(&self) -> Box<dyn BlockRule>;

    fn close_now(&self) -> bool {
        self.flags().contains(BlockFlags::CLOSE_NOW)
    }

    fn must_clone(&self) -> bool {
        self.flags().contains(BlockFlags::MUST_CLONE)
    }
}

impl std::fmt::Debug for dyn BlockRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRule").field("kind", &self.kind()).field("flags", &self.flags()).finish()
    }
}

// --- Document state -----------------------------------------------------------

/// State scoped to one `render` call and shared by every rule of the
/// document. Reset at the start of each call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    footnotes: Vec<String>,
}

impl DocumentState {
    /// Store a footnote and return its 1-based number.
    pub fn push_footnote(&mut self, text: String) -> usize {
        self.footnotes.push(text);
        self.footnotes.len()
    }

    pub fn footnotes(&self) -> &[String] {
        &self.footnotes
    }
}

// --- Dialects -----------------------------------------------------------------

/// A complete markup mapping: block catalog, inline rules and document hooks.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Block rule templates, in priority order. Called once per renderer.
    fn block_rules(&self) -> Vec<Box<dyn BlockRule>>;

    /// Rule used for non-blank lines no catalog rule accepts.
    fn default_block(&self) -> Option<Box<dyn BlockRule>> {
        None
    }

    fn inline_rules(&self) -> InlineRules;

    /// Whole-document transform before the line scan.
    fn on_start(&self, text: &str) -> String {
        text.to_string()
    }

    /// Whole-document transform after the output is assembled.
    fn on_parse(&self, text: String, _doc: &DocumentState) -> String {
        text
    }
}
