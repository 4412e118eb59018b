//! Block state machine.
//!
//! The renderer walks the document one line at a time with at most one block
//! open. Per line, in this order:
//!
//! ```text
//! InBlock: active.detect(line, true)  ok   -> append active.render_line()
//!          otherwise                        -> append active.close() to the
//!                                              previous slot, go Idle and
//!                                              handle the line below
//! Idle:    first catalog rule detecting it  -> closeNow: open+render+close
//!                                              else: (instantiate) + open+render
//!          blank                            -> empty slot
//!          default block configured         -> open+render+close
//!          otherwise                        -> bare inline rendering
//! ```
//!
//! A block still open after the last line is closed onto the last slot.
//!
//! All per-document state lives in `RenderPass`, built at the start of a
//! render call and dropped at its end. The renderer itself only keeps the
//! results callers can inspect afterwards (error lines, previous block).

use super::inline::InlineParser;
use super::metrics::{RenderMetrics, RenderResult};
use crate::{BlockRule, ConfigError, Dialect, DocumentState};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, trace};

/// What a block rule sees while rendering one line.
///
/// Inline rendering through [`LineContext::inline`] records mismatched
/// tags against the current line.
pub struct LineContext<'r> {
    inline: &'r InlineParser,
    doc: &'r mut DocumentState,
    previous: Option<&'static str>,
    error: bool,
}

impl<'r> LineContext<'r> {
    fn new(inline: &'r InlineParser, doc: &'r mut DocumentState, previous: Option<&'static str>) -> Self {
        LineContext { inline, doc, previous, error: false }
    }

    /// Render inline markup in `text`.
    pub fn inline(&mut self, text: &str) -> String {
        let parsed = self.inline.parse_in(text, self.doc);
        self.error |= parsed.error;
        parsed.text
    }

    /// Escape `text` without interpreting any markup.
    pub fn escape(&self, text: &str) -> String {
        self.inline.escape(text)
    }

    /// Kind of the most recently closed block.
    pub fn previous_block(&self) -> Option<&'static str> {
        self.previous
    }

    pub fn document(&mut self) -> &mut DocumentState {
        self.doc
    }

    pub fn has_error(&self) -> bool {
        self.error
    }
}

/// Converts a whole document with the rules of one dialect.
///
/// A renderer owns its block rule templates, so it handles one document at a
/// time (`render` takes `&mut self`). Build one renderer per thread to render
/// concurrently.
pub struct Renderer {
    dialect: Box<dyn Dialect>,
    blocks: Vec<Box<dyn BlockRule>>,
    default_block: Option<Box<dyn BlockRule>>,
    inline: InlineParser,
    errors: BTreeMap<usize, String>,
    previous: Option<&'static str>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("dialect", &self.dialect.name())
            .field("blocks", &self.blocks)
            .field("default_block", &self.default_block)
            .field("inline", &self.inline)
            .finish()
    }
}

impl Renderer {
    /// Build a renderer for `dialect`.
    pub fn new<D: Dialect + 'static>(dialect: D) -> Result<Self, ConfigError> {
        Self::with_dialect(Box::new(dialect))
    }

    /// Build a renderer for one of the built-in dialects (see
    /// [`dialects::names`](crate::dialects::names)).
    pub fn for_dialect(name: &str) -> Result<Self, ConfigError> {
        let dialect = crate::dialects::by_name(name).ok_or_else(|| ConfigError::UnknownDialect(name.to_string()))?;
        Self::with_dialect(dialect)
    }

    pub fn with_dialect(dialect: Box<dyn Dialect>) -> Result<Self, ConfigError> {
        let blocks = dialect.block_rules();
        let mut kinds = HashSet::new();
        for block in &blocks {
            if !kinds.insert(block.kind()) {
                return Err(ConfigError::DuplicateBlock(block.kind()));
            }
        }
        let default_block = dialect.default_block();
        let inline = InlineParser::new(dialect.inline_rules())?;

        debug!(
            dialect = dialect.name(),
            blocks = blocks.len(),
            default_block = default_block.as_ref().map(|b| b.kind()),
            "renderer ready"
        );

        Ok(Renderer { dialect, blocks, default_block, inline, errors: BTreeMap::new(), previous: None })
    }

    /// Convert `text`.
    pub fn render(&mut self, text: &str) -> String {
        self.render_with_metrics(text).text
    }

    /// Convert `text` and report counters for the run.
    pub fn render_with_metrics(&mut self, text: &str) -> RenderResult {
        let start = Instant::now();
        let text = self.dialect.on_start(text);

        let mut pass = RenderPass {
            blocks: &mut self.blocks,
            default_block: self.default_block.as_mut(),
            inline: &self.inline,
            doc: DocumentState::default(),
            slots: Vec::new(),
            errors: BTreeMap::new(),
            active: None,
            previous: None,
            metrics: RenderMetrics::default(),
        };
        for (num, line) in regex!(r"\r\n|\r|\n").split(&text).enumerate() {
            pass.line(num + 1, line);
        }
        pass.finish();

        let RenderPass { slots, errors, previous, doc, mut metrics, .. } = pass;
        self.errors = errors;
        self.previous = previous;

        let text = self.dialect.on_parse(slots.join("\n"), &doc);
        metrics.error_lines = self.errors.len();
        metrics.total = start.elapsed();

        debug!(
            dialect = self.dialect.name(),
            lines = metrics.lines,
            errors = metrics.error_lines,
            elapsed = ?metrics.total,
            "document rendered"
        );

        RenderResult { text, metrics }
    }

    /// Lines of the last render whose inline markup did not resolve, keyed
    /// by 1-based line number.
    pub fn errors(&self) -> &BTreeMap<usize, String> {
        &self.errors
    }

    /// Kind of the block most recently closed by the last render.
    pub fn previous_block(&self) -> Option<&'static str> {
        self.previous
    }

    pub fn dialect_name(&self) -> &'static str {
        self.dialect.name()
    }

    pub fn inline_parser(&self) -> &InlineParser {
        &self.inline
    }
}

/// The block currently consuming lines.
enum Active {
    /// A stateless rule used in place, by catalog index.
    Template(usize),
    /// A private instance of a stateful rule.
    Owned(Box<dyn BlockRule>),
}

/// Scratch state of one render call.
struct RenderPass<'r> {
    blocks: &'r mut [Box<dyn BlockRule>],
    default_block: Option<&'r mut Box<dyn BlockRule>>,
    inline: &'r InlineParser,
    doc: DocumentState,
    /// One output fragment per emitted line.
    slots: Vec<String>,
    errors: BTreeMap<usize, String>,
    active: Option<Active>,
    previous: Option<&'static str>,
    metrics: RenderMetrics,
}

impl RenderPass<'_> {
    fn line(&mut self, num: usize, line: &str) {
        self.metrics.lines += 1;

        let error = match self.active.as_mut() {
            Some(active) => {
                let rule: &mut dyn BlockRule = match active {
                    Active::Template(idx) => self.blocks[*idx].as_mut(),
                    Active::Owned(rule) => rule.as_mut(),
                };
                if rule.detect(line, true) {
                    trace!(line = num, block = rule.kind(), "continue");
                    let mut ctx = LineContext::new(self.inline, &mut self.doc, self.previous);
                    if let Some(out) = rule.render_line(&mut ctx) {
                        self.slots.push(out);
                    }
                    ctx.error
                } else {
                    self.close_active(num);
                    self.start(num, line)
                }
            }
            None => self.start(num, line),
        };

        if error {
            debug!(line = num, source = line, "unresolved inline markup");
            self.errors.insert(num, line.to_string());
        }
    }

    /// Handle a line with no block open. Returns the inline error flag.
    fn start(&mut self, num: usize, line: &str) -> bool {
        if let Some(idx) = self.blocks.iter_mut().position(|b| b.detect(line, false)) {
            return self.open(num, idx);
        }

        if line.trim().is_empty() {
            trace!(line = num, "blank");
            self.metrics.blank_lines += 1;
            self.slots.push(String::new());
            return false;
        }

        self.metrics.fallback_lines += 1;
        let mut ctx = LineContext::new(self.inline, &mut self.doc, self.previous);
        let out = match self.default_block.as_deref_mut() {
            Some(default) => {
                // The default block always renders; detect only records the payload.
                default.detect(line, false);
                trace!(line = num, block = default.kind(), "default block");
                let mut out = default.open();
                out.push_str(&default.render_line(&mut ctx).unwrap_or_default());
                out.push_str(&default.close());
                out
            }
            None => {
                trace!(line = num, "bare inline");
                ctx.inline(line)
            }
        };
        self.slots.push(out);
        ctx.error
    }

    /// Open catalog rule `idx`, which just accepted line `num`.
    fn open(&mut self, num: usize, idx: usize) -> bool {
        let mut ctx = LineContext::new(self.inline, &mut self.doc, self.previous);

        if self.blocks[idx].close_now() {
            let rule = self.blocks[idx].as_mut();
            trace!(line = num, block = rule.kind(), "single-line block");
            let mut out = rule.open();
            out.push_str(&rule.render_line(&mut ctx).unwrap_or_default());
            out.push_str(&rule.close());
            let error = ctx.error;
            self.slots.push(out);
            self.previous = Some(rule.kind());
            self.metrics.immediate_blocks += 1;
            return error;
        }

        let mut active = if self.blocks[idx].must_clone() {
            Active::Owned(self.blocks[idx].instantiate())
        } else {
            Active::Template(idx)
        };
        let rule: &mut dyn BlockRule = match &mut active {
            Active::Template(idx) => self.blocks[*idx].as_mut(),
            Active::Owned(rule) => rule.as_mut(),
        };
        debug!(line = num, block = rule.kind(), "open block");
        let mut out = rule.open();
        out.push_str(&rule.render_line(&mut ctx).unwrap_or_default());
        let error = ctx.error;

        self.slots.push(out);
        self.active = Some(active);
        self.metrics.blocks_opened += 1;
        error
    }

    /// Close the active block onto the last output slot.
    fn close_active(&mut self, num: usize) {
        let Some(active) = self.active.take() else { return };
        let (kind, close) = match active {
            Active::Template(idx) => {
                let rule = &mut self.blocks[idx];
                (rule.kind(), rule.close())
            }
            Active::Owned(mut rule) => (rule.kind(), rule.close()),
        };
        debug!(line = num, block = kind, "close block");

        match self.slots.last_mut() {
            Some(last) => last.push_str(&close),
            None => self.slots.push(close),
        }
        self.previous = Some(kind);
    }

    /// Close a block left open by the last line.
    fn finish(&mut self) {
        if self.active.is_some() {
            debug!("closing block at end of input");
            self.close_active(self.metrics.lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockFlags, InlineRules, TagContent};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lines indented by two spaces, quoted as one block.
    #[derive(Clone, Default)]
    struct Indented {
        content: String,
    }

    impl BlockRule for Indented {
        fn kind(&self) -> &'static str {
            "indented"
        }

        fn detect(&mut self, line: &str, _in_block: bool) -> bool {
            match line.strip_prefix("  ") {
                Some(rest) => {
                    self.content = rest.to_string();
                    true
                }
                None => false,
            }
        }

        fn open(&mut self) -> String {
            "<blockquote>".to_string()
        }

        fn close(&mut self) -> String {
            "</blockquote>".to_string()
        }

        fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
            Some(ctx.inline(&self.content))
        }

        fn instantiate(&self) -> Box<dyn BlockRule> {
            Box::new(self.clone())
        }
    }

    /// `= title`, one line per heading.
    #[derive(Clone, Default)]
    struct Heading {
        content: String,
    }

    impl BlockRule for Heading {
        fn kind(&self) -> &'static str {
            "heading"
        }

        fn flags(&self) -> BlockFlags {
            BlockFlags::CLOSE_NOW
        }

        fn detect(&mut self, line: &str, _in_block: bool) -> bool {
            match line.strip_prefix("= ") {
                Some(rest) => {
                    self.content = rest.to_string();
                    true
                }
                None => false,
            }
        }

        fn open(&mut self) -> String {
            "<h1>".to_string()
        }

        fn close(&mut self) -> String {
            "</h1>".to_string()
        }

        fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
            Some(ctx.inline(&self.content))
        }

        fn instantiate(&self) -> Box<dyn BlockRule> {
            Box::new(self.clone())
        }
    }

    /// `# item` lines numbered from 1 within each block.
    #[derive(Clone, Default)]
    struct Numbered {
        content: String,
        count: usize,
    }

    impl BlockRule for Numbered {
        fn kind(&self) -> &'static str {
            "numbered"
        }

        fn flags(&self) -> BlockFlags {
            BlockFlags::MUST_CLONE
        }

        fn detect(&mut self, line: &str, _in_block: bool) -> bool {
            match line.strip_prefix("# ") {
                Some(rest) => {
                    self.content = rest.to_string();
                    true
                }
                None => false,
            }
        }

        fn open(&mut self) -> String {
            "<ol>".to_string()
        }

        fn close(&mut self) -> String {
            "</ol>".to_string()
        }

        fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
            self.count += 1;
            Some(format!("{}:{}", self.count, ctx.inline(&self.content)))
        }

        fn instantiate(&self) -> Box<dyn BlockRule> {
            Box::new(self.clone())
        }
    }

    /// Wraps any non-blank line in its own paragraph.
    #[derive(Clone, Default)]
    struct Para {
        content: String,
    }

    impl BlockRule for Para {
        fn kind(&self) -> &'static str {
            "p"
        }

        fn detect(&mut self, line: &str, _in_block: bool) -> bool {
            self.content = line.to_string();
            !line.trim().is_empty()
        }

        fn open(&mut self) -> String {
            "<p>".to_string()
        }

        fn close(&mut self) -> String {
            "</p>".to_string()
        }

        fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
            Some(ctx.inline(&self.content))
        }

        fn instantiate(&self) -> Box<dyn BlockRule> {
            Box::new(self.clone())
        }
    }

    /// Brackets its line; only accepts lines starting with `!`.
    #[derive(Clone, Default)]
    struct Picky {
        content: String,
    }

    impl BlockRule for Picky {
        fn kind(&self) -> &'static str {
            "picky"
        }

        fn detect(&mut self, line: &str, _in_block: bool) -> bool {
            self.content = line.to_string();
            line.starts_with('!')
        }

        fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
            Some(format!("[{}]", ctx.inline(&self.content)))
        }

        fn instantiate(&self) -> Box<dyn BlockRule> {
            Box::new(self.clone())
        }
    }

    #[derive(Default)]
    struct TestDialect {
        blocks: Vec<&'static str>,
        default_para: bool,
        default_picky: bool,
        hooks: bool,
        starts: Arc<AtomicUsize>,
        parses: Arc<AtomicUsize>,
    }

    impl TestDialect {
        fn with_blocks(blocks: &[&'static str]) -> Self {
            TestDialect { blocks: blocks.to_vec(), ..TestDialect::default() }
        }
    }

    impl Dialect for TestDialect {
        fn name(&self) -> &'static str {
            "test"
        }

        fn block_rules(&self) -> Vec<Box<dyn BlockRule>> {
            self.blocks
                .iter()
                .map(|kind| -> Box<dyn BlockRule> {
                    match *kind {
                        "indented" => Box::new(Indented::default()),
                        "heading" => Box::new(Heading::default()),
                        "numbered" => Box::new(Numbered::default()),
                        _ => Box::new(Para::default()),
                    }
                })
                .collect()
        }

        fn default_block(&self) -> Option<Box<dyn BlockRule>> {
            if self.default_picky {
                Some(Box::new(Picky::default()))
            } else if self.default_para {
                Some(Box::new(Para::default()))
            } else {
                None
            }
        }

        fn inline_rules(&self) -> InlineRules {
            InlineRules {
                tags: vec![tag! {
                    name: "strong",
                    open: "__",
                    close: "__",
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String {
                        format!("<strong>{}</strong>", c.text(0))
                    }
                }],
                ..InlineRules::plain()
            }
        }

        fn on_start(&self, text: &str) -> String {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.hooks { text.replace('\t', "  ") } else { text.to_string() }
        }

        fn on_parse(&self, text: String, _doc: &DocumentState) -> String {
            self.parses.fetch_add(1, Ordering::SeqCst);
            if self.hooks { format!("<body>{text}</body>") } else { text }
        }
    }

    fn renderer(blocks: &[&'static str]) -> Renderer {
        Renderer::new(TestDialect::with_blocks(blocks)).unwrap()
    }

    #[test]
    fn unmatched_lines_pass_through_inline_parser() {
        let mut r = renderer(&[]);
        assert_eq!(r.render("a __b__\n\nc"), "a <strong>b</strong>\n\nc");
        assert!(r.errors().is_empty());
    }

    #[test]
    fn all_line_endings_split_lines() {
        let mut r = renderer(&[]);
        assert_eq!(r.render("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn empty_document_renders_empty() {
        let mut r = renderer(&["indented"]);
        assert_eq!(r.render(""), "");
    }

    #[test]
    fn blank_runs_produce_one_empty_slot_each() {
        let mut r = renderer(&["indented"]);
        assert_eq!(r.render("  a\n\n\n  b"), "<blockquote>a</blockquote>\n\n\n<blockquote>b</blockquote>");
        assert_eq!(r.render("\n\n"), "\n\n");
    }

    #[test]
    fn continuation_run_shares_one_wrapper() {
        let mut r = renderer(&["indented"]);
        let result = r.render_with_metrics("  a\n  b\n  c\nd");
        assert_eq!(result.text, "<blockquote>a\nb\nc</blockquote>\nd");
        assert_eq!(result.metrics.blocks_opened, 1);
        assert_eq!(result.metrics.fallback_lines, 1);
        assert_eq!(result.metrics.lines, 4);
    }

    #[test]
    fn close_now_blocks_never_stay_open() {
        let mut r = renderer(&["heading", "indented"]);
        let result = r.render_with_metrics("= a\n= b");
        assert_eq!(result.text, "<h1>a</h1>\n<h1>b</h1>");
        assert_eq!(result.metrics.immediate_blocks, 2);
        assert_eq!(result.metrics.blocks_opened, 0);
        assert_eq!(r.previous_block(), Some("heading"));
    }

    #[test]
    fn open_block_is_closed_before_the_next_one() {
        let mut r = renderer(&["heading", "indented"]);
        assert_eq!(r.render("  a\n= h\n  b"), "<blockquote>a</blockquote>\n<h1>h</h1>\n<blockquote>b</blockquote>");
    }

    #[test]
    fn end_of_input_closes_active_block_once() {
        let mut r = renderer(&["indented"]);
        let out = r.render("x\n  a\n  b");
        assert_eq!(out, "x\n<blockquote>a\nb</blockquote>");
        assert_eq!(out.matches("</blockquote>").count(), 1);
        assert_eq!(r.previous_block(), Some("indented"));
    }

    #[test]
    fn default_block_wraps_each_line() {
        let mut r = Renderer::new(TestDialect { default_para: true, ..TestDialect::default() }).unwrap();
        assert_eq!(r.render("foo\n\nbar"), "<p>foo</p>\n\n<p>bar</p>");
    }

    #[test]
    fn default_block_follows_a_closed_block() {
        let dialect = TestDialect { default_para: true, ..TestDialect::with_blocks(&["indented"]) };
        let mut r = Renderer::new(dialect).unwrap();
        let result = r.render_with_metrics("  a\nb");
        assert_eq!(result.text, "<blockquote>a</blockquote>\n<p>b</p>");
        assert_eq!(result.metrics.fallback_lines, 1);
        assert_eq!(r.previous_block(), Some("indented"));
    }

    #[test]
    fn default_block_renders_even_when_detect_rejects() {
        let mut r = Renderer::new(TestDialect { default_picky: true, ..TestDialect::default() }).unwrap();
        assert_eq!(r.render("x\n!y\n\nz"), "[x]\n[!y]\n\n[z]");
    }

    #[test]
    fn stateful_rules_are_instantiated_per_block() {
        let mut r = renderer(&["numbered"]);
        let src = "# a\n# b\nx\n# c";
        assert_eq!(r.render(src), "<ol>1:a\n2:b</ol>\nx\n<ol>1:c</ol>");
        // The template never saw a render call, so a second run starts over.
        assert_eq!(r.render(src), "<ol>1:a\n2:b</ol>\nx\n<ol>1:c</ol>");
    }

    #[test]
    fn inline_errors_are_recorded_by_line_number() {
        let mut r = renderer(&["indented"]);
        let out = r.render("ok\n__bad\n  quoted __too");
        assert_eq!(out, "ok\n__bad\n<blockquote>quoted __too</blockquote>");
        let expected: BTreeMap<usize, String> =
            [(2, "__bad".to_string()), (3, "  quoted __too".to_string())].into_iter().collect();
        assert_eq!(r.errors(), &expected);

        r.render("clean");
        assert!(r.errors().is_empty());
    }

    #[test]
    fn hooks_run_once_per_render() {
        let dialect = TestDialect { hooks: true, ..TestDialect::with_blocks(&["indented"]) };
        let starts = Arc::clone(&dialect.starts);
        let parses = Arc::clone(&dialect.parses);
        let mut r = Renderer::new(dialect).unwrap();

        assert_eq!(r.render("\ta\nb"), "<body><blockquote>a</blockquote>\nb</body>");
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(parses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_block_kinds_are_rejected() {
        let err = Renderer::new(TestDialect::with_blocks(&["indented", "indented"])).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateBlock("indented"));
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let err = Renderer::for_dialect("nope").unwrap_err();
        assert_eq!(err, ConfigError::UnknownDialect("nope".to_string()));
    }
}
