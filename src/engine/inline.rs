//! Inline tag parser.
//!
//! Resolves nested inline tags within a single line. The scan is greedy and
//! leftmost-first: at each position the parser tries, in order,
//!
//! ```text
//! (1) escape char            -> next char is literal
//! (2) close marker of top    -> pop frame, render, splice into parent
//! (3) separator of top       -> start a new content part
//! (4) simple tags            -> fixed replacement
//! (5) open markers           -> push frame (declared order, first wins)
//! (6) any other close marker -> literal, flags the line
//! (7) anything else          -> plain text
//! ```
//!
//! Steps (4) to (6) are skipped inside a tag that forbids nesting.
//!
//! Nesting composes inside-out through an explicit frame stack: a frame
//! collects the rendered content of its tag, and when the tag closes the
//! rendered result is appended to the frame below. Frames still open at
//! end of line are flushed back as literal text and flag the line.

use crate::{ConfigError, DocumentState, InlineRules, SimpleTag, TagContent, TagRule};
use std::collections::HashSet;
use tracing::trace;

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInline {
    pub text: String,
    /// Set when a close marker had no matching open tag, or a tag was left
    /// open at end of line.
    pub error: bool,
}

/// The inline parser of a dialect. Immutable once built: all scan state
/// lives in [`InlineParser::parse_in`].
pub struct InlineParser {
    tags: Vec<TagRule>,
    simple: Vec<SimpleTag>,
    escape_char: Option<char>,
    escape: fn(&str) -> String,
}

impl std::fmt::Debug for InlineParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineParser")
            .field("tags", &self.tags.iter().map(|t| t.name).collect::<Vec<_>>())
            .field("simple", &self.simple)
            .field("escape_char", &self.escape_char)
            .finish()
    }
}

impl InlineParser {
    /// Validate `rules` and build a parser.
    pub fn new(rules: InlineRules) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        for tag in &rules.tags {
            if tag.open.is_empty() {
                return Err(ConfigError::EmptyMarker { tag: tag.name, which: "open" });
            }
            if tag.close.is_empty() {
                return Err(ConfigError::EmptyMarker { tag: tag.name, which: "close" });
            }
            if tag.separators.iter().any(|s| s.is_empty()) {
                return Err(ConfigError::EmptyMarker { tag: tag.name, which: "separator" });
            }
            if !names.insert(tag.name) {
                return Err(ConfigError::DuplicateTag(tag.name));
            }
        }
        if rules.simple.iter().any(|s| s.marker.is_empty()) {
            return Err(ConfigError::EmptyMarker { tag: "<simple>", which: "replacement" });
        }

        Ok(InlineParser { tags: rules.tags, simple: rules.simple, escape_char: rules.escape_char, escape: rules.escape })
    }

    /// Escape plain text for the target format.
    pub fn escape(&self, text: &str) -> String {
        (self.escape)(text)
    }

    /// Parse `line` with a throwaway document state.
    pub fn parse(&self, line: &str) -> ParsedInline {
        let mut doc = DocumentState::default();
        self.parse_in(line, &mut doc)
    }

    /// Parse `line`, letting tag renderers record into `doc`.
    pub fn parse_in(&self, line: &str, doc: &mut DocumentState) -> ParsedInline {
        let escape = self.escape;
        let mut stack: Vec<Frame> = vec![Frame::root()];
        let mut plain = String::new();
        let mut error = false;
        let mut pos = 0;

        while pos < line.len() {
            let rest = &line[pos..];
            let top_tag = stack.last().and_then(|f| f.tag).map(|idx| &self.tags[idx]);

            if let Some(esc) = self.escape_char {
                if rest.starts_with(esc) {
                    pos += esc.len_utf8();
                    match line[pos..].chars().next() {
                        Some(c) => {
                            plain.push(c);
                            pos += c.len_utf8();
                        }
                        None => plain.push(esc),
                    }
                    continue;
                }
            }

            if let Some(tag) = top_tag {
                if rest.starts_with(tag.close) {
                    flush(&mut plain, &mut stack, escape);
                    self.close_top(&mut stack, doc);
                    pos += tag.close.len();
                    continue;
                }
                if let Some(sep) = tag.separators.iter().find(|s| rest.starts_with(**s)) {
                    flush(&mut plain, &mut stack, escape);
                    if let Some(frame) = stack.last_mut() {
                        frame.split(sep, escape);
                    }
                    pos += sep.len();
                    continue;
                }
            }

            if top_tag.is_none_or(|t| t.nested) {
                if let Some(simple) = self.simple.iter().find(|s| rest.starts_with(s.marker)) {
                    flush(&mut plain, &mut stack, escape);
                    if let Some(frame) = stack.last_mut() {
                        frame.push_rendered(simple.output, simple.marker);
                    }
                    pos += simple.marker.len();
                    continue;
                }
                if let Some(idx) = self.tags.iter().position(|t| rest.starts_with(t.open)) {
                    flush(&mut plain, &mut stack, escape);
                    let tag = &self.tags[idx];
                    stack.push(Frame::open(idx, tag.open, escape));
                    pos += tag.open.len();
                    continue;
                }
                if let Some(stray) = self.tags.iter().find(|t| rest.starts_with(t.close)) {
                    trace!(tag = stray.name, offset = pos, "close marker without open tag");
                    error = true;
                    plain.push_str(stray.close);
                    pos += stray.close.len();
                    continue;
                }
            }

            // `pos` is always on a char boundary and short of the end here.
            let Some(c) = rest.chars().next() else { break };
            plain.push(c);
            pos += c.len_utf8();
        }

        flush(&mut plain, &mut stack, escape);
        while stack.len() > 1 {
            let Some(frame) = stack.pop() else { break };
            if let Some(idx) = frame.tag {
                trace!(tag = self.tags[idx].name, "tag left open at end of line");
            }
            error = true;
            if let Some(parent) = stack.last_mut() {
                parent.push_rendered(&frame.fallback, &frame.source);
            }
        }

        let text = stack.pop().map(|root| root.text).unwrap_or_default();
        ParsedInline { text, error }
    }

    /// Pop the top frame, render its tag and splice the result into the
    /// frame below.
    fn close_top(&self, stack: &mut Vec<Frame>, doc: &mut DocumentState) {
        if stack.len() < 2 {
            return;
        }
        let Some(mut frame) = stack.pop() else { return };
        let Some(idx) = frame.tag else { return };
        let tag = &self.tags[idx];

        frame.finish_part();
        let rendered = (tag.render)(&frame.content, doc);
        frame.source.push_str(tag.close);

        if let Some(parent) = stack.last_mut() {
            parent.push_rendered(&rendered, &frame.source);
        }
    }
}

/// Move pending plain text into the top frame.
fn flush(plain: &mut String, stack: &mut [Frame], escape: fn(&str) -> String) {
    if plain.is_empty() {
        return;
    }
    if let Some(frame) = stack.last_mut() {
        frame.push_plain(plain, escape);
    }
    plain.clear();
}

/// One open tag (or the line root) on the parser stack.
#[derive(Debug, Default)]
struct Frame {
    /// Index into `InlineParser::tags`; `None` for the root.
    tag: Option<usize>,
    /// Parts finished by a separator.
    content: TagContent,
    /// Rendered text of the current part.
    text: String,
    /// Raw source of the current part.
    raw: String,
    /// Raw source since the open marker, marker included.
    source: String,
    /// Output used if the tag never closes.
    fallback: String,
}

impl Frame {
    fn root() -> Self {
        Frame::default()
    }

    fn open(tag: usize, marker: &str, escape: fn(&str) -> String) -> Self {
        Frame { tag: Some(tag), source: marker.to_string(), fallback: escape(marker), ..Frame::default() }
    }

    fn push_plain(&mut self, plain: &str, escape: fn(&str) -> String) {
        let escaped = escape(plain);
        self.text.push_str(&escaped);
        self.fallback.push_str(&escaped);
        self.raw.push_str(plain);
        self.source.push_str(plain);
    }

    fn push_rendered(&mut self, rendered: &str, source: &str) {
        self.text.push_str(rendered);
        self.fallback.push_str(rendered);
        self.raw.push_str(source);
        self.source.push_str(source);
    }

    fn split(&mut self, separator: &str, escape: fn(&str) -> String) {
        self.finish_part();
        self.fallback.push_str(&escape(separator));
        self.source.push_str(separator);
    }

    fn finish_part(&mut self) {
        self.content.parts.push(std::mem::take(&mut self.text));
        self.content.raw.push(std::mem::take(&mut self.raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escape_html(s: &str) -> String {
        html_escape::encode_text(s).into_owned()
    }

    fn rules() -> InlineRules {
        InlineRules {
            tags: vec![
                tag! {
                    name: "strong",
                    open: "__",
                    close: "__",
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String {
                        format!("<strong>{}</strong>", c.text(0))
                    }
                },
                tag! {
                    name: "em",
                    open: "''",
                    close: "''",
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String {
                        format!("<em>{}</em>", c.text(0))
                    }
                },
                tag! {
                    name: "code",
                    open: "@@",
                    close: "@@",
                    nested: false,
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String {
                        format!("<code>{}</code>", c.text(0))
                    }
                },
                tag! {
                    name: "link",
                    open: "[[",
                    close: "]]",
                    separators: ["|"],
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String {
                        let href = if c.len() > 1 { c.raw(1) } else { c.raw(0) };
                        format!("<a href=\"{}\">{}</a>", html_escape::encode_double_quoted_attribute(href), c.text(0))
                    }
                },
                tag! {
                    name: "note",
                    open: "$$",
                    close: "$$",
                    render: |c: &TagContent, doc: &mut DocumentState| -> String {
                        let n = doc.push_footnote(c.text(0).to_string());
                        format!("<sup>{n}</sup>")
                    }
                },
            ],
            simple: vec![SimpleTag { marker: "%%%", output: "<br />" }],
            escape_char: Some('\\'),
            escape: escape_html,
        }
    }

    fn parser() -> InlineParser {
        InlineParser::new(rules()).unwrap()
    }

    #[test]
    fn plain_text_is_escaped() {
        let out = parser().parse("a < b & c");
        assert_eq!(out.text, "a &lt; b &amp; c");
        assert!(!out.error);
    }

    #[test]
    fn symmetric_marker_renders_strong() {
        let out = parser().parse("a __b__ c");
        assert_eq!(out.text, "a <strong>b</strong> c");
        assert!(!out.error);
    }

    #[test]
    fn unclosed_open_marker_is_literal_and_flagged() {
        let out = parser().parse("a __b");
        assert_eq!(out.text, "a __b");
        assert!(out.error);
    }

    #[test]
    fn nesting_composes_inside_out() {
        let out = parser().parse("__a ''b'' c__");
        assert_eq!(out.text, "<strong>a <em>b</em> c</strong>");
        assert!(!out.error);
    }

    #[test]
    fn closed_inner_tag_survives_unclosed_outer() {
        let out = parser().parse("__a ''b'' c");
        assert_eq!(out.text, "__a <em>b</em> c");
        assert!(out.error);
    }

    #[test]
    fn stray_close_marker_is_literal_and_flagged() {
        let out = parser().parse("a ]] b");
        assert_eq!(out.text, "a ]] b");
        assert!(out.error);
    }

    #[test]
    fn separators_split_parts_and_keep_raw_source() {
        let out = parser().parse("see [[home|http://x/?a=1&b=2]]");
        assert_eq!(out.text, "see <a href=\"http://x/?a=1&amp;b=2\">home</a>");
        assert!(!out.error);
    }

    #[test]
    fn raw_part_keeps_nested_markup_source() {
        let out = parser().parse("[[__x__]]");
        assert_eq!(out.text, "<a href=\"__x__\"><strong>x</strong></a>");
    }

    #[test]
    fn non_nesting_tag_ignores_other_markers() {
        let out = parser().parse("@@__x__ ]] <y>@@");
        assert_eq!(out.text, "<code>__x__ ]] &lt;y&gt;</code>");
        assert!(!out.error);
    }

    #[test]
    fn escape_char_makes_markers_literal() {
        let out = parser().parse(r"a \]] \_\_b");
        assert_eq!(out.text, "a ]] __b");
        assert!(!out.error);
    }

    #[test]
    fn trailing_escape_char_is_kept() {
        assert_eq!(parser().parse(r"a\").text, r"a\");
    }

    #[test]
    fn simple_tags_are_replaced() {
        let out = parser().parse("one%%%two");
        assert_eq!(out.text, "one<br />two");
    }

    #[test]
    fn unclosed_link_restores_separator() {
        let out = parser().parse("[[a|b");
        assert_eq!(out.text, "[[a|b");
        assert!(out.error);
    }

    #[test]
    fn tag_renderers_write_to_document_state() {
        let parser = parser();
        let mut doc = DocumentState::default();
        assert_eq!(parser.parse_in("x$$one$$", &mut doc).text, "x<sup>1</sup>");
        assert_eq!(parser.parse_in("$$two$$", &mut doc).text, "<sup>2</sup>");
        assert_eq!(doc.footnotes(), ["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn declared_order_wins_over_longest_marker() {
        let rules = InlineRules {
            tags: vec![
                tag! {
                    name: "single",
                    open: "*",
                    close: "*",
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String { format!("<i>{}</i>", c.text(0)) }
                },
                tag! {
                    name: "double",
                    open: "**",
                    close: "**",
                    render: |c: &TagContent, _doc: &mut DocumentState| -> String { format!("<b>{}</b>", c.text(0)) }
                },
            ],
            ..InlineRules::plain()
        };
        let parser = InlineParser::new(rules).unwrap();
        assert_eq!(parser.parse("**x**").text, "<i></i>x<i></i>");
    }

    #[test]
    fn empty_marker_is_rejected() {
        let mut rules = rules();
        rules.tags.push(tag! {
            name: "broken",
            open: "",
            close: "!",
            render: |_c: &TagContent, _doc: &mut DocumentState| -> String { String::new() }
        });
        let err = InlineParser::new(rules).unwrap_err();
        assert_eq!(err, ConfigError::EmptyMarker { tag: "broken", which: "open" });
    }

    #[test]
    fn duplicate_tag_names_are_rejected() {
        let mut rules = rules();
        rules.tags.push(tag! {
            name: "strong",
            open: "**",
            close: "**",
            render: |c: &TagContent, _doc: &mut DocumentState| -> String { c.text(0).to_string() }
        });
        assert_eq!(InlineParser::new(rules).unwrap_err(), ConfigError::DuplicateTag("strong"));
    }
}
