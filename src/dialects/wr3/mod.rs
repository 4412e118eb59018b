//! WikiRenderer 3 syntax.
//!
//! One syntax, two output formats. Detection is shared; every rule asks its
//! [`Target`] for the markup to emit.
//!
//! ```text
//! !!! title          * item / # item     <code> .. </code>    ====
//! > quote            ;term : definition  | cell | cell        leading space = pre
//!
//! __strong__  ''em''  @@code@@  ^^q|lang|cite^^  {{cite}}  ??acronym|title??
//! [[label|url|lang|title]]  ((src|alt|align|desc))  ~~anchor~~  $$footnote$$  %%%
//! ```

mod blocks;
mod tags;


use crate::{BlockRule, Dialect, DocumentState, InlineRules, SimpleTag};

/// Output format of the WR3 rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Xhtml,
    DocBook,
}

impl Target {
    fn line_break(self) -> &'static str {
        match self {
            Target::Xhtml => "<br />",
            Target::DocBook => "<sbr/>",
        }
    }
}

/// The WR3 dialect for one output format.
#[derive(Debug, Clone)]
pub struct Wr3 {
    target: Target,
    footnote_prefix: String,
}

impl Wr3 {
    pub fn new(target: Target) -> Self {
        Wr3 { target, footnote_prefix: "footnote".to_string() }
    }

    pub fn xhtml() -> Self {
        Self::new(Target::Xhtml)
    }

    pub fn docbook() -> Self {
        Self::new(Target::DocBook)
    }

    /// Prefix of the footnote anchors (`<prefix>-1`, `rev-<prefix>-1`).
    /// Set it to keep ids unique when several documents share a page.
    pub fn with_footnote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.footnote_prefix = prefix.into();
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }
}

impl Dialect for Wr3 {
    fn name(&self) -> &'static str {
        match self.target {
            Target::Xhtml => "wr3-xhtml",
            Target::DocBook => "wr3-docbook",
        }
    }

    fn block_rules(&self) -> Vec<Box<dyn BlockRule>> {
        blocks::catalog(self.target)
    }

    fn inline_rules(&self) -> InlineRules {
        InlineRules {
            tags: tags::get(self.target, &self.footnote_prefix),
            simple: vec![SimpleTag { marker: "%%%", output: self.target.line_break() }],
            escape_char: Some('\\'),
            escape: escape_text,
        }
    }

    fn on_parse(&self, text: String, doc: &DocumentState) -> String {
        if self.target != Target::Xhtml || doc.footnotes().is_empty() {
            return text;
        }

        let prefix = &self.footnote_prefix;
        let mut out = text;
        out.push_str("\n<div class=\"footnotes\"><h4>Notes</h4>\n");
        for (idx, note) in doc.footnotes().iter().enumerate() {
            let n = idx + 1;
            out.push_str(&format!("<p>[<a href=\"#rev-{prefix}-{n}\" id=\"{prefix}-{n}\">{n}</a>] {note}</p>\n"));
        }
        out.push_str("</div>");
        out
    }
}

/// Escape text content (`&`, `<`, `>`); valid for XHTML and DocBook.
pub(crate) fn escape_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape a value placed in a double-quoted attribute.
pub(crate) fn escape_attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}
