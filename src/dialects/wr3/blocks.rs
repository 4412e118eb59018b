//! WR3 block rules.
//!
//! Catalog order matters: the first rule accepting a line wins, and the
//! paragraph rule comes last as the catch-all for ordinary text.

use super::Target;
use crate::{BlockFlags, BlockRule, LineContext};

/// All WR3 block rules, in priority order.
pub fn catalog(target: Target) -> Vec<Box<dyn BlockRule>> {
    vec![
        Box::new(Title::new(target)),
        Box::new(List::new(target)),
        Box::new(Pre::new(target)),
        Box::new(Rule::new(target)),
        Box::new(Blockquote::new(target)),
        Box::new(Definition::new(target)),
        Box::new(Table::new(target)),
        Box::new(Paragraph::new(target)),
    ]
}

fn is_hr(line: &str) -> bool {
    regex!(r"^={4,}\s*$").is_match(line)
}

// --- Title ---------------------------------------------------------------------

/// `!!! level 1`, `!! level 2`, `! level 3`
#[derive(Debug, Clone)]
pub struct Title {
    target: Target,
    level: usize,
    content: String,
}

impl Title {
    pub fn new(target: Target) -> Self {
        Title { target, level: 1, content: String::new() }
    }
}

impl BlockRule for Title {
    fn kind(&self) -> &'static str {
        "title"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::CLOSE_NOW
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        let Some(caps) = regex!(r"^\s*(!{1,3})(.*)").captures(line) else {
            return false;
        };
        self.level = 4 - caps[1].len();
        self.content = caps[2].trim().to_string();
        true
    }

    fn open(&mut self) -> String {
        match self.target {
            Target::Xhtml => format!("<h{}>", self.level),
            Target::DocBook => format!("<bridgehead renderas=\"sect{}\">", self.level),
        }
    }

    fn close(&mut self) -> String {
        match self.target {
            Target::Xhtml => format!("</h{}>", self.level),
            Target::DocBook => "</bridgehead>".to_string(),
        }
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        Some(ctx.inline(&self.content))
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- List ----------------------------------------------------------------------

/// `*` bullets, `#` numbers, `-` bullets; repeat the marker to nest.
///
/// Every nesting level keeps one item open, so a line either opens deeper
/// lists inside the current item or closes items down to its own depth.
#[derive(Debug, Clone)]
pub struct List {
    target: Target,
    marks: String,
    content: String,
    /// Marker of each open level, outermost first.
    levels: Vec<char>,
    fresh: bool,
}

impl List {
    pub fn new(target: Target) -> Self {
        List { target, marks: String::new(), content: String::new(), levels: Vec::new(), fresh: false }
    }

    fn list_open(&self, mark: char) -> &'static str {
        match (self.target, mark) {
            (Target::Xhtml, '#') => "<ol>",
            (Target::Xhtml, _) => "<ul>",
            (Target::DocBook, '#') => "<orderedlist>",
            (Target::DocBook, _) => "<itemizedlist>",
        }
    }

    fn list_close(&self, mark: char) -> &'static str {
        match (self.target, mark) {
            (Target::Xhtml, '#') => "</ol>",
            (Target::Xhtml, _) => "</ul>",
            (Target::DocBook, '#') => "</orderedlist>",
            (Target::DocBook, _) => "</itemizedlist>",
        }
    }

    fn item_open(&self) -> &'static str {
        match self.target {
            Target::Xhtml => "<li>",
            Target::DocBook => "<listitem>",
        }
    }

    fn item_close(&self) -> &'static str {
        match self.target {
            Target::Xhtml => "</li>",
            Target::DocBook => "</listitem>",
        }
    }

    fn item_body(&self, content: String) -> String {
        match self.target {
            Target::Xhtml => content,
            Target::DocBook => format!("<para>{content}</para>"),
        }
    }
}

impl BlockRule for List {
    fn kind(&self) -> &'static str {
        "list"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::MUST_CLONE
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        let Some(caps) = regex!(r"^\s*([*#-]+)(.*)").captures(line) else {
            return false;
        };
        self.marks = caps[1].to_string();
        self.content = caps[2].trim().to_string();
        true
    }

    fn open(&mut self) -> String {
        let first = self.marks.chars().next().unwrap_or('*');
        self.levels = vec![first];
        self.fresh = true;
        self.list_open(first).to_string()
    }

    fn close(&mut self) -> String {
        let mut out = String::new();
        while let Some(mark) = self.levels.pop() {
            out.push_str(self.item_close());
            out.push_str(self.list_close(mark));
        }
        out
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        let marks: Vec<char> = self.marks.chars().collect();
        let depth = marks.len();
        let mut out = String::new();

        if self.fresh {
            self.fresh = false;
            out.push_str(self.item_open());
        } else if depth <= self.levels.len() {
            while self.levels.len() > depth {
                if let Some(mark) = self.levels.pop() {
                    out.push_str(self.item_close());
                    out.push_str(self.list_close(mark));
                }
            }
            out.push_str(self.item_close());
            out.push_str(self.item_open());
        }

        for &mark in &marks[self.levels.len().min(depth)..] {
            out.push_str(self.list_open(mark));
            out.push_str(self.item_open());
            self.levels.push(mark);
        }

        let content = ctx.inline(&self.content);
        out.push_str(&self.item_body(content));
        Some(out)
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- Preformatted --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreMode {
    /// Lines starting with a space; markup is rendered.
    Indented,
    /// Inside `<code>` .. `</code>`; text is only escaped.
    Code,
    /// The `</code>` line was seen.
    Ended,
}

/// Preformatted text: lines starting with a space, or a `<code>` span.
#[derive(Debug, Clone)]
pub struct Pre {
    target: Target,
    mode: PreMode,
    content: String,
    /// The line held only a `<code>` or `</code>` marker.
    marker_only: bool,
}

impl Pre {
    pub fn new(target: Target) -> Self {
        Pre { target, mode: PreMode::Indented, content: String::new(), marker_only: false }
    }

    /// Record the body of a code line, ending the block at `</code>`.
    fn code_line(&mut self, body: &str) {
        match regex!(r"^(.*)</code>\s*$").captures(body) {
            Some(caps) => {
                self.mode = PreMode::Ended;
                self.content = caps[1].to_string();
            }
            None => {
                self.mode = PreMode::Code;
                self.content = body.to_string();
            }
        }
    }
}

impl BlockRule for Pre {
    fn kind(&self) -> &'static str {
        "pre"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::MUST_CLONE
    }

    fn detect(&mut self, line: &str, in_block: bool) -> bool {
        if in_block {
            match self.mode {
                PreMode::Ended => return false,
                PreMode::Code => {
                    self.code_line(line);
                    self.marker_only = line.trim() == "</code>";
                    return true;
                }
                PreMode::Indented => {}
            }
        }

        if let Some(rest) = line.strip_prefix("<code>") {
            self.code_line(rest);
            self.marker_only = rest.trim().is_empty();
            return true;
        }
        match line.strip_prefix(' ') {
            Some(rest) => {
                self.mode = PreMode::Indented;
                self.content = rest.to_string();
                self.marker_only = false;
                true
            }
            None => false,
        }
    }

    fn open(&mut self) -> String {
        match self.target {
            Target::Xhtml => "<pre>".to_string(),
            Target::DocBook => "<programlisting>".to_string(),
        }
    }

    fn close(&mut self) -> String {
        match self.target {
            Target::Xhtml => "</pre>".to_string(),
            Target::DocBook => "</programlisting>".to_string(),
        }
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        if self.marker_only {
            return None;
        }
        match self.mode {
            PreMode::Indented => Some(ctx.inline(&self.content)),
            PreMode::Code | PreMode::Ended => Some(ctx.escape(&self.content)),
        }
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- Horizontal rule -----------------------------------------------------------

/// `====`
#[derive(Debug, Clone)]
pub struct Rule {
    target: Target,
}

impl Rule {
    pub fn new(target: Target) -> Self {
        Rule { target }
    }
}

impl BlockRule for Rule {
    fn kind(&self) -> &'static str {
        "hr"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::CLOSE_NOW
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        is_hr(line)
    }

    fn render_line(&mut self, _ctx: &mut LineContext<'_>) -> Option<String> {
        match self.target {
            Target::Xhtml => Some("<hr />".to_string()),
            // DocBook has no thematic break.
            Target::DocBook => Some(String::new()),
        }
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- Blockquote ----------------------------------------------------------------

/// `> quoted`, `>> nested`
#[derive(Debug, Clone)]
pub struct Blockquote {
    target: Target,
    marks: usize,
    content: String,
    depth: usize,
}

impl Blockquote {
    pub fn new(target: Target) -> Self {
        Blockquote { target, marks: 0, content: String::new(), depth: 0 }
    }
}

impl BlockRule for Blockquote {
    fn kind(&self) -> &'static str {
        "blockquote"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::MUST_CLONE
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        let Some(caps) = regex!(r"^\s*(>+)(.*)").captures(line) else {
            return false;
        };
        self.marks = caps[1].len();
        self.content = caps[2].trim().to_string();
        true
    }

    fn open(&mut self) -> String {
        self.depth = 1;
        "<blockquote>".to_string()
    }

    fn close(&mut self) -> String {
        let out = "</blockquote>".repeat(self.depth);
        self.depth = 0;
        out
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        let mut out = String::new();
        while self.depth < self.marks {
            out.push_str("<blockquote>");
            self.depth += 1;
        }
        while self.depth > self.marks {
            out.push_str("</blockquote>");
            self.depth -= 1;
        }

        let content = ctx.inline(&self.content);
        match self.target {
            Target::Xhtml => out.push_str(&format!("<p>{content}</p>")),
            Target::DocBook => out.push_str(&format!("<para>{content}</para>")),
        }
        Some(out)
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- Definition list -----------------------------------------------------------

/// `;term : definition`
#[derive(Debug, Clone)]
pub struct Definition {
    target: Target,
    term: String,
    definition: String,
}

impl Definition {
    pub fn new(target: Target) -> Self {
        Definition { target, term: String::new(), definition: String::new() }
    }
}

impl BlockRule for Definition {
    fn kind(&self) -> &'static str {
        "dfn"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::MUST_CLONE
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        let Some(caps) = regex!(r"^\s*;(.*) : (.*)").captures(line) else {
            return false;
        };
        self.term = caps[1].trim().to_string();
        self.definition = caps[2].trim().to_string();
        true
    }

    fn open(&mut self) -> String {
        match self.target {
            Target::Xhtml => "<dl>".to_string(),
            Target::DocBook => "<variablelist>".to_string(),
        }
    }

    fn close(&mut self) -> String {
        match self.target {
            Target::Xhtml => "</dl>".to_string(),
            Target::DocBook => "</variablelist>".to_string(),
        }
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        let dt = ctx.inline(&self.term);
        let dd = ctx.inline(&self.definition);
        Some(match self.target {
            Target::Xhtml => format!("<dt>{dt}</dt>\n<dd>{dd}</dd>"),
            Target::DocBook => {
                format!("<varlistentry><term>{dt}</term>\n<listitem><para>{dd}</para></listitem></varlistentry>")
            }
        })
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- Table ---------------------------------------------------------------------

/// `| cell | cell`, one row per line.
#[derive(Debug, Clone)]
pub struct Table {
    target: Target,
    cells: Vec<String>,
}

impl Table {
    pub fn new(target: Target) -> Self {
        Table { target, cells: Vec::new() }
    }
}

/// Split a row on ` | `. A bare `|` stays in its cell, so links and
/// images keep their own separators.
fn split_cells(row: &str) -> Vec<String> {
    let row = row.trim();
    // A trailing `|` closes the row rather than opening an empty cell.
    let row = row.strip_suffix(" |").unwrap_or(row);

    row.split(" | ").map(|c| c.trim().to_string()).collect()
}

impl BlockRule for Table {
    fn kind(&self) -> &'static str {
        "table"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::MUST_CLONE
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        let Some(caps) = regex!(r"^\s*\|(.*)").captures(line) else {
            return false;
        };
        self.cells = split_cells(&caps[1]);
        true
    }

    fn open(&mut self) -> String {
        match self.target {
            Target::Xhtml => "<table border=\"1\">".to_string(),
            Target::DocBook => format!("<informaltable><tgroup cols=\"{}\"><tbody>", self.cells.len()),
        }
    }

    fn close(&mut self) -> String {
        match self.target {
            Target::Xhtml => "</table>".to_string(),
            Target::DocBook => "</tbody></tgroup></informaltable>".to_string(),
        }
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        let (row_open, row_close, cell_open, cell_close) = match self.target {
            Target::Xhtml => ("<tr>", "</tr>", "<td>", "</td>"),
            Target::DocBook => ("<row>", "</row>", "<entry>", "</entry>"),
        };

        let mut out = row_open.to_string();
        for cell in &self.cells {
            out.push_str(cell_open);
            out.push_str(&ctx.inline(cell));
            out.push_str(cell_close);
        }
        out.push_str(row_close);
        Some(out)
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}

// --- Paragraph -----------------------------------------------------------------

/// Any other non-blank text; consecutive lines share one paragraph.
#[derive(Debug, Clone)]
pub struct Paragraph {
    target: Target,
    content: String,
}

impl Paragraph {
    pub fn new(target: Target) -> Self {
        Paragraph { target, content: String::new() }
    }
}

impl BlockRule for Paragraph {
    fn kind(&self) -> &'static str {
        "p"
    }

    fn flags(&self) -> BlockFlags {
        BlockFlags::MUST_CLONE
    }

    fn detect(&mut self, line: &str, _in_block: bool) -> bool {
        let Some(first) = line.chars().next() else {
            return false;
        };
        if "*#-!| \t>;".contains(first) || line.starts_with("<code>") || is_hr(line) {
            return false;
        }
        self.content = line.to_string();
        true
    }

    fn open(&mut self) -> String {
        match self.target {
            Target::Xhtml => "<p>".to_string(),
            Target::DocBook => "<para>".to_string(),
        }
    }

    fn close(&mut self) -> String {
        match self.target {
            Target::Xhtml => "</p>".to_string(),
            Target::DocBook => "</para>".to_string(),
        }
    }

    fn render_line(&mut self, ctx: &mut LineContext<'_>) -> Option<String> {
        Some(ctx.inline(&self.content))
    }

    fn instantiate(&self) -> Box<dyn BlockRule> {
        Box::new(self.clone())
    }
}
