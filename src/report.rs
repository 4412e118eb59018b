use wikirender::RenderReport;

mod ansi {
    const RESET: &str = "\x1b[0m";
    const DIM: &str = "\x1b[2m";
    const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    const GRAY: &str = "\x1b[90m";

    /// Wraps text in escape codes, or passes it through when color is off.
    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, code: &str) -> String {
            let s = s.as_ref();
            if self.enabled { format!("{code}{s}{RESET}") } else { s.to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            self.paint(s, BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.paint(s, DIM)
        }

        pub fn rule(&self, title: &str) -> String {
            self.paint(format!("━━━ {title} ━━━"), GRAY)
        }
    }
}

/// Lines with unresolved inline markup.
pub fn print_errors(report: &RenderReport, color: bool) {
    let palette = ansi::Palette::new(color);
    eprintln!("\n{}", palette.rule("Unresolved markup"));

    if report.errors.is_empty() {
        eprintln!("  {}", palette.paint("✓ none", ansi::GREEN));
        return;
    }

    let width = report.errors.keys().last().map(|n| n.to_string().len()).unwrap_or(1);
    for (line, source) in &report.errors {
        eprintln!(
            "  {} {} {}",
            palette.paint(format!("{line:>width$}"), ansi::YELLOW),
            palette.dim("│"),
            palette.paint(preview(source), ansi::RED),
        );
    }
    eprintln!("  {}", palette.dim(format!("{} line(s)", report.errors.len())));
}

pub fn print_metrics(dialect: &str, report: &RenderReport, color: bool) {
    let palette = ansi::Palette::new(color);
    let m = &report.metrics;

    eprintln!("\n{}", palette.rule("Render"));
    eprintln!("  {} {}", palette.dim("dialect:"), palette.bold(palette.paint(dialect, ansi::CYAN)));
    eprintln!(
        "  {} {}  {} {}  {} {}",
        palette.dim("lines:"),
        palette.paint(m.lines.to_string(), ansi::BLUE),
        palette.dim("blank:"),
        palette.paint(m.blank_lines.to_string(), ansi::BLUE),
        palette.dim("fallback:"),
        palette.paint(m.fallback_lines.to_string(), ansi::BLUE),
    );
    eprintln!(
        "  {} {}  {} {}  {} {}",
        palette.dim("blocks:"),
        palette.paint(m.blocks_opened.to_string(), ansi::YELLOW),
        palette.dim("single-line:"),
        palette.paint(m.immediate_blocks.to_string(), ansi::YELLOW),
        palette.dim("last closed:"),
        palette.paint(report.previous_block.unwrap_or("-"), ansi::CYAN),
    );

    let errors = if m.error_lines > 0 {
        palette.paint(format!("✗ {}", m.error_lines), ansi::RED)
    } else {
        palette.paint("✓ 0", ansi::GREEN)
    };
    eprintln!("  {} {}", palette.dim("errors:"), errors);

    eprintln!("\n{}", palette.rule("Timing"));
    eprintln!("  Total: {}", palette.paint(format!("{:?}", m.total), ansi::GREEN));
    eprintln!();
}

fn preview(line: &str) -> String {
    let mut out: String = line.chars().take(80).collect();
    if line.chars().count() > 80 {
        out.push('…');
    }
    out
}
