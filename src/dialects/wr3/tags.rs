//! WR3 inline tags.
//!
//! Values that end up in attributes (urls, languages, titles) are taken from
//! the raw parts and attribute-escaped; visible text uses the rendered parts.

use super::{Target, escape_attr};
use crate::{DocumentState, TagContent, TagRule};

/// All WR3 tags, in priority order.
pub fn get(target: Target, footnote_prefix: &str) -> Vec<TagRule> {
    vec![
        tag_strong(target),
        tag_em(target),
        tag_code(target),
        tag_q(target),
        tag_cite(target),
        tag_acronym(target),
        tag_link(target),
        tag_image(target),
        tag_anchor(target),
        tag_footnote(target, footnote_prefix.to_string()),
    ]
}

/// `" name=\"value\""`, or nothing when the value is blank.
fn attr(name: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() { String::new() } else { format!(" {name}=\"{}\"", escape_attr(value)) }
}

/// Attribute-escaped url; script urls are replaced by `#`.
fn safe_url(raw: &str) -> String {
    let url = raw.trim();
    if regex!(r"(?i)^\s*(javascript|vbscript|data):").is_match(url) { "#".to_string() } else { escape_attr(url) }
}

/// `__strong__`
pub fn tag_strong(target: Target) -> TagRule {
    tag! {
        name: "strong",
        open: "__",
        close: "__",
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml => format!("<strong>{}</strong>", c.text(0)),
                Target::DocBook => format!("<emphasis role=\"strong\">{}</emphasis>", c.text(0)),
            }
        }
    }
}

/// `''emphasis''`
pub fn tag_em(target: Target) -> TagRule {
    tag! {
        name: "em",
        open: "''",
        close: "''",
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml => format!("<em>{}</em>", c.text(0)),
                Target::DocBook => format!("<emphasis>{}</emphasis>", c.text(0)),
            }
        }
    }
}

/// `@@code@@`, no markup inside.
pub fn tag_code(target: Target) -> TagRule {
    tag! {
        name: "code",
        open: "@@",
        close: "@@",
        nested: false,
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml | Target::DocBook => format!("<code>{}</code>", c.text(0)),
            }
        }
    }
}

/// `^^quote|lang|cite^^`
pub fn tag_q(target: Target) -> TagRule {
    tag! {
        name: "q",
        open: "^^",
        close: "^^",
        separators: ["|"],
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml => {
                    let cite = if c.raw(2).trim().is_empty() {
                        String::new()
                    } else {
                        format!(" cite=\"{}\"", safe_url(c.raw(2)))
                    };
                    format!("<q{}{}>{}</q>", attr("lang", c.raw(1)), cite, c.text(0))
                }
                Target::DocBook => format!("<quote{}>{}</quote>", attr("xml:lang", c.raw(1)), c.text(0)),
            }
        }
    }
}

/// `{{citation}}`
pub fn tag_cite(target: Target) -> TagRule {
    tag! {
        name: "cite",
        open: "{{",
        close: "}}",
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml => format!("<cite>{}</cite>", c.text(0)),
                Target::DocBook => format!("<citation>{}</citation>", c.text(0)),
            }
        }
    }
}

/// `??acronym|title??`
pub fn tag_acronym(target: Target) -> TagRule {
    tag! {
        name: "acronym",
        open: "??",
        close: "??",
        separators: ["|"],
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml => format!("<acronym{}>{}</acronym>", attr("title", c.raw(1)), c.text(0)),
                Target::DocBook => format!("<acronym>{}</acronym>", c.text(0)),
            }
        }
    }
}

/// `[[label|url|lang|title]]`, or `[[url]]`.
pub fn tag_link(target: Target) -> TagRule {
    tag! {
        name: "link",
        open: "[[",
        close: "]]",
        separators: ["|"],
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            let (label, url) = if c.len() > 1 { (c.text(0), c.raw(1)) } else { (c.text(0), c.raw(0)) };
            match target {
                Target::Xhtml => format!(
                    "<a href=\"{}\"{}{}>{}</a>",
                    safe_url(url),
                    attr("hreflang", c.raw(2)),
                    attr("title", c.raw(3)),
                    label
                ),
                Target::DocBook => format!("<link xlink:href=\"{}\">{}</link>", safe_url(url), label),
            }
        }
    }
}

/// `((src|alt|align|longdesc))`; align is `L` or `R`.
pub fn tag_image(target: Target) -> TagRule {
    tag! {
        name: "image",
        open: "((",
        close: "))",
        separators: ["|"],
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            let src = safe_url(c.raw(0));
            let alt = c.raw(1).trim();
            match target {
                Target::Xhtml => {
                    let style = match c.raw(2).trim() {
                        "l" | "L" => " style=\"float:left;\"",
                        "r" | "R" => " style=\"float:right;\"",
                        _ => "",
                    };
                    format!(
                        "<img src=\"{}\" alt=\"{}\"{}{}/>",
                        src,
                        escape_attr(alt),
                        style,
                        attr("longdesc", c.raw(3))
                    )
                }
                Target::DocBook => {
                    let text = if alt.is_empty() {
                        String::new()
                    } else {
                        format!("<textobject><phrase>{}</phrase></textobject>", c.text(1).trim())
                    };
                    format!(
                        "<inlinemediaobject><imageobject><imagedata fileref=\"{src}\"/></imageobject>{text}</inlinemediaobject>"
                    )
                }
            }
        }
    }
}

/// `~~anchor~~`
pub fn tag_anchor(target: Target) -> TagRule {
    tag! {
        name: "anchor",
        open: "~~",
        close: "~~",
        render: |c: &TagContent, _doc: &mut DocumentState| -> String {
            let id = escape_attr(c.raw(0).trim());
            match target {
                Target::Xhtml => format!("<a id=\"{id}\"></a>"),
                Target::DocBook => format!("<anchor xml:id=\"{id}\"/>"),
            }
        }
    }
}

/// `$$footnote$$`. XHTML footnotes are collected in the document state and
/// listed by `Wr3::on_parse`; DocBook keeps them inline.
pub fn tag_footnote(target: Target, prefix: String) -> TagRule {
    tag! {
        name: "footnote",
        open: "$$",
        close: "$$",
        render: |c: &TagContent, doc: &mut DocumentState| -> String {
            match target {
                Target::Xhtml => {
                    let n = doc.push_footnote(c.text(0).to_string());
                    format!("<sup>[<a href=\"#{prefix}-{n}\" id=\"rev-{prefix}-{n}\">{n}</a>]</sup>")
                }
                Target::DocBook => format!("<footnote><para>{}</para></footnote>", c.text(0)),
            }
        }
    }
}
