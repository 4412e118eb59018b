//! Built-in dialects.
//!
//! Each dialect is a catalog of block rules and inline tags plus the two
//! document hooks. The engine only sees them through [`Dialect`].

pub mod wr3;

pub use wr3::{Target, Wr3};

use crate::Dialect;

/// Dialect used when none is named.
pub const DEFAULT: &str = "wr3-xhtml";

/// Names accepted by [`by_name`].
pub fn names() -> &'static [&'static str] {
    &["wr3-xhtml", "wr3-docbook"]
}

/// Look up a built-in dialect.
pub fn by_name(name: &str) -> Option<Box<dyn Dialect>> {
    match name {
        "wr3-xhtml" | "wr3" => Some(Box::new(Wr3::xhtml())),
        "wr3-docbook" | "docbook" => Some(Box::new(Wr3::docbook())),
        _ => None,
    }
}
