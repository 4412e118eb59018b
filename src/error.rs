//! Configuration errors.
//!
//! Only renderer construction can fail. Inline markup mismatches are not
//! errors in this sense: they are recorded per line and exposed through
//! [`Renderer::errors`](crate::Renderer::errors) after a render.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown dialect `{0}`")]
    UnknownDialect(String),

    #[error("tag `{tag}` has an empty {which} marker")]
    EmptyMarker { tag: &'static str, which: &'static str },

    #[error("tag `{0}` is declared more than once")]
    DuplicateTag(&'static str),

    #[error("block rule `{0}` is declared more than once")]
    DuplicateBlock(&'static str),
}
