//! Rendering engine.
//!
//! The engine is generic: it knows nothing about any markup grammar. A
//! [`Dialect`](crate::Dialect) supplies the block rules, inline tags and
//! document hooks; the engine dispatches lines and resolves tag nesting.
//!
//! ## How the parts work together
//!
//! ```text
//! text ── Dialect::on_start
//!          │
//!          v
//!   split lines (\r\n | \r | \n)
//!          │
//!          v  one line at a time                (renderer.rs)
//!   active block?  ── yes ─ detect(line, true) ── ok ─▶ render_line
//!          │                       │
//!          no                     fail: close active block
//!          │                       │
//!          └────────┬──────────────┘
//!                   v
//!   catalog scan (declared order, first match wins)
//!          │ closeNow ─▶ open + render + close, stay idle
//!          │ persistent ─▶ instantiate if MUST_CLONE, become active
//!          │ no match ─▶ blank slot / default block / bare inline
//!          v
//!   LineContext::inline ─▶ InlineParser::parse_in     (inline.rs)
//!          │
//!          v
//!   slots.join("\n") ── Dialect::on_parse ──▶ output
//! ```
//!
//! ## Responsibilities by module
//!
//! - `inline.rs`: the tag-nesting resolver, one line at a time, with an
//!   explicit frame stack.
//! - `renderer.rs`: the block state machine, the per-render scratch state and
//!   the [`LineContext`] handed to block rules.
//! - `metrics.rs`: counters and timing for one render call.
//!
//! ## Debugging
//!
//! The engine logs through `tracing`. Run the CLI with
//! `RUST_LOG=wikirender=trace` to see per-line dispatch decisions.

#[path = "engine/inline.rs"]
mod inline;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/renderer.rs"]
mod renderer;

pub use inline::{InlineParser, ParsedInline};
pub use metrics::{RenderMetrics, RenderResult};
pub use renderer::{LineContext, Renderer};
