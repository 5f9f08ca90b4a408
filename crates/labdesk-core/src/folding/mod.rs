//! Folding markdown notes.
//!
//! Flat text is parsed into an H1 ⊃ H2 ⊃ H3 section tree and rendered with
//! per-pane collapse state. Rendering is a pure function of the text, the pane
//! id and a [`CollapseState`] snapshot the host owns.

mod collapse;
mod parse;
mod render;

pub use collapse::CollapseState;
pub use parse::{heading_ids, heading_line, parse_sections, section_id, HeadingLevel, Node, Section};
pub use render::{render_html, render_markdown, render_markdown_inline, render_outline, PLACEHOLDER};
