//! Heading tree construction.
//!
//! A single forward pass over the lines. `#`, `##` and `###` lines open
//! sections; every other line is buffered and attached, trimmed, to the
//! deepest open section when the next heading (or the end of input) arrives.
//! H2 and H3 that appear without a parent get implicit "Content" ancestors,
//! so the result is always strictly H1 ⊃ H2 ⊃ H3 below the top level.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn depth(self) -> usize {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub level: HeadingLevel,
    pub text: String,
    pub id: String,
    /// Synthesized to give an orphaned heading a parent; renders no header.
    pub implicit: bool,
    pub children: Vec<Node>,
}

impl Section {
    fn heading(level: HeadingLevel, text: &str) -> Self {
        Self {
            level,
            text: text.to_string(),
            id: section_id(text),
            implicit: false,
            children: Vec::new(),
        }
    }

    fn implicit(level: HeadingLevel, id: &str) -> Self {
        Self {
            level,
            text: "Content".to_string(),
            id: id.to_string(),
            implicit: true,
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Section(Section),
    Content { text: String },
}

impl Node {
    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Node::Section(section) => Some(section),
            Node::Content { .. } => None,
        }
    }
}

/// Identifier used as the collapse-state key for a heading.
///
/// Lower-cases `text`, turns every character outside `[a-z0-9]` into `-` and
/// collapses runs of `-`. Leading and trailing hyphens are kept. Headings
/// with the same text share an id, and therefore share collapse state within
/// a pane.
pub fn section_id(text: &str) -> String {
    let mut id = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && id.ends_with('-') {
            continue;
        }
        id.push(c);
    }
    id
}

/// Recognize a `#`, `##` or `###` heading line. The text after the single
/// separating space must be non-empty; deeper headings are plain content.
pub fn heading_line(line: &str) -> Option<(HeadingLevel, &str)> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    let level = match hashes {
        1 => HeadingLevel::H1,
        2 => HeadingLevel::H2,
        3 => HeadingLevel::H3,
        _ => return None,
    };
    let text = line[hashes..].strip_prefix(' ')?;
    if text.is_empty() {
        return None;
    }
    Some((level, text))
}

/// Ids of every heading in `text` up to and including `max_level`, in
/// source order, independent of nesting.
pub fn heading_ids(text: &str, max_level: HeadingLevel) -> Vec<String> {
    text.split('\n')
        .filter_map(heading_line)
        .filter(|(level, _)| *level <= max_level)
        .map(|(_, heading)| section_id(heading))
        .collect()
}

#[derive(Default)]
struct TreeBuilder<'a> {
    roots: Vec<Node>,
    h1: Option<Section>,
    h2: Option<Section>,
    h3: Option<Section>,
    buffer: Vec<&'a str>,
}

impl<'a> TreeBuilder<'a> {
    fn line(&mut self, line: &'a str) {
        match heading_line(line) {
            Some((HeadingLevel::H1, text)) => self.open_h1(text),
            Some((HeadingLevel::H2, text)) => self.open_h2(text),
            Some((HeadingLevel::H3, text)) => self.open_h3(text),
            None => self.buffer.push(line.strip_suffix('\r').unwrap_or(line)),
        }
    }

    fn open_h1(&mut self, text: &str) {
        self.flush_content();
        self.close_h1();
        self.h1 = Some(Section::heading(HeadingLevel::H1, text));
    }

    fn open_h2(&mut self, text: &str) {
        self.flush_content();
        self.close_h2();
        if self.h1.is_none() {
            self.h1 = Some(Section::implicit(HeadingLevel::H1, "content"));
        }
        self.h2 = Some(Section::heading(HeadingLevel::H2, text));
    }

    fn open_h3(&mut self, text: &str) {
        self.flush_content();
        self.close_h3();
        if self.h2.is_none() && self.h1.is_none() {
            self.h1 = Some(Section::implicit(HeadingLevel::H1, "content-h1"));
            self.h2 = Some(Section::implicit(HeadingLevel::H2, "content-h2"));
        }
        self.h3 = Some(Section::heading(HeadingLevel::H3, text));
    }

    /// Attach a node to the deepest open section, or the top level.
    fn attach(&mut self, node: Node) {
        if let Some(h3) = self.h3.as_mut() {
            h3.children.push(node);
        } else {
            self.attach_above_h3(node);
        }
    }

    fn attach_above_h3(&mut self, node: Node) {
        if let Some(h2) = self.h2.as_mut() {
            h2.children.push(node);
        } else {
            self.attach_above_h2(node);
        }
    }

    fn attach_above_h2(&mut self, node: Node) {
        match self.h1.as_mut() {
            Some(h1) => h1.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn flush_content(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let joined = self.buffer.join("\n");
        self.buffer.clear();
        let text = joined.trim();
        if !text.is_empty() {
            self.attach(Node::Content {
                text: text.to_string(),
            });
        }
    }

    fn close_h3(&mut self) {
        if let Some(h3) = self.h3.take() {
            self.attach_above_h3(Node::Section(h3));
        }
    }

    fn close_h2(&mut self) {
        self.close_h3();
        if let Some(h2) = self.h2.take() {
            self.attach_above_h2(Node::Section(h2));
        }
    }

    fn close_h1(&mut self) {
        self.close_h2();
        if let Some(h1) = self.h1.take() {
            self.roots.push(Node::Section(h1));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_content();
        self.close_h1();
        self.roots
    }
}

/// Build the section tree for `text`. Never fails; heading-free text yields
/// a single content node and blank text yields nothing.
pub fn parse_sections(text: &str) -> Vec<Node> {
    let mut builder = TreeBuilder::default();
    for line in text.split('\n') {
        builder.line(line);
    }
    builder.finish()
}
