use pulldown_cmark::{html::push_html, Event, Options, Parser};

use super::collapse::CollapseState;
use super::parse::{parse_sections, Node, Section};

pub const PLACEHOLDER: &str = "No content yet...";

const COLLAPSED: &str = "▶";
const EXPANDED: &str = "▼";

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// Render a content block. Raw HTML in the source is emitted as text.
pub fn render_markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, markdown_options()).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html = String::with_capacity(text.len() * 3 / 2);
    push_html(&mut html, parser);
    html
}

/// Render heading text, stripping the paragraph wrapper.
pub fn render_markdown_inline(text: &str) -> String {
    let html = render_markdown(text);
    let trimmed = html.trim();
    trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `text` as nested collapsible HTML for `pane`.
pub fn render_html(text: &str, pane: &str, state: &CollapseState) -> String {
    let tree = parse_sections(text);
    let pane_attr = escape_attr(pane);
    if tree.is_empty() {
        return format!(
            "<div class=\"folding-markdown\" data-pane=\"{pane_attr}\"><p class=\"folding-placeholder\">{PLACEHOLDER}</p></div>\n"
        );
    }

    let mut out = format!("<div class=\"folding-markdown\" data-pane=\"{pane_attr}\">\n");
    for node in &tree {
        html_node(&mut out, node, pane, state);
    }
    out.push_str("</div>\n");
    out
}

fn html_node(out: &mut String, node: &Node, pane: &str, state: &CollapseState) {
    match node {
        Node::Content { text } => {
            out.push_str("<div class=\"fold-content\">");
            out.push_str(&render_markdown(text));
            out.push_str("</div>\n");
        }
        Node::Section(section) if section.implicit => {
            for child in &section.children {
                html_node(out, child, pane, state);
            }
        }
        Node::Section(section) => html_section(out, section, pane, state),
    }
}

fn html_section(out: &mut String, section: &Section, pane: &str, state: &CollapseState) {
    let collapsed = state.is_collapsed(pane, &section.id);
    let tag = section.level.tag();

    // Ids are limited to [a-z0-9-] by `section_id`, so they need no escaping.
    out.push_str(&format!(
        "<section class=\"fold-section fold-{tag}\" data-section-id=\"{}\">\n",
        section.id
    ));
    out.push_str(&format!(
        "<button type=\"button\" class=\"fold-toggle\" aria-expanded=\"{}\">",
        !collapsed
    ));
    if section.has_children() {
        let indicator = if collapsed { COLLAPSED } else { EXPANDED };
        out.push_str(&format!("<span class=\"fold-indicator\">{indicator}</span>"));
    }
    out.push_str(&format!(
        "<{tag}>{}</{tag}></button>\n",
        render_markdown_inline(&section.text)
    ));

    // The body stays in the document when collapsed so the height can animate.
    if collapsed {
        out.push_str("<div class=\"fold-body\" style=\"max-height:0;overflow:hidden\">\n");
    } else {
        out.push_str("<div class=\"fold-body\">\n");
    }
    for child in &section.children {
        html_node(out, child, pane, state);
    }
    out.push_str("</div>\n</section>\n");
}

/// Render `text` as an indented plain-text outline for `pane`. Collapsed
/// sections show their heading only.
pub fn render_outline(text: &str, pane: &str, state: &CollapseState, indent: usize) -> String {
    let tree = parse_sections(text);
    if tree.is_empty() {
        return format!("{PLACEHOLDER}\n");
    }
    let mut out = String::new();
    for node in &tree {
        outline_node(&mut out, node, pane, state, indent, 0);
    }
    out
}

fn outline_node(
    out: &mut String,
    node: &Node,
    pane: &str,
    state: &CollapseState,
    indent: usize,
    depth: usize,
) {
    let pad = " ".repeat(indent * depth);
    match node {
        Node::Content { text } => {
            for line in text.lines() {
                if line.trim().is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&pad);
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        Node::Section(section) if section.implicit => {
            for child in &section.children {
                outline_node(out, child, pane, state, indent, depth);
            }
        }
        Node::Section(section) => {
            let collapsed = state.is_collapsed(pane, &section.id);
            let marker = match (section.has_children(), collapsed) {
                (false, _) => " ",
                (true, true) => COLLAPSED,
                (true, false) => EXPANDED,
            };
            out.push_str(&format!("{pad}{marker} {}\n", section.text));
            if !collapsed {
                for child in &section.children {
                    outline_node(out, child, pane, state, indent, depth + 1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_placeholder() {
        let state = CollapseState::new();
        assert!(render_html("", "notes", &state).contains(PLACEHOLDER));
        assert!(render_html(" \n\t\n", "notes", &state).contains(PLACEHOLDER));
        assert_eq!(render_outline("", "notes", &state, 2), "No content yet...\n");
    }

    #[test]
    fn indicator_reflects_collapse_state() {
        let mut state = CollapseState::new();
        let html = render_html("# A\nbody", "notes", &state);
        assert!(html.contains("▼"));
        assert!(!html.contains("max-height:0"));

        state.toggle("notes", "a");
        let html = render_html("# A\nbody", "notes", &state);
        assert!(html.contains("▶"));
        assert!(html.contains("max-height:0"));
        // Collapsed bodies stay in the document.
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn childless_sections_have_no_indicator() {
        let html = render_html("# Lonely", "notes", &CollapseState::new());
        assert!(!html.contains("fold-indicator"));
        assert!(html.contains("<h1>Lonely</h1>"));
    }

    #[test]
    fn implicit_sections_render_no_header() {
        let html = render_html("## Orphan\ntext", "notes", &CollapseState::new());
        assert!(!html.contains("<h1>"));
        assert!(!html.contains("data-section-id=\"content\""));
        assert!(html.contains("<h2>Orphan</h2>"));
    }

    #[test]
    fn content_renders_markdown() {
        let text = "# A\n**bold** and `code`\n\n| a | b |\n|---|---|\n| 1 | 2 |";
        let html = render_html(text, "notes", &CollapseState::new());
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<code>code</code>"));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_markdown("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn heading_text_renders_inline() {
        let html = render_html("# Hello *world*", "notes", &CollapseState::new());
        assert!(html.contains("<h1>Hello <em>world</em></h1>"));
    }

    #[test]
    fn section_id_attribute_carries_only_slug_characters() {
        let html = render_html("# \"Quotes\" & <tags>", "notes", &CollapseState::new());
        assert!(html.contains("data-section-id=\"-quotes-tags-\""));
    }

    #[test]
    fn pane_attribute_is_escaped() {
        let html = render_html("# A", "a\"b", &CollapseState::new());
        assert!(html.contains("data-pane=\"a&quot;b\""));
    }

    #[test]
    fn outline_hides_collapsed_children() {
        let text = "# A\nintro\n## B\ndetail\n# C";
        let mut state = CollapseState::new();
        // Childless headings get a blank marker column.
        assert_eq!(
            render_outline(text, "notes", &state, 2),
            "▼ A\n  intro\n  ▼ B\n    detail\n  C\n"
        );
        state.toggle("notes", "a");
        assert_eq!(render_outline(text, "notes", &state, 2), "▶ A\n  C\n");
    }
}
