use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::parse::{heading_ids, HeadingLevel};

/// Per-pane map of section id to collapsed flag.
///
/// A missing entry means expanded. Panes never see each other's entries, but
/// two headings with the same id inside one pane share a flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollapseState {
    panes: BTreeMap<String, BTreeMap<String, bool>>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, pane: &str, section_id: &str) -> bool {
        self.panes
            .get(pane)
            .and_then(|sections| sections.get(section_id))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_collapsed(&mut self, pane: &str, section_id: &str, collapsed: bool) {
        self.panes
            .entry(pane.to_string())
            .or_default()
            .insert(section_id.to_string(), collapsed);
    }

    /// Flip one section and return its new state.
    pub fn toggle(&mut self, pane: &str, section_id: &str) -> bool {
        let collapsed = !self.is_collapsed(pane, section_id);
        self.set_collapsed(pane, section_id, collapsed);
        collapsed
    }

    /// Forget every flag in `pane`, leaving all of its sections expanded.
    pub fn expand_all(&mut self, pane: &str) {
        self.panes.remove(pane);
    }

    /// Replace `pane`'s map with one collapsing every H1, H2 and H3 in `text`.
    pub fn collapse_all(&mut self, pane: &str, text: &str) {
        self.replace_with(pane, heading_ids(text, HeadingLevel::H3));
    }

    /// Replace `pane`'s map with one collapsing only the H1 headings in `text`.
    pub fn collapse_top_level(&mut self, pane: &str, text: &str) {
        self.replace_with(pane, heading_ids(text, HeadingLevel::H1));
    }

    /// Number of sections currently collapsed in `pane`.
    pub fn collapsed_count(&self, pane: &str) -> usize {
        self.panes
            .get(pane)
            .map_or(0, |sections| sections.values().filter(|c| **c).count())
    }

    fn replace_with(&mut self, pane: &str, ids: Vec<String>) {
        let sections = ids.into_iter().map(|id| (id, true)).collect();
        self.panes.insert(pane.to_string(), sections);
    }
}
