//! Where the update cycle writes errors and results.

use crate::pane::{EditorPane, PaneOptions};
use crate::types::{EditorId, TransformResult};
use std::collections::BTreeMap;

/// Per-pane error regions.
pub trait ErrorReporter {
    /// Overwrites the pane's region; `None` clears it.
    fn report(&mut self, pane: EditorId, message: Option<&str>);

    /// Writes empty text to every region.
    fn clear_all(&mut self);
}

/// The output pane and its type label.
pub trait OutputSink {
    fn render(&mut self, result: &TransformResult);
}

/// In-memory error regions, one per pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorRegions {
    regions: BTreeMap<EditorId, String>,
}

impl ErrorRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The region text; empty when clear.
    pub fn get(&self, pane: EditorId) -> &str {
        self.regions.get(&pane).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.regions.values().all(String::is_empty)
    }

    /// Non-empty regions in pane order.
    pub fn iter(&self) -> impl Iterator<Item = (EditorId, &str)> {
        self.regions
            .iter()
            .filter(|(_, message)| !message.is_empty())
            .map(|(pane, message)| (*pane, message.as_str()))
    }
}

impl ErrorReporter for ErrorRegions {
    fn report(&mut self, pane: EditorId, message: Option<&str>) {
        self.regions.insert(pane, message.unwrap_or("").to_string());
    }

    fn clear_all(&mut self) {
        for pane in EditorId::ALL {
            self.regions.insert(pane, String::new());
        }
    }
}

/// The read-only output pane together with its type label.
#[derive(Debug)]
pub struct OutputPanel {
    pane: EditorPane,
    label: String,
}

impl OutputPanel {
    pub fn new() -> Self {
        OutputPanel {
            pane: EditorPane::new(EditorId::Output, "", PaneOptions::read_only()),
            label: String::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn text(&self) -> &str {
        self.pane.value()
    }

    pub fn pane(&self) -> &EditorPane {
        &self.pane
    }
}

impl Default for OutputPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for OutputPanel {
    fn render(&mut self, result: &TransformResult) {
        self.label.clone_from(&result.kind_label);
        self.pane.set_value(&result.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_overwrites_and_clears() {
        let mut regions = ErrorRegions::new();
        regions.report(EditorId::Xml, Some("first"));
        regions.report(EditorId::Xml, Some("second"));
        regions.report(EditorId::Output, Some("boom"));
        assert_eq!(regions.get(EditorId::Xml), "second");
        assert_eq!(regions.iter().count(), 2);

        regions.report(EditorId::Output, None);
        assert_eq!(regions.get(EditorId::Output), "");

        regions.clear_all();
        assert!(regions.is_empty());
        assert_eq!(regions.get(EditorId::Xslt), "");
    }

    #[test]
    fn test_output_panel_renders_label_and_text() {
        let mut panel = OutputPanel::new();
        panel.render(&TransformResult::for_method("html", "<p>hi</p>"));
        assert_eq!(panel.label(), "HTML");
        assert_eq!(panel.text(), "<p>hi</p>");
        assert!(panel.pane().options().read_only);
    }
}
