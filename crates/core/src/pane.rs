//! Editor panes: a text buffer plus editing behaviour and change notification.

use crate::autoclose::{self, AutoClose};
use crate::buffer::TextBuffer;
use crate::config::PlaygroundConfig;
use crate::error::PlaygroundError;
use crate::hint::{self, HintSchema, HintScheduler, Suggestions};
use crate::types::{ChangeEvent, EditorId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use web_time::Instant;

/// Receives every content change of a pane.
pub trait ChangeListener {
    fn on_change(&mut self, event: &ChangeEvent);
}

impl<F: FnMut(&ChangeEvent)> ChangeListener for F {
    fn on_change(&mut self, event: &ChangeEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Default)]
pub struct PaneOptions {
    pub indent_unit: usize,
    pub auto_close_tags: bool,
    pub auto_close_brackets: bool,
    pub read_only: bool,
    /// Enables deferred hints when set.
    pub hint_schema: Option<Arc<HintSchema>>,
    pub hint_delay: Duration,
}

impl PaneOptions {
    /// The standard options of each pane.
    pub fn for_editor(editor: EditorId, config: &PlaygroundConfig) -> Self {
        match editor {
            EditorId::Output => Self::read_only(),
            EditorId::Xml | EditorId::Xslt => PaneOptions {
                indent_unit: config.indent_unit,
                auto_close_tags: config.auto_close_tags,
                auto_close_brackets: config.auto_close_brackets,
                read_only: false,
                hint_schema: (editor == EditorId::Xslt).then(|| Arc::new(HintSchema::xslt())),
                hint_delay: config.hint_delay(),
            },
        }
    }

    pub fn read_only() -> Self {
        PaneOptions {
            read_only: true,
            ..Default::default()
        }
    }

    fn auto_close(&self) -> AutoClose {
        AutoClose {
            tags: self.auto_close_tags,
            brackets: self.auto_close_brackets,
        }
    }
}

pub struct EditorPane {
    id: EditorId,
    buffer: TextBuffer,
    options: PaneOptions,
    hints: Option<HintScheduler>,
    listeners: Vec<(SubscriptionId, Box<dyn ChangeListener>)>,
    next_subscription: u64,
}

impl fmt::Debug for EditorPane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorPane")
            .field("id", &self.id)
            .field("buffer", &self.buffer)
            .field("options", &self.options)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EditorPane {
    pub fn new(id: EditorId, text: &str, options: PaneOptions) -> Self {
        let hints = options
            .hint_schema
            .as_ref()
            .map(|_| HintScheduler::new(options.hint_delay));
        EditorPane {
            id,
            buffer: TextBuffer::new(text),
            options,
            hints,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn id(&self) -> EditorId {
        self.id
    }

    pub fn value(&self) -> &str {
        self.buffer.text()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn options(&self) -> &PaneOptions {
        &self.options
    }

    pub fn subscribe(&mut self, listener: impl ChangeListener + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the subscription was not found.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        let event = ChangeEvent {
            editor: self.id,
            text: self.buffer.text().to_string(),
        };
        for (_, listener) in &mut self.listeners {
            listener.on_change(&event);
        }
    }

    fn check_writable(&self) -> Result<(), PlaygroundError> {
        if self.options.read_only {
            Err(PlaygroundError::ReadOnly(self.id))
        } else {
            Ok(())
        }
    }

    /// Replaces the whole content. Allowed on read-only panes.
    pub fn set_value(&mut self, text: &str) {
        self.buffer.set_text(text);
        self.notify();
    }

    pub fn set_cursor(&mut self, pos: usize) {
        self.buffer.set_cursor(pos);
    }

    pub fn select(&mut self, anchor: usize, head: usize) {
        self.buffer.select(anchor, head);
    }

    /// Inserts text at the cursor, replacing any selection. No auto-closing applies.
    pub fn insert_str(&mut self, text: &str) -> Result<(), PlaygroundError> {
        self.check_writable()?;
        self.buffer.replace_selection(text);
        self.notify();
        Ok(())
    }

    /// Types one character as a keystroke would, at time `now`.
    pub fn type_char(&mut self, c: char, now: Instant) -> Result<(), PlaygroundError> {
        self.check_writable()?;
        let trigger = self.hints.is_some() && hint::is_trigger(c, self.buffer.text_before_cursor());
        autoclose::type_char(&mut self.buffer, c, self.options.auto_close());
        if trigger {
            if let Some(scheduler) = self.hints.as_mut() {
                scheduler.schedule(now);
            }
        }
        self.notify();
        Ok(())
    }

    /// Indents the selected lines, or inserts one indent unit of spaces at the cursor.
    pub fn press_tab(&mut self) -> Result<(), PlaygroundError> {
        self.check_writable()?;
        let unit = " ".repeat(self.options.indent_unit);
        if self.buffer.has_selection() {
            self.buffer.indent_selection(&unit);
        } else {
            self.buffer.replace_selection(&unit);
        }
        self.notify();
        Ok(())
    }

    /// Runs a due hint request, returning the suggestions to show.
    pub fn poll_hints(&mut self, now: Instant) -> Option<Suggestions> {
        let scheduler = self.hints.as_mut()?;
        if !scheduler.poll(now) {
            return None;
        }
        let schema = self.options.hint_schema.as_ref()?;
        schema.suggest(self.buffer.text_before_cursor())
    }

    pub fn hint_pending(&self) -> bool {
        self.hints.as_ref().is_some_and(HintScheduler::is_pending)
    }

    /// Tells the scheduler whether a completion popup is open.
    pub fn set_completion_active(&mut self, active: bool) {
        if let Some(scheduler) = self.hints.as_mut() {
            scheduler.set_completion_active(active);
        }
    }

    /// Replaces the completed range with the chosen suggestion and ends the completion session.
    pub fn accept_suggestion(&mut self, suggestions: &Suggestions, index: usize) -> Result<(), PlaygroundError> {
        self.check_writable()?;
        self.set_completion_active(false);
        let Some(choice) = suggestions.list.get(index) else {
            return Ok(());
        };
        self.buffer.select(suggestions.from, suggestions.to);
        self.buffer.replace_selection(choice);
        self.notify();
        Ok(())
    }

    /// Whether `tag` (or its attribute `attr`) is part of this pane's hint schema.
    pub fn is_builtin(&self, tag: &str, attr: Option<&str>) -> bool {
        self.options
            .hint_schema
            .as_ref()
            .is_some_and(|schema| schema.is_builtin(tag, attr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn xslt_pane(text: &str) -> EditorPane {
        EditorPane::new(
            EditorId::Xslt,
            text,
            PaneOptions::for_editor(EditorId::Xslt, &PlaygroundConfig::default()),
        )
    }

    fn recorder(pane: &mut EditorPane) -> (SubscriptionId, Rc<RefCell<Vec<ChangeEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let id = pane.subscribe(move |event: &ChangeEvent| sink.borrow_mut().push(event.clone()));
        (id, events)
    }

    #[test]
    fn test_every_change_notifies_subscribers() {
        let mut pane = xslt_pane("");
        let (id, events) = recorder(&mut pane);
        pane.set_value("<a");
        pane.type_char('>', Instant::now()).unwrap();
        pane.press_tab().unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].text, "<a></a>");
        assert_eq!(events[2].text, "<a>  </a>");
        assert!(events.iter().all(|e| e.editor == EditorId::Xslt));
        drop(events);

        assert!(pane.unsubscribe(id));
        assert!(!pane.unsubscribe(id));
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let mut pane = EditorPane::new(EditorId::Output, "", PaneOptions::read_only());
        assert!(matches!(
            pane.type_char('x', Instant::now()),
            Err(PlaygroundError::ReadOnly(EditorId::Output))
        ));
        assert!(pane.press_tab().is_err());
        assert!(pane.insert_str("x").is_err());
        pane.set_value("rendered");
        assert_eq!(pane.value(), "rendered");
    }

    #[test]
    fn test_tab_indents_selection() {
        let mut pane = xslt_pane("<a>\n<b/>\n</a>");
        pane.select(0, 8);
        pane.press_tab().unwrap();
        assert_eq!(pane.value(), "  <a>\n  <b/>\n</a>");
    }

    #[test]
    fn test_typing_schedules_one_hint() {
        let start = Instant::now();
        let mut pane = xslt_pane(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">"#,
        );
        for (i, c) in "<xsl:o".chars().enumerate() {
            pane.type_char(c, start + Duration::from_millis(i as u64 * 10)).unwrap();
        }
        assert!(pane.hint_pending());
        assert_eq!(pane.poll_hints(start + Duration::from_millis(50)), None);

        let suggestions = pane.poll_hints(start + Duration::from_millis(100)).unwrap();
        assert_eq!(suggestions.list, vec!["<xsl:output".to_string()]);
        assert_eq!(pane.poll_hints(start + Duration::from_secs(1)), None);

        pane.accept_suggestion(&suggestions, 0).unwrap();
        assert!(pane.value().ends_with("><xsl:output"));
    }

    #[test]
    fn test_xml_pane_has_no_hints() {
        let mut pane = EditorPane::new(
            EditorId::Xml,
            "",
            PaneOptions::for_editor(EditorId::Xml, &PlaygroundConfig::default()),
        );
        pane.type_char('<', Instant::now()).unwrap();
        assert!(!pane.hint_pending());
        assert!(!pane.is_builtin("xsl:template", None));
        assert!(xslt_pane("").is_builtin("xsl:template", Some("match")));
    }
}
