//! A playground session: two editable panes, the output pane, persistence and the
//! update cycle wired together.

use crate::config::PlaygroundConfig;
use crate::defaults;
use crate::error::{PlaygroundError, StorageError};
use crate::hint::Suggestions;
use crate::orchestrator::{UpdateOrchestrator, UpdateState};
use crate::pane::{EditorPane, PaneOptions};
use crate::persistence::Persistence;
use crate::reporter::{ErrorRegions, OutputPanel};
use crate::storage::KeyValueStore;
use crate::transform::XmlEngine;
use crate::types::{ChangeEvent, EditorId};
use std::cell::RefCell;
use std::rc::Rc;
use web_time::Instant;

type EventQueue = Rc<RefCell<Vec<ChangeEvent>>>;

/// Every change to the XML or XSLT pane is saved and then runs one update cycle.
#[derive(Debug)]
pub struct Playground<E, S> {
    config: PlaygroundConfig,
    xml: EditorPane,
    xslt: EditorPane,
    output: OutputPanel,
    errors: ErrorRegions,
    persistence: Persistence<S>,
    orchestrator: UpdateOrchestrator<E>,
    pending: EventQueue,
}

impl<E: XmlEngine, S: KeyValueStore> Playground<E, S> {
    /// Opens a session, seeding the panes from `store` or the built-in defaults.
    pub fn new(config: PlaygroundConfig, engine: E, store: S) -> Result<Self, PlaygroundError> {
        Self::with_templates(config, engine, store, |editor| {
            defaults::template_for(editor).to_string()
        })
    }

    /// Like [`Playground::new`], with the default content of each pane taken from `template`.
    pub fn with_templates(
        config: PlaygroundConfig,
        engine: E,
        store: S,
        template: impl Fn(EditorId) -> String,
    ) -> Result<Self, PlaygroundError> {
        let persistence = Persistence::new(config.storage_prefix.clone(), store);
        let pending: EventQueue = Rc::default();

        let open_pane = |editor: EditorId| -> Result<EditorPane, StorageError> {
            let text = persistence.load(editor, &template(editor))?;
            let mut pane = EditorPane::new(editor, &text, PaneOptions::for_editor(editor, &config));
            let queue = Rc::clone(&pending);
            pane.subscribe(move |event: &ChangeEvent| queue.borrow_mut().push(event.clone()));
            Ok(pane)
        };
        let xml = open_pane(EditorId::Xml)?;
        let xslt = open_pane(EditorId::Xslt)?;

        let mut playground = Playground {
            config,
            xml,
            xslt,
            output: OutputPanel::new(),
            errors: ErrorRegions::new(),
            persistence,
            orchestrator: UpdateOrchestrator::new(engine),
            pending,
        };
        playground.update();
        Ok(playground)
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn pane(&self, editor: EditorId) -> &EditorPane {
        match editor {
            EditorId::Xml => &self.xml,
            EditorId::Xslt => &self.xslt,
            EditorId::Output => self.output.pane(),
        }
    }

    pub fn output(&self) -> &OutputPanel {
        &self.output
    }

    pub fn errors(&self) -> &ErrorRegions {
        &self.errors
    }

    pub fn state(&self) -> UpdateState {
        self.orchestrator.state()
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// Re-runs the update cycle on the current pane contents.
    pub fn update(&mut self) -> UpdateState {
        self.orchestrator.update(
            self.xml.value(),
            self.xslt.value(),
            &mut self.errors,
            &mut self.output,
        )
    }

    /// Applies `edit` to an editable pane, then saves and updates for each change it made.
    pub fn edit<R>(
        &mut self,
        editor: EditorId,
        edit: impl FnOnce(&mut EditorPane) -> Result<R, PlaygroundError>,
    ) -> Result<R, PlaygroundError> {
        let pane = match editor {
            EditorId::Xml => &mut self.xml,
            EditorId::Xslt => &mut self.xslt,
            EditorId::Output => return Err(PlaygroundError::ReadOnly(editor)),
        };
        let result = edit(pane);
        self.flush()?;
        result
    }

    pub fn set_text(&mut self, editor: EditorId, text: &str) -> Result<(), PlaygroundError> {
        self.edit(editor, |pane| {
            pane.set_value(text);
            Ok(())
        })
    }

    pub fn type_char(&mut self, editor: EditorId, c: char, now: Instant) -> Result<(), PlaygroundError> {
        self.edit(editor, |pane| pane.type_char(c, now))
    }

    pub fn press_tab(&mut self, editor: EditorId) -> Result<(), PlaygroundError> {
        self.edit(editor, EditorPane::press_tab)
    }

    /// Hint suggestions for the stylesheet pane, once its deferred request is due.
    pub fn poll_hints(&mut self, now: Instant) -> Option<Suggestions> {
        self.xslt.poll_hints(now)
    }

    /// Saves and updates once per queued change event.
    fn flush(&mut self) -> Result<(), PlaygroundError> {
        let events = std::mem::take(&mut *self.pending.borrow_mut());
        let mut first_error = None;
        for event in events {
            if let Err(e) = self.persistence.save(event.editor, &event.text) {
                log::warn!("Could not save the {} pane: {}", event.editor, e);
                first_error.get_or_insert(e);
            }
            self.update();
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::FakeEngine;
    use crate::storage::MemoryStore;

    fn playground(store: MemoryStore) -> Playground<FakeEngine, MemoryStore> {
        let _ = env_logger::builder().is_test(true).try_init();
        Playground::new(PlaygroundConfig::default(), FakeEngine, store).unwrap()
    }

    #[test]
    fn test_opens_with_defaults_and_renders() {
        let session = playground(MemoryStore::new());
        assert_eq!(session.pane(EditorId::Xml).value(), defaults::default_document(EditorId::Xml));
        assert_eq!(session.state(), UpdateState::Rendered);
        assert_eq!(session.output().text(), session.pane(EditorId::Xml).value());
        // Loading does not count as an edit.
        assert!(session.persistence().store().is_empty());
    }

    #[test]
    fn test_stored_text_seeds_pane() {
        let mut store = MemoryStore::new();
        store.set("xsltui.xml", "<saved/>").unwrap();
        let session = playground(store);
        assert_eq!(session.pane(EditorId::Xml).value(), "<saved/>");
        assert_eq!(session.output().text(), "<saved/>");
    }

    #[test]
    fn test_edit_saves_then_updates() {
        let mut session = playground(MemoryStore::new());
        session.set_text(EditorId::Xml, "<a").unwrap();
        session.type_char(EditorId::Xml, '>', Instant::now()).unwrap();

        assert_eq!(
            session.persistence().stored(EditorId::Xml).unwrap().as_deref(),
            Some("<a></a>")
        );
        assert_eq!(session.output().text(), "<a></a>");
        assert_eq!(session.output().label(), "XML");

        session.set_text(EditorId::Xslt, "!bad").unwrap();
        assert_eq!(session.state(), UpdateState::ParseError);
        assert_eq!(session.errors().get(EditorId::Xslt), "cannot parse !bad");
        assert_eq!(
            session.persistence().stored(EditorId::Xslt).unwrap().as_deref(),
            Some("!bad")
        );
    }

    #[test]
    fn test_output_pane_is_not_editable() {
        let mut session = playground(MemoryStore::new());
        assert!(matches!(
            session.set_text(EditorId::Output, "x"),
            Err(PlaygroundError::ReadOnly(EditorId::Output))
        ));
        assert!(session.press_tab(EditorId::Xml).is_ok());
    }

    #[test]
    fn test_custom_templates_and_prefix() {
        let config = PlaygroundConfig::default().with_storage_prefix("demo.");
        let mut session = Playground::with_templates(config, FakeEngine, MemoryStore::new(), |editor| {
            format!("\n      <{}/>\n    ", editor)
        })
        .unwrap();
        assert_eq!(session.pane(EditorId::Xslt).value(), "<xslt/>");
        session.set_text(EditorId::Xslt, "<b/>").unwrap();
        assert_eq!(session.persistence().key(EditorId::Xslt), "demo.xslt");
        assert_eq!(
            session.persistence().store().get("demo.xslt").unwrap().as_deref(),
            Some("<b/>")
        );
    }
}
