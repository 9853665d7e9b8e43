//! The `XsltPlayground` class exported to JavaScript.

use crate::backend::BrowserBackend;
use crate::dom::{self, DomOutput, DomReporter};
use crate::error::XsltuiError;
use crate::storage::LocalStorage;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlTextAreaElement, KeyboardEvent};
use xsltui_core::{
    EditorId, EditorPane, ErrorRegions, FallbackStore, Instant, OutputSink, PaneOptions, Persistence,
    PlaygroundConfig, PlaygroundError, Suggestions, TransformResult, UpdateOrchestrator, UpdateState,
    defaults,
};

struct Session {
    config: PlaygroundConfig,
    persistence: Persistence<FallbackStore<LocalStorage>>,
    orchestrator: UpdateOrchestrator<BrowserBackend>,
    /// Editing state of each pane, synced from its textarea before every key.
    xml: EditorPane,
    xslt: EditorPane,
    hints: Option<OpenHints>,
}

/// Result of `update()` as seen from JavaScript.
#[derive(Serialize)]
struct UpdateReport<'a> {
    state: UpdateState,
    #[serde(rename = "type")]
    kind: Option<&'a str>,
    text: Option<&'a str>,
    errors: BTreeMap<EditorId, &'a str>,
}

#[derive(Default)]
struct CapturedOutput(Option<TransformResult>);

impl OutputSink for CapturedOutput {
    fn render(&mut self, result: &TransformResult) {
        self.0 = Some(result.clone());
    }
}

fn editable(pane: &str) -> Result<EditorId, XsltuiError> {
    let editor: EditorId = pane.parse()?;
    if !editor.is_editable() {
        return Err(PlaygroundError::ReadOnly(editor).into());
    }
    Ok(editor)
}

/// The XML/XSLT playground.
///
/// # Example
///
/// ```javascript
/// const playground = new XsltPlayground();
/// playground.mount(); // wire the page's textareas
///
/// // or drive it directly:
/// playground.save("xml", "<a/>");
/// const { state, type, text, errors } = playground.update(playground.load("xml"), playground.load("xslt"));
/// ```
#[wasm_bindgen]
pub struct XsltPlayground {
    session: Rc<RefCell<Session>>,
}

impl XsltPlayground {
    fn from_config(config: PlaygroundConfig) -> Self {
        let persistence = Persistence::new(config.storage_prefix.clone(), LocalStorage::with_fallback());
        let pane = |editor| EditorPane::new(editor, "", PaneOptions::for_editor(editor, &config));
        let (xml, xslt) = (pane(EditorId::Xml), pane(EditorId::Xslt));
        XsltPlayground {
            session: Rc::new(RefCell::new(Session {
                config,
                persistence,
                orchestrator: UpdateOrchestrator::new(BrowserBackend::new()),
                xml,
                xslt,
                hints: None,
            })),
        }
    }

    fn load_pane(&self, editor: EditorId) -> Result<String, XsltuiError> {
        let template = dom::document()
            .ok()
            .and_then(|document| dom::default_template(&document, editor))
            .unwrap_or_else(|| defaults::template_for(editor).to_string());
        Ok(self.session.borrow().persistence.load(editor, &template)?)
    }
}

#[wasm_bindgen]
impl XsltPlayground {
    /// Create a playground storing panes under `prefix` (default `xsltui.`).
    #[wasm_bindgen(constructor)]
    pub fn new(prefix: Option<String>) -> Self {
        let mut config = PlaygroundConfig::default();
        if let Some(prefix) = prefix {
            config.storage_prefix = prefix;
        }
        Self::from_config(config)
    }

    /// Create a playground from a JSON configuration object.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str) -> Result<XsltPlayground, JsValue> {
        let config = PlaygroundConfig::from_json(json).map_err(XsltuiError::from)?;
        Ok(Self::from_config(config))
    }

    /// The stored text of `pane`, or its default content.
    pub fn load(&self, pane: &str) -> Result<String, JsValue> {
        Ok(self.load_pane(editable(pane)?)?)
    }

    pub fn save(&self, pane: &str, text: &str) -> Result<(), JsValue> {
        let editor = editable(pane)?;
        self.session
            .borrow_mut()
            .persistence
            .save(editor, text)
            .map_err(XsltuiError::from)?;
        Ok(())
    }

    /// Run one update cycle. Returns `{ state, type, text, errors }`; `type` and
    /// `text` are `null` unless the cycle rendered.
    pub fn update(&self, xml: &str, xslt: &str) -> Result<JsValue, JsValue> {
        let mut errors = ErrorRegions::new();
        let mut output = CapturedOutput::default();
        let state = self
            .session
            .borrow_mut()
            .orchestrator
            .update(xml, xslt, &mut errors, &mut output);

        let report = UpdateReport {
            state,
            kind: output.0.as_ref().map(|result| result.kind_label.as_str()),
            text: output.0.as_ref().map(|result| result.text.as_str()),
            errors: errors.iter().collect(),
        };
        Ok(report.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?)
    }

    /// Whether storage failed and edits are only kept in memory.
    #[wasm_bindgen(getter, js_name = storageDegraded)]
    pub fn storage_degraded(&self) -> bool {
        self.session.borrow().persistence.store().is_degraded()
    }

    /// Wire the page's textareas: load each pane, save and re-run on every input,
    /// and route editing keys (Tab, auto-closed characters, hint triggers and the
    /// hint popup keys) through the pane.
    pub fn mount(&self) -> Result<(), JsValue> {
        let document = dom::document()?;
        for editor in EditorId::EDITABLE {
            let area = dom::textarea(&document, editor)?;
            let text = self.load_pane(editor)?;
            area.set_value(&text);
            self.session.borrow_mut().pane_mut(editor)?.set_value(&text);

            let session = Rc::clone(&self.session);
            let on_input = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                if let Err(e) = on_edit(&session, editor) {
                    log::error!("{}", e);
                }
            });
            area.add_event_listener_with_callback("input", on_input.as_ref().unchecked_ref())?;
            on_input.forget();

            let session = Rc::clone(&self.session);
            let target = area.clone();
            let on_keydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
                if event.ctrl_key() || event.meta_key() || event.alt_key() || event.is_composing() {
                    return;
                }
                match handle_key(&session, editor, &target, &event.key()) {
                    Ok(true) => event.prevent_default(),
                    Ok(false) => {}
                    Err(e) => log::error!("{}", e),
                }
            });
            area.add_event_listener_with_callback("keydown", on_keydown.as_ref().unchecked_ref())?;
            on_keydown.forget();

            if let Some(popup) = dom::hint_list(&document, editor) {
                let session = Rc::clone(&self.session);
                let target = area.clone();
                let on_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                    let index = event
                        .target()
                        .and_then(|target| target.dyn_into::<Element>().ok())
                        .and_then(|item| item.closest("li[data-index]").ok().flatten())
                        .and_then(|item| item.get_attribute("data-index"))
                        .and_then(|index| index.parse::<usize>().ok());
                    let Some(index) = index else {
                        return;
                    };
                    if let Err(e) = accept_hint(&session, editor, &target, Some(index)) {
                        log::error!("{}", e);
                    }
                });
                popup.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
                on_click.forget();
            }
        }
        render(&self.session)?;
        Ok(())
    }

    /// Apply `key` to the mounted textarea of `pane` as the keydown listener does.
    /// Returns `true` if the key was handled and its default action should be suppressed.
    #[wasm_bindgen(js_name = pressKey)]
    pub fn press_key(&self, pane: &str, key: &str) -> Result<bool, JsValue> {
        let editor = editable(pane)?;
        let area = dom::textarea(&dom::document()?, editor)?;
        Ok(handle_key(&self.session, editor, &area, key)?)
    }

    /// Run the pending hint request of `pane` if it is due, showing its suggestions.
    /// Returns the suggestions shown, empty when nothing is due.
    #[wasm_bindgen(js_name = pollHints)]
    pub fn poll_hints(&self, pane: &str) -> Result<Array, JsValue> {
        let editor = editable(pane)?;
        let shown = show_due_hints(&self.session, editor)?;
        Ok(shown.iter().map(|choice| JsValue::from_str(choice)).collect())
    }
}

/// An open completion popup.
struct OpenHints {
    editor: EditorId,
    suggestions: Suggestions,
    selected: usize,
}

impl Session {
    fn pane_mut(&mut self, editor: EditorId) -> Result<&mut EditorPane, XsltuiError> {
        match editor {
            EditorId::Xml => Ok(&mut self.xml),
            EditorId::Xslt => Ok(&mut self.xslt),
            EditorId::Output => Err(PlaygroundError::ReadOnly(editor).into()),
        }
    }
}

/// Single characters the pane handles itself: auto-closed brackets and quotes,
/// tag completion and hint triggers.
fn edit_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    matches!(c, '<' | '>' | '/' | ' ' | '=' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\'').then_some(c)
}

fn handle_key(
    session: &Rc<RefCell<Session>>,
    editor: EditorId,
    area: &HtmlTextAreaElement,
    key: &str,
) -> Result<bool, XsltuiError> {
    if popup_key(session, editor, area, key)? {
        return Ok(true);
    }
    let (hint_pending, delay) = {
        let mut state = session.borrow_mut();
        let delay = state.config.hint_delay_ms;
        let pane = state.pane_mut(editor)?;
        dom::read_textarea(area, pane);
        if key == "Tab" {
            pane.press_tab()?;
        } else if let Some(c) = edit_char(key) {
            pane.type_char(c, Instant::now())?;
        } else {
            return Ok(false);
        }
        dom::write_textarea(area, pane)?;
        (pane.hint_pending(), delay)
    };
    on_edit(session, editor)?;
    if hint_pending {
        schedule_hints(session, editor, delay)?;
    }
    Ok(true)
}

/// Keys that act on an open popup. Any other key closes it and is handled normally.
fn popup_key(
    session: &Rc<RefCell<Session>>,
    editor: EditorId,
    area: &HtmlTextAreaElement,
    key: &str,
) -> Result<bool, XsltuiError> {
    let mut state = session.borrow_mut();
    let Some(open) = state.hints.as_mut().filter(|open| open.editor == editor) else {
        return Ok(false);
    };
    let count = open.suggestions.list.len();
    match key {
        "ArrowDown" | "ArrowUp" => {
            open.selected = if key == "ArrowDown" {
                (open.selected + 1) % count
            } else {
                (open.selected + count - 1) % count
            };
            dom::show_hints(&dom::document()?, editor, &open.suggestions.list, open.selected)?;
            Ok(true)
        }
        "Enter" | "Tab" => {
            drop(state);
            accept_hint(session, editor, area, None)?;
            Ok(true)
        }
        "Shift" | "Control" | "Alt" | "Meta" | "CapsLock" => Ok(false),
        _ => {
            state.hints = None;
            state.pane_mut(editor)?.set_completion_active(false);
            dom::hide_hints(&dom::document()?, editor);
            Ok(key == "Escape")
        }
    }
}

/// Polls the pane once its hint delay has passed.
fn schedule_hints(session: &Rc<RefCell<Session>>, editor: EditorId, delay_ms: u64) -> Result<(), XsltuiError> {
    let window = web_sys::window().ok_or_else(|| XsltuiError::dom("no window"))?;
    let session = Rc::clone(session);
    let callback = Closure::once_into_js(move || {
        if let Err(e) = show_due_hints(&session, editor) {
            log::error!("{}", e);
        }
    });
    let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
        .map_err(|e| XsltuiError::dom(crate::error::js_message(&e)))?;
    Ok(())
}

fn show_due_hints(session: &Rc<RefCell<Session>>, editor: EditorId) -> Result<Vec<String>, XsltuiError> {
    let mut state = session.borrow_mut();
    let pane = state.pane_mut(editor)?;
    let Some(suggestions) = pane.poll_hints(Instant::now()) else {
        return Ok(Vec::new());
    };
    pane.set_completion_active(true);
    dom::show_hints(&dom::document()?, editor, &suggestions.list, 0)?;
    let shown = suggestions.list.clone();
    state.hints = Some(OpenHints {
        editor,
        suggestions,
        selected: 0,
    });
    Ok(shown)
}

/// Replaces the completed range with the chosen suggestion, or the selected one.
fn accept_hint(
    session: &Rc<RefCell<Session>>,
    editor: EditorId,
    area: &HtmlTextAreaElement,
    index: Option<usize>,
) -> Result<(), XsltuiError> {
    {
        let mut state = session.borrow_mut();
        let Some(open) = state.hints.take().filter(|open| open.editor == editor) else {
            return Ok(());
        };
        let pane = state.pane_mut(editor)?;
        dom::read_textarea(area, pane);
        pane.accept_suggestion(&open.suggestions, index.unwrap_or(open.selected))?;
        dom::write_textarea(area, pane)?;
    }
    dom::hide_hints(&dom::document()?, editor);
    on_edit(session, editor)
}

/// Saves the pane's textarea and re-renders the page.
fn on_edit(session: &Rc<RefCell<Session>>, editor: EditorId) -> Result<(), XsltuiError> {
    let document = dom::document()?;
    let text = dom::textarea(&document, editor)?.value();
    session.borrow_mut().persistence.save(editor, &text)?;
    render(session)
}

fn render(session: &Rc<RefCell<Session>>) -> Result<(), XsltuiError> {
    let document = dom::document()?;
    let xml = dom::textarea(&document, EditorId::Xml)?.value();
    let xslt = dom::textarea(&document, EditorId::Xslt)?.value();
    let mut reporter = DomReporter::new(document.clone());
    let mut output = DomOutput::new(document);
    session
        .borrow_mut()
        .orchestrator
        .update(&xml, &xslt, &mut reporter, &mut output);
    Ok(())
}
