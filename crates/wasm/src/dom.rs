//! The page the playground lives in.
//!
//! Each pane is a `section` whose id is the pane name (`#xml`, `#xslt`, `#output`). It
//! holds a `textarea`, an `.errors` element and, for editable panes, an optional
//! `script[data-default]` with the default content. The output label is `#output-type`.
//! A `.hints` list in a pane's section, when present, shows its completion popup.

use crate::error::XsltuiError;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlTextAreaElement};
use xsltui_core::{EditorId, EditorPane, ErrorReporter, OutputSink, TransformResult};

pub fn document() -> Result<Document, XsltuiError> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| XsltuiError::dom("no document"))
}

pub fn textarea(document: &Document, editor: EditorId) -> Result<HtmlTextAreaElement, XsltuiError> {
    document
        .query_selector(&format!("#{} textarea", editor))
        .ok()
        .flatten()
        .and_then(|element| element.dyn_into::<HtmlTextAreaElement>().ok())
        .ok_or_else(|| XsltuiError::dom(format!("no textarea for the {} pane", editor)))
}

/// Text of the pane's `script[data-default]`, still indented.
pub fn default_template(document: &Document, editor: EditorId) -> Option<String> {
    document
        .query_selector(&format!("#{} script[data-default]", editor))
        .ok()
        .flatten()
        .and_then(|script| script.text_content())
}

/// Writes into the `.errors` element of each pane's section.
#[derive(Debug, Clone)]
pub struct DomReporter {
    document: Document,
}

impl DomReporter {
    pub fn new(document: Document) -> Self {
        DomReporter { document }
    }
}

impl ErrorReporter for DomReporter {
    fn report(&mut self, pane: EditorId, message: Option<&str>) {
        match self.document.query_selector(&format!("#{} .errors", pane)) {
            Ok(Some(region)) => region.set_text_content(Some(message.unwrap_or(""))),
            _ => log::warn!("No error region for the {} pane", pane),
        }
    }

    fn clear_all(&mut self) {
        let Ok(regions) = self.document.query_selector_all(".errors") else {
            return;
        };
        for i in 0..regions.length() {
            if let Some(region) = regions.item(i) {
                region.set_text_content(Some(""));
            }
        }
    }
}

/// Writes results into the output textarea and `#output-type`.
#[derive(Debug, Clone)]
pub struct DomOutput {
    document: Document,
}

impl DomOutput {
    pub fn new(document: Document) -> Self {
        DomOutput { document }
    }
}

impl OutputSink for DomOutput {
    fn render(&mut self, result: &TransformResult) {
        if let Ok(Some(label)) = self.document.query_selector("#output-type") {
            label.set_text_content(Some(&result.kind_label));
        }
        match textarea(&self.document, EditorId::Output) {
            Ok(output) => output.set_value(&result.text),
            Err(e) => log::warn!("{}", e),
        }
    }
}

/// Copies the textarea's text and selection into `pane`.
pub fn read_textarea(area: &HtmlTextAreaElement, pane: &mut EditorPane) {
    let text = area.value();
    let start = area.selection_start().ok().flatten().unwrap_or(0);
    let end = area.selection_end().ok().flatten().unwrap_or(start);
    if pane.value() != text {
        pane.set_value(&text);
    }
    pane.select(byte_offset(&text, start), byte_offset(&text, end));
}

/// Copies the pane's text and selection back into the textarea.
pub fn write_textarea(area: &HtmlTextAreaElement, pane: &EditorPane) -> Result<(), XsltuiError> {
    let buffer = pane.buffer();
    let text = buffer.text();
    if area.value() != text {
        area.set_value(text);
    }
    let selection = buffer.selection().unwrap_or(buffer.cursor()..buffer.cursor());
    area.set_selection_range(utf16_offset(text, selection.start), utf16_offset(text, selection.end))
        .map_err(|e| XsltuiError::dom(crate::error::js_message(&e)))
}

pub fn hint_list(document: &Document, editor: EditorId) -> Option<Element> {
    document
        .query_selector(&format!("#{} .hints", editor))
        .ok()
        .flatten()
}

/// Fills the pane's `.hints` list with one `li[data-index]` per choice and shows it.
/// The selected entry gets the `selected` class.
pub fn show_hints(document: &Document, editor: EditorId, list: &[String], selected: usize) -> Result<(), XsltuiError> {
    let Some(popup) = hint_list(document, editor) else {
        log::debug!("No hint list for the {} pane", editor);
        return Ok(());
    };
    let dom_error = |e: wasm_bindgen::JsValue| XsltuiError::dom(crate::error::js_message(&e));
    popup.set_text_content(None);
    for (i, choice) in list.iter().enumerate() {
        let item = document.create_element("li").map_err(dom_error)?;
        item.set_text_content(Some(choice));
        item.set_attribute("data-index", &i.to_string()).map_err(dom_error)?;
        if i == selected {
            item.set_class_name("selected");
        }
        popup.append_child(&item).map_err(dom_error)?;
    }
    popup.remove_attribute("hidden").map_err(dom_error)
}

pub fn hide_hints(document: &Document, editor: EditorId) {
    if let Some(popup) = hint_list(document, editor) {
        popup.set_text_content(None);
        if let Err(e) = popup.set_attribute("hidden", "") {
            log::warn!("{}", crate::error::js_message(&e));
        }
    }
}

/// Byte offset of a UTF-16 offset, as used by textarea selections.
pub(crate) fn byte_offset(text: &str, utf16: u32) -> usize {
    let mut units = 0u32;
    for (i, c) in text.char_indices() {
        if units >= utf16 {
            return i;
        }
        units += c.len_utf16() as u32;
    }
    text.len()
}

pub(crate) fn utf16_offset(text: &str, byte: usize) -> u32 {
    text[..byte.min(text.len())].encode_utf16().count() as u32
}
