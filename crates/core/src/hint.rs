//! Schema-driven tag and attribute hints for the stylesheet pane.

use crate::autoclose::{is_name_char, open_elements, open_quote, open_tag_text, tag_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use web_time::Instant;

/// What the schema knows about one element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Attribute names, each with its allowed values when they form a closed list.
    #[serde(default)]
    pub attrs: BTreeMap<String, Option<Vec<String>>>,
    /// Allowed child elements. `None` means unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

/// Element and attribute vocabulary, in the `{"!top": [...], "name": {attrs, children}}`
/// layout used by editor hint schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintSchema {
    /// Elements allowed at document level.
    #[serde(rename = "!top", default)]
    pub top: Vec<String>,
    #[serde(flatten)]
    pub elements: BTreeMap<String, ElementInfo>,
}

enum Content {
    /// Template content, optionally preceded by extra allowed elements.
    Instructions(&'static [&'static str]),
    TopLevel,
    Only(&'static [&'static str]),
    Empty,
}

const YES_NO: &[&str] = &["yes", "no"];
const NONE: &[&str] = &[];

const INSTRUCTIONS: &[&str] = &[
    "xsl:apply-imports",
    "xsl:apply-templates",
    "xsl:attribute",
    "xsl:call-template",
    "xsl:choose",
    "xsl:comment",
    "xsl:copy",
    "xsl:copy-of",
    "xsl:element",
    "xsl:fallback",
    "xsl:for-each",
    "xsl:if",
    "xsl:message",
    "xsl:number",
    "xsl:processing-instruction",
    "xsl:text",
    "xsl:value-of",
    "xsl:variable",
];

const TOP_LEVEL: &[&str] = &[
    "xsl:attribute-set",
    "xsl:decimal-format",
    "xsl:import",
    "xsl:include",
    "xsl:key",
    "xsl:namespace-alias",
    "xsl:output",
    "xsl:param",
    "xsl:preserve-space",
    "xsl:strip-space",
    "xsl:template",
    "xsl:variable",
];

type AttrDefs = &'static [(&'static str, &'static [&'static str])];

const STYLESHEET_ATTRS: AttrDefs = &[
    ("version", &["1.0"]),
    ("id", NONE),
    ("extension-element-prefixes", NONE),
    ("exclude-result-prefixes", NONE),
    ("xmlns:xsl", &["http://www.w3.org/1999/XSL/Transform"]),
];

const XSLT_ELEMENTS: &[(&str, AttrDefs, Content)] = &[
    ("xsl:stylesheet", STYLESHEET_ATTRS, Content::TopLevel),
    ("xsl:transform", STYLESHEET_ATTRS, Content::TopLevel),
    ("xsl:import", &[("href", NONE)], Content::Empty),
    ("xsl:include", &[("href", NONE)], Content::Empty),
    ("xsl:strip-space", &[("elements", NONE)], Content::Empty),
    ("xsl:preserve-space", &[("elements", NONE)], Content::Empty),
    (
        "xsl:output",
        &[
            ("method", &["xml", "html", "text"]),
            ("version", NONE),
            ("encoding", NONE),
            ("omit-xml-declaration", YES_NO),
            ("standalone", YES_NO),
            ("doctype-public", NONE),
            ("doctype-system", NONE),
            ("cdata-section-elements", NONE),
            ("indent", YES_NO),
            ("media-type", NONE),
        ],
        Content::Empty,
    ),
    ("xsl:key", &[("name", NONE), ("match", NONE), ("use", NONE)], Content::Empty),
    (
        "xsl:decimal-format",
        &[
            ("name", NONE),
            ("decimal-separator", NONE),
            ("grouping-separator", NONE),
            ("infinity", NONE),
            ("minus-sign", NONE),
            ("NaN", NONE),
            ("percent", NONE),
            ("per-mille", NONE),
            ("zero-digit", NONE),
            ("digit", NONE),
            ("pattern-separator", NONE),
        ],
        Content::Empty,
    ),
    (
        "xsl:namespace-alias",
        &[("stylesheet-prefix", NONE), ("result-prefix", NONE)],
        Content::Empty,
    ),
    (
        "xsl:template",
        &[("match", NONE), ("name", NONE), ("priority", NONE), ("mode", NONE)],
        Content::Instructions(&["xsl:param"]),
    ),
    ("xsl:value-of", &[("select", NONE), ("disable-output-escaping", YES_NO)], Content::Empty),
    ("xsl:copy-of", &[("select", NONE)], Content::Empty),
    ("xsl:number", &[
        ("level", &["single", "multiple", "any"]),
        ("count", NONE),
        ("from", NONE),
        ("value", NONE),
        ("format", NONE),
        ("lang", NONE),
        ("letter-value", &["alphabetic", "traditional"]),
        ("grouping-separator", NONE),
        ("grouping-size", NONE),
    ], Content::Empty),
    (
        "xsl:apply-templates",
        &[("select", NONE), ("mode", NONE)],
        Content::Only(&["xsl:sort", "xsl:with-param"]),
    ),
    ("xsl:apply-imports", &[], Content::Empty),
    ("xsl:for-each", &[("select", NONE)], Content::Instructions(&["xsl:sort"])),
    (
        "xsl:sort",
        &[
            ("select", NONE),
            ("lang", NONE),
            ("data-type", &["text", "number"]),
            ("order", &["ascending", "descending"]),
            ("case-order", &["upper-first", "lower-first"]),
        ],
        Content::Empty,
    ),
    ("xsl:if", &[("test", NONE)], Content::Instructions(&[])),
    ("xsl:choose", &[], Content::Only(&["xsl:when", "xsl:otherwise"])),
    ("xsl:when", &[("test", NONE)], Content::Instructions(&[])),
    ("xsl:otherwise", &[], Content::Instructions(&[])),
    ("xsl:attribute-set", &[("name", NONE), ("use-attribute-sets", NONE)], Content::Only(&["xsl:attribute"])),
    ("xsl:call-template", &[("name", NONE)], Content::Only(&["xsl:with-param"])),
    ("xsl:with-param", &[("name", NONE), ("select", NONE)], Content::Instructions(&[])),
    ("xsl:variable", &[("name", NONE), ("select", NONE)], Content::Instructions(&[])),
    ("xsl:param", &[("name", NONE), ("select", NONE)], Content::Instructions(&[])),
    ("xsl:text", &[("disable-output-escaping", YES_NO)], Content::Empty),
    ("xsl:processing-instruction", &[("name", NONE)], Content::Instructions(&[])),
    (
        "xsl:element",
        &[("name", NONE), ("namespace", NONE), ("use-attribute-sets", NONE)],
        Content::Instructions(&[]),
    ),
    ("xsl:attribute", &[("name", NONE), ("namespace", NONE)], Content::Instructions(&[])),
    ("xsl:comment", &[], Content::Instructions(&[])),
    ("xsl:copy", &[("use-attribute-sets", NONE)], Content::Instructions(&[])),
    ("xsl:message", &[("terminate", YES_NO)], Content::Instructions(&[])),
    ("xsl:fallback", &[], Content::Instructions(&[])),
];

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl HintSchema {
    /// The XSLT 1.0 vocabulary.
    pub fn xslt() -> Self {
        let elements = XSLT_ELEMENTS
            .iter()
            .map(|(name, attrs, content)| {
                let attrs = attrs
                    .iter()
                    .map(|(attr, values)| {
                        let values = (!values.is_empty()).then(|| owned(values));
                        (attr.to_string(), values)
                    })
                    .collect();
                let children = match content {
                    Content::Instructions(extra) => {
                        let mut children = owned(extra);
                        children.extend(owned(INSTRUCTIONS));
                        Some(children)
                    }
                    Content::TopLevel => Some(owned(TOP_LEVEL)),
                    Content::Only(names) => Some(owned(names)),
                    Content::Empty => Some(Vec::new()),
                };
                (name.to_string(), ElementInfo { attrs, children })
            })
            .collect();
        HintSchema {
            top: owned(&["xsl:stylesheet", "xsl:transform"]),
            elements,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether `tag`, or attribute `attr` of `tag`, belongs to the schema.
    pub fn is_builtin(&self, tag: &str, attr: Option<&str>) -> bool {
        match (self.elements.get(tag), attr) {
            (Some(info), Some(attr)) => info.attrs.contains_key(attr),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Completions for the text before the cursor, or `None` when nothing applies.
    pub fn suggest(&self, before: &str) -> Option<Suggestions> {
        let context = completion_context(before)?;
        let suggestions = self.suggestions(&context, before.len());
        (!suggestions.list.is_empty()).then_some(suggestions)
    }

    pub fn suggestions(&self, context: &CompletionContext, cursor: usize) -> Suggestions {
        let list = match context {
            CompletionContext::TagName { prefix, parent, .. } => {
                let allowed = match parent {
                    Some(parent) => self.elements.get(parent).and_then(|info| info.children.as_ref()),
                    None => Some(&self.top),
                };
                let names: Vec<&String> = match allowed {
                    Some(names) => names.iter().collect(),
                    None => self.elements.keys().collect(),
                };
                names
                    .into_iter()
                    .filter(|name| name.starts_with(prefix.as_str()))
                    .map(|name| format!("<{}", name))
                    .collect()
            }
            CompletionContext::CloseTag { name, .. } => vec![format!("</{}>", name)],
            CompletionContext::AttributeName {
                tag, prefix, used, ..
            } => self
                .elements
                .get(tag)
                .map(|info| {
                    info.attrs
                        .keys()
                        .filter(|attr| attr.starts_with(prefix.as_str()) && !used.contains(attr))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            CompletionContext::AttributeValue { tag, attribute, .. } => self
                .elements
                .get(tag)
                .and_then(|info| info.attrs.get(attribute))
                .and_then(Option::as_ref)
                .map(|values| values.iter().map(|v| format!("\"{}\"", v)).collect())
                .unwrap_or_default(),
        };
        Suggestions {
            from: context.from(),
            to: cursor,
            list,
        }
    }
}

/// Replacement candidates for the text between `from` and `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestions {
    pub from: usize,
    pub to: usize,
    pub list: Vec<String>,
}

/// Where in the markup the cursor is, as far as completion cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Right after `<` or inside an element name.
    TagName {
        from: usize,
        prefix: String,
        parent: Option<String>,
    },
    /// Right after `</`.
    CloseTag { from: usize, name: String },
    /// After whitespace inside an opening tag.
    AttributeName {
        from: usize,
        tag: String,
        prefix: String,
        used: Vec<String>,
    },
    /// Right after `name=` inside an opening tag.
    AttributeValue {
        from: usize,
        tag: String,
        attribute: String,
    },
}

impl CompletionContext {
    pub fn from(&self) -> usize {
        match self {
            CompletionContext::TagName { from, .. }
            | CompletionContext::CloseTag { from, .. }
            | CompletionContext::AttributeName { from, .. }
            | CompletionContext::AttributeValue { from, .. } => *from,
        }
    }
}

/// Names of the `name="value"` pairs in the attribute part of a tag.
fn attribute_names(mut rest: &str) -> Vec<String> {
    let mut names = Vec::new();
    loop {
        rest = rest.trim_start();
        let name = tag_name(rest);
        if name.is_empty() {
            break;
        }
        names.push(name.to_string());
        rest = rest[name.len()..].trim_start();
        let Some(value) = rest.strip_prefix('=') else {
            continue;
        };
        let value = value.trim_start();
        let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            break;
        };
        match value[1..].find(quote) {
            Some(end) => rest = &value[end + 2..],
            None => break,
        }
    }
    names
}

/// Classifies the cursor position. Returns `None` outside tags and inside an
/// unfinished attribute string.
pub fn completion_context(before: &str) -> Option<CompletionContext> {
    let (lt, tag) = open_tag_text(before)?;

    if let Some(closing) = tag.strip_prefix('/') {
        if closing.contains(char::is_whitespace) {
            return None;
        }
        let name = open_elements(&before[..lt]).pop()?;
        return Some(CompletionContext::CloseTag { from: lt, name });
    }
    if tag.starts_with(['!', '?']) || open_quote(tag).is_some() {
        return None;
    }

    let name = tag_name(tag);
    if name.len() == tag.len() {
        return Some(CompletionContext::TagName {
            from: lt,
            prefix: name.to_string(),
            parent: open_elements(&before[..lt]).pop(),
        });
    }
    let rest = &tag[name.len()..];
    if name.is_empty() || !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let trimmed = rest.trim_end();
    if let Some(before_eq) = trimmed.strip_suffix('=') {
        let before_eq = before_eq.trim_end();
        let start = before_eq
            .rfind(|c: char| !is_name_char(c))
            .map_or(0, |i| i + 1);
        let attribute = &before_eq[start..];
        if attribute.is_empty() {
            return None;
        }
        return Some(CompletionContext::AttributeValue {
            from: before.len(),
            tag: name.to_string(),
            attribute: attribute.to_string(),
        });
    }

    let partial_start = rest
        .rfind(|c: char| !is_name_char(c))
        .map_or(0, |i| i + 1);
    if !rest[..partial_start].ends_with(char::is_whitespace) {
        return None;
    }
    let prefix = &rest[partial_start..];
    Some(CompletionContext::AttributeName {
        from: before.len() - prefix.len(),
        tag: name.to_string(),
        prefix: prefix.to_string(),
        used: attribute_names(&rest[..partial_start]),
    })
}

/// Whether typing `c` after `before` should schedule a hint request.
pub fn is_trigger(c: char, before: &str) -> bool {
    match c {
        '<' => true,
        '/' => before.ends_with('<'),
        ' ' | '=' => open_tag_text(before).is_some_and(|(_, tag)| {
            !tag_name(tag).is_empty() && open_quote(tag).is_none()
        }),
        _ => false,
    }
}

/// Defers hint requests by a fixed delay, keeping at most one pending.
#[derive(Debug, Clone)]
pub struct HintScheduler {
    delay: Duration,
    due: Option<Instant>,
    completion_active: bool,
}

impl HintScheduler {
    pub fn new(delay: Duration) -> Self {
        HintScheduler {
            delay,
            due: None,
            completion_active: false,
        }
    }

    /// Schedules a request `delay` after `now`, replacing any pending one.
    pub fn schedule(&mut self, now: Instant) {
        if self.due.replace(now + self.delay).is_some() {
            log::trace!("Replacing pending hint request");
        }
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Marks whether a completion popup is currently open.
    pub fn set_completion_active(&mut self, active: bool) {
        self.completion_active = active;
    }

    pub fn is_completion_active(&self) -> bool {
        self.completion_active
    }

    /// Consumes the pending request if it is due. Returns `true` if a hint should be shown.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                !self.completion_active
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">"#;

    #[test]
    fn test_is_builtin() {
        let schema = HintSchema::xslt();
        assert!(schema.is_builtin("xsl:template", None));
        assert!(schema.is_builtin("xsl:template", Some("match")));
        assert!(!schema.is_builtin("xsl:template", Some("select")));
        assert!(!schema.is_builtin("table", None));
    }

    #[test]
    fn test_tag_names_follow_parent() {
        let schema = HintSchema::xslt();
        let before = format!("{}<xsl:template match=\"/\"><xsl:ch", OPEN);
        let suggestions = schema.suggest(&before).unwrap();
        assert_eq!(suggestions.list, vec!["<xsl:choose".to_string()]);
        assert_eq!(suggestions.from, before.rfind('<').unwrap());
        assert_eq!(suggestions.to, before.len());

        let top = schema.suggest(&format!("{}<xsl:o", OPEN)).unwrap();
        assert_eq!(top.list, vec!["<xsl:output".to_string()]);
        assert_eq!(schema.suggest("<").unwrap().list.len(), 2);

        let inside_choose = schema.suggest(&format!("{}<xsl:template name=\"t\"><xsl:choose><", OPEN)).unwrap();
        assert_eq!(inside_choose.list, vec!["<xsl:when".to_string(), "<xsl:otherwise".to_string()]);
    }

    #[test]
    fn test_unknown_parent_offers_every_element() {
        let schema = HintSchema::xslt();
        let list = schema.suggest("<table><xsl:value").unwrap().list;
        assert_eq!(list, vec!["<xsl:value-of".to_string()]);
    }

    #[test]
    fn test_close_tag() {
        let schema = HintSchema::xslt();
        let suggestions = schema.suggest("<xsl:template match=\"a\"><b></b></").unwrap();
        assert_eq!(suggestions.list, vec!["</xsl:template>".to_string()]);
    }

    #[test]
    fn test_attribute_names_skip_used() {
        let schema = HintSchema::xslt();
        let before = "<xsl:template match=\"a\" m";
        let context = completion_context(before).unwrap();
        assert_eq!(
            context,
            CompletionContext::AttributeName {
                from: before.len() - 1,
                tag: "xsl:template".into(),
                prefix: "m".into(),
                used: vec!["match".into()],
            }
        );
        assert_eq!(schema.suggestions(&context, before.len()).list, vec!["mode".to_string()]);
    }

    #[test]
    fn test_attribute_values() {
        let schema = HintSchema::xslt();
        let list = schema.suggest("<xsl:output method=").unwrap().list;
        assert_eq!(list, vec!["\"xml\"", "\"html\"", "\"text\""]);
        assert!(schema.suggest("<xsl:template match=").is_none());
    }

    #[test]
    fn test_no_context_in_strings_or_content() {
        assert_eq!(completion_context("<a href=\"x"), None);
        assert_eq!(completion_context("<a>text"), None);
        assert_eq!(completion_context("<!-- "), None);
        assert_eq!(completion_context("<a x=\"1\"y"), None);
        assert!(matches!(
            completion_context("<a x=\"1\" "),
            Some(CompletionContext::AttributeName { .. })
        ));
    }

    #[test]
    fn test_triggers() {
        assert!(is_trigger('<', "text"));
        assert!(is_trigger('/', "<a><"));
        assert!(!is_trigger('/', "<a"));
        assert!(is_trigger(' ', "<xsl:template"));
        assert!(is_trigger('=', "<xsl:template match"));
        assert!(!is_trigger(' ', "<a title=\"x"));
        assert!(!is_trigger(' ', "<a>"));
        assert!(!is_trigger('a', "<"));
    }

    #[test]
    fn test_rapid_keystrokes_fire_once() {
        let start = Instant::now();
        let delay = Duration::from_millis(100);
        let mut scheduler = HintScheduler::new(delay);
        for i in 0..5 {
            scheduler.schedule(start + Duration::from_millis(i * 10));
        }
        assert!(!scheduler.poll(start + Duration::from_millis(120)));
        assert!(scheduler.poll(start + Duration::from_millis(140)));
        assert!(!scheduler.poll(start + Duration::from_millis(500)));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_no_hint_while_completion_active() {
        let start = Instant::now();
        let mut scheduler = HintScheduler::new(Duration::from_millis(100));
        scheduler.set_completion_active(true);
        scheduler.schedule(start);
        assert!(!scheduler.poll(start + Duration::from_millis(100)));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_schema_json_layout() {
        let schema = HintSchema::from_json(
            r#"{ "!top": ["root"], "root": { "attrs": { "lang": ["en", "fr"] }, "children": ["item"] }, "item": {} }"#,
        )
        .unwrap();
        assert!(schema.is_builtin("root", Some("lang")));
        assert_eq!(schema.suggest("<root lang=").unwrap().list, vec!["\"en\"", "\"fr\""]);
        assert_eq!(schema.suggest("<root><").unwrap().list, vec!["<item"]);
    }
}
