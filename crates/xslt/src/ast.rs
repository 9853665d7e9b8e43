//! The compiled form of an XSLT 1.0 stylesheet.

use crate::pattern::Pattern;
use std::collections::HashMap;
use xsltui_xpath1::{Expression, NamespaceBindings};

pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

/// Represents a pre-compiled, executable block of XSLT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparsedTemplate(pub Vec<XsltInstruction>);

#[derive(Debug, Clone, PartialEq)]
pub enum AvtPart {
    Static(String),
    Dynamic(Expression),
}

/// An attribute value template such as `item-{@id}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValueTemplate {
    Static(String),
    Dynamic(Vec<AvtPart>),
}

/// How a variable, parameter or `with-param` obtains its value.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Select(Expression),
    /// A result tree fragment built from the element's content.
    Content(PreparsedTemplate),
    /// No `select` and no content: the empty string.
    Empty,
}

/// Represents a parameter passed to a template.
#[derive(Debug, Clone, PartialEq)]
pub struct WithParam {
    pub name: String,
    pub value: VariableValue,
}

/// A declared `<xsl:param>` of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default_value: VariableValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDataType {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub select: Expression,
    pub order: SortOrder,
    pub data_type: SortDataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct When {
    pub test: Expression,
    pub body: PreparsedTemplate,
}

/// An attribute written literally on a result element.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralAttribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: AttributeValueTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLevel {
    Single,
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberSpec {
    pub value: Option<Expression>,
    pub level: NumberLevel,
    pub count: Option<Pattern>,
    pub from: Option<Pattern>,
    pub format: AttributeValueTemplate,
}

/// An instruction in a pre-parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum XsltInstruction {
    /// Literal text from the stylesheet or from `xsl:text`.
    Text {
        text: String,
        disable_escaping: bool,
    },
    /// A literal result element such as `<li class="{@kind}">`.
    LiteralElement {
        name: String,
        namespace: Option<String>,
        attributes: Vec<LiteralAttribute>,
        /// Namespace declarations copied to the result element.
        namespaces: Vec<(String, String)>,
        body: PreparsedTemplate,
    },
    ValueOf {
        select: Expression,
        disable_escaping: bool,
    },
    CopyOf {
        select: Expression,
    },
    Copy {
        body: PreparsedTemplate,
    },
    If {
        test: Expression,
        body: PreparsedTemplate,
    },
    Choose {
        whens: Vec<When>,
        otherwise: Option<PreparsedTemplate>,
    },
    ForEach {
        select: Expression,
        sort_keys: Vec<SortKey>,
        body: PreparsedTemplate,
    },
    /// An `apply-templates` instruction, the core of the push model.
    ApplyTemplates {
        select: Option<Expression>,
        mode: Option<String>,
        sort_keys: Vec<SortKey>,
        params: Vec<WithParam>,
    },
    CallTemplate {
        name: String,
        params: Vec<WithParam>,
    },
    Variable {
        name: String,
        value: VariableValue,
    },
    Element {
        name: AttributeValueTemplate,
        namespace: Option<AttributeValueTemplate>,
        body: PreparsedTemplate,
    },
    Attribute {
        name: AttributeValueTemplate,
        namespace: Option<AttributeValueTemplate>,
        body: PreparsedTemplate,
    },
    Comment {
        body: PreparsedTemplate,
    },
    ProcessingInstruction {
        name: AttributeValueTemplate,
        body: PreparsedTemplate,
    },
    Number(Box<NumberSpec>),
    Message {
        body: PreparsedTemplate,
        terminate: bool,
    },
}

/// Represents a single compiled `<xsl:template match="...">` rule.
/// Union patterns are split into one rule per alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRule {
    pub pattern: Pattern,
    pub priority: f64,
    pub mode: Option<String>,
    /// Declaration order; later rules win ties.
    pub position: usize,
    pub params: Vec<Param>,
    pub body: PreparsedTemplate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTemplate {
    pub params: Vec<Param>,
    pub body: PreparsedTemplate,
}

/// A top-level `xsl:variable` or `xsl:param`.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariable {
    pub name: String,
    pub value: VariableValue,
    pub is_param: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyDefinition {
    pub name: String,
    pub pattern: Pattern,
    pub use_expr: Expression,
}

/// The serialization method requested by `xsl:output`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMethod {
    #[default]
    Xml,
    Html,
    Text,
    /// Any other method name; serialized as XML.
    Other(String),
}

impl OutputMethod {
    pub fn parse(method: &str) -> Self {
        match method {
            "xml" => OutputMethod::Xml,
            "html" => OutputMethod::Html,
            "text" => OutputMethod::Text,
            other => OutputMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OutputMethod::Xml => "xml",
            OutputMethod::Html => "html",
            OutputMethod::Text => "text",
            OutputMethod::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputSettings {
    pub method: OutputMethod,
    /// Whether the stylesheet declared the method explicitly.
    pub method_declared: bool,
    pub indent: bool,
    pub omit_xml_declaration: bool,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
    pub doctype_public: Option<String>,
    pub doctype_system: Option<String>,
}

/// A name test from `xsl:strip-space` / `xsl:preserve-space`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceTest {
    Any,
    Namespace(String),
    Name {
        namespace: Option<String>,
        local: String,
    },
}

/// The complete output of the XSLT compiler.
#[derive(Debug, Clone, Default)]
pub struct CompiledStylesheet {
    /// All match-based template rules, grouped by mode and sorted best-first.
    pub template_rules: HashMap<Option<String>, Vec<TemplateRule>>,
    /// All named templates, for use with `<xsl:call-template>`.
    pub named_templates: HashMap<String, NamedTemplate>,
    pub global_variables: Vec<GlobalVariable>,
    pub keys: Vec<KeyDefinition>,
    pub output: OutputSettings,
    pub strip_space: Vec<SpaceTest>,
    pub preserve_space: Vec<SpaceTest>,
    /// Prefixes available to XPath expressions and patterns.
    pub namespaces: NamespaceBindings,
}
