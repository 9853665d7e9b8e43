//! Default pane contents used until the user has saved something.

use crate::types::EditorId;

const DEFAULT_XML: &str = r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <catalog>
          <book id="bk101" year="2000">
            <author>Gambardella, Matthew</author>
            <title>XML Developer's Guide</title>
            <price>44.95</price>
          </book>
          <book id="bk102" year="2001">
            <author>Ralls, Kim</author>
            <title>Midnight Rain</title>
            <price>5.95</price>
          </book>
          <book id="bk103" year="2000">
            <author>Corets, Eva</author>
            <title>Maeve Ascendant</title>
            <price>5.95</price>
          </book>
        </catalog>
    "#;

const DEFAULT_XSLT: &str = r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
          <xsl:output method="html" indent="yes"/>

          <xsl:template match="/catalog">
            <table>
              <tr><th>Title</th><th>Author</th><th>Price</th></tr>
              <xsl:apply-templates select="book">
                <xsl:sort select="title"/>
              </xsl:apply-templates>
            </table>
          </xsl:template>

          <xsl:template match="book">
            <tr id="{@id}">
              <td><xsl:value-of select="title"/></td>
              <td><xsl:value-of select="author"/></td>
              <td><xsl:value-of select="format-number(price, '0.00')"/></td>
            </tr>
          </xsl:template>
        </xsl:stylesheet>
    "#;

/// The raw, still indented, built-in template of a pane. The output pane has none.
pub fn template_for(editor: EditorId) -> &'static str {
    match editor {
        EditorId::Xml => DEFAULT_XML,
        EditorId::Xslt => DEFAULT_XSLT,
        EditorId::Output => "",
    }
}

/// The built-in default content of a pane, de-indented.
pub fn default_document(editor: EditorId) -> String {
    normalize_template(template_for(editor))
}

/// Trims an inline template and strips the indentation of its last line.
///
/// Every occurrence of the last line's leading whitespace is removed, including
/// occurrences in the middle of a line.
pub fn normalize_template(text: &str) -> String {
    let trimmed = text.trim();
    let last_line = trimmed
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("");
    let indent_len = last_line.len() - last_line.trim_start().len();
    let indent = &last_line[..indent_len];
    if indent.is_empty() {
        trimmed.to_string()
    } else {
        trimmed.replace(indent, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_last_line_indent_from_every_line() {
        let template = "\n    <a>\n      <b/>\n    </a>\n";
        assert_eq!(normalize_template(template), "<a>\n  <b/>\n</a>");
    }

    #[test]
    fn test_unindented_template_is_only_trimmed() {
        assert_eq!(normalize_template("  <a>\n<b/>\n</a>\n\n"), "<a>\n<b/>\n</a>");
        assert_eq!(normalize_template(""), "");
        assert_eq!(normalize_template("   \n  "), "");
    }

    #[test]
    fn test_crlf_runs_count_as_one_break() {
        assert_eq!(normalize_template("<a>\r\n\r\n  <b/>\r\n  </a>"), "<a>\r\n\r\n<b/>\r\n</a>");
    }

    #[test]
    fn test_indent_removed_mid_line() {
        assert_eq!(normalize_template("<a>x    y</a>\n    </a>"), "<a>xy</a>\n</a>");
    }

    #[test]
    fn test_builtin_defaults_start_at_column_zero() {
        let xslt = default_document(EditorId::Xslt);
        assert!(xslt.starts_with("<?xml"));
        assert!(xslt.contains("\n<xsl:stylesheet"));
        assert!(xslt.contains("\n  <xsl:output method=\"html\""));
        assert!(default_document(EditorId::Xml).ends_with("\n</catalog>"));
        assert_eq!(default_document(EditorId::Output), "");
    }
}
