//! Bracket and tag auto-closing, plus the small tag scanner it is built on.

use crate::buffer::TextBuffer;

const BRACKET_PAIRS: [(char, char); 5] = [('(', ')'), ('[', ']'), ('{', '}'), ('"', '"'), ('\'', '\'')];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoClose {
    pub tags: bool,
    pub brackets: bool,
}

fn closer_for(c: char) -> Option<char> {
    BRACKET_PAIRS.iter().find(|(open, _)| *open == c).map(|(_, close)| *close)
}

fn is_closer(c: char) -> bool {
    BRACKET_PAIRS.iter().any(|(_, close)| *close == c)
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.')
}

/// The element name at the start of a tag's inner text.
pub(crate) fn tag_name(inner: &str) -> &str {
    let end = inner.find(|c: char| !is_name_char(c)).unwrap_or(inner.len());
    &inner[..end]
}

/// The quote character left open at the end of `tag_text`, if any.
pub(crate) fn open_quote(tag_text: &str) -> Option<char> {
    let mut quote = None;
    for c in tag_text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            None if c == '"' || c == '\'' => quote = Some(c),
            _ => {}
        }
    }
    quote
}

/// Index of the `>` closing the tag that starts at `s[0]`, ignoring quoted `>`.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

/// The text after the last `<` when `before` ends inside an unfinished tag.
pub(crate) fn open_tag_text(before: &str) -> Option<(usize, &str)> {
    let lt = before.rfind('<')?;
    let tag = &before[lt + 1..];
    match tag_end(tag) {
        Some(_) => None,
        None => Some((lt, tag)),
    }
}

/// Names of the elements left open at the end of `text`, outermost first.
pub(crate) fn open_elements(text: &str) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(lt) = rest.find('<') {
        let after = &rest[lt..];
        let skip_past = |prefix: &str, terminator: &str| {
            after[prefix.len()..]
                .find(terminator)
                .map(|i| prefix.len() + i + terminator.len())
        };
        let consumed = if after.starts_with("<!--") {
            skip_past("<!--", "-->")
        } else if after.starts_with("<![CDATA[") {
            skip_past("<![CDATA[", "]]>")
        } else if after.starts_with("<?") {
            skip_past("<?", "?>")
        } else if after.starts_with("<!") {
            skip_past("<!", ">")
        } else {
            tag_end(after).map(|end| {
                let inner = &after[1..end];
                if let Some(closing) = inner.strip_prefix('/') {
                    let name = closing.trim();
                    if let Some(pos) = stack.iter().rposition(|open| open == name) {
                        stack.truncate(pos);
                    }
                } else if !inner.trim_end().ends_with('/') {
                    let name = tag_name(inner);
                    if !name.is_empty() {
                        stack.push(name.to_string());
                    }
                }
                end + 1
            })
        };
        let Some(consumed) = consumed else {
            break;
        };
        rest = &after[consumed..];
    }
    stack
}

/// The name of the opening tag a `>` typed at the end of `before` would finish.
fn finished_open_tag(before: &str) -> Option<&str> {
    let (_, tag) = open_tag_text(before)?;
    if tag.starts_with(['/', '!', '?']) || open_quote(tag).is_some() || tag.trim_end().ends_with('/') {
        return None;
    }
    Some(tag_name(tag)).filter(|name| !name.is_empty())
}

/// Types `c` at the cursor, applying the enabled auto-close behaviours.
pub fn type_char(buffer: &mut TextBuffer, c: char, options: AutoClose) {
    let mut utf8 = [0u8; 4];
    let typed: &str = c.encode_utf8(&mut utf8);

    if options.brackets && !buffer.has_selection() && is_closer(c) && buffer.char_after() == Some(c) {
        buffer.step_over();
        return;
    }

    if options.tags && !buffer.has_selection() {
        let before = buffer.text_before_cursor();
        match c {
            '>' => {
                if let Some(name) = finished_open_tag(before) {
                    let closing = format!("</{}>", name);
                    buffer.replace_selection(typed);
                    buffer.insert_after_cursor(&closing);
                    return;
                }
            }
            '/' if buffer.char_before() == Some('<') => {
                let outer = &before[..before.len() - 1];
                if let Some(name) = open_elements(outer).pop() {
                    buffer.replace_selection(&format!("/{}>", name));
                    return;
                }
            }
            _ => {}
        }
    }

    if options.brackets {
        if let Some(close) = closer_for(c) {
            if buffer.has_selection() {
                let wrapped = format!("{}{}{}", c, buffer.selected_text(), close);
                buffer.replace_selection(&wrapped);
                return;
            }
            let after_word = buffer.char_before().is_some_and(char::is_alphanumeric);
            if !(c == close && after_word) {
                buffer.replace_selection(typed);
                let mut close_utf8 = [0u8; 4];
                buffer.insert_after_cursor(close.encode_utf8(&mut close_utf8));
                return;
            }
        }
    }

    buffer.replace_selection(typed);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: AutoClose = AutoClose {
        tags: true,
        brackets: true,
    };

    fn typed(start: &str, chars: &str) -> (String, usize) {
        let mut buffer = TextBuffer::new(start);
        for c in chars.chars() {
            type_char(&mut buffer, c, ALL);
        }
        (buffer.text().to_string(), buffer.cursor())
    }

    #[test]
    fn test_brackets_pair_and_step_over() {
        assert_eq!(typed("", "("), ("()".to_string(), 1));
        assert_eq!(typed("", "()"), ("()".to_string(), 2));
        assert_eq!(typed("a=", "\"x\""), ("a=\"x\"".to_string(), 5));
        // No pairing of a quote straight after a word character.
        assert_eq!(typed("don", "'"), ("don'".to_string(), 4));
    }

    #[test]
    fn test_selection_is_wrapped() {
        let mut buffer = TextBuffer::new("value");
        buffer.select(0, 5);
        type_char(&mut buffer, '[', ALL);
        assert_eq!(buffer.text(), "[value]");
    }

    #[test]
    fn test_closing_tag_inserted_after_cursor() {
        assert_eq!(typed("<root", ">"), ("<root></root>".to_string(), 6));
        assert_eq!(typed("<a href='x>y'", ">"), ("<a href='x>y'></a>".to_string(), 14));
        for start in ["<br/", "<?xml version='1.0'?", "<!DOCTYPE html", "</a", "a > b"] {
            let (text, _) = typed(start, ">");
            assert_eq!(text, format!("{}>", start), "{} should not auto-close", start);
        }
    }

    #[test]
    fn test_slash_completes_innermost_open_element() {
        let (text, cursor) = typed("<a><b/><!-- <c> --><d></d><e x='<f>'>text<", "/");
        assert_eq!(text, "<a><b/><!-- <c> --><d></d><e x='<f>'>text</e>");
        assert_eq!(cursor, text.len());
        assert_eq!(typed("plain <", "/").0, "plain </");
    }

    #[test]
    fn test_open_elements_tracks_nesting() {
        assert_eq!(
            open_elements("<?xml version='1.0'?><x:a><b><![CDATA[<z>]]></b><c>"),
            vec!["x:a".to_string(), "c".to_string()]
        );
        assert!(open_elements("<a></a>").is_empty());
    }

    #[test]
    fn test_disabled_options_insert_plainly() {
        let mut buffer = TextBuffer::new("<a");
        let off = AutoClose {
            tags: false,
            brackets: false,
        };
        type_char(&mut buffer, '>', off);
        type_char(&mut buffer, '(', off);
        assert_eq!(buffer.text(), "<a>(");
    }
}
