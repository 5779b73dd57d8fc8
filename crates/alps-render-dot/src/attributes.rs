//! DOT attribute lists and escaping.
//!
//! Every value that reaches the output goes through one of the escape
//! functions here; callers never splice raw text.

use std::fmt::{self, Write};

/// Value of a DOT attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Emitted as a double-quoted string, escaped.
    Quoted(String),
    /// Emitted between `<` and `>` as an HTML-like label. Must already be
    /// built from escaped parts.
    Html(String),
    Number(f32),
    /// Emitted verbatim. Only for fixed keywords such as `box` or `t`.
    Keyword(&'static str),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quoted(s) => write!(f, "\"{}\"", escape_dot_string(s)),
            Self::Html(s) => write!(f, "<{s}>"),
            Self::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{n:.0}")
                } else {
                    write!(f, "{n:.1}")
                }
            }
            Self::Keyword(k) => f.write_str(k),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Quoted(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Quoted(s)
    }
}

impl From<f32> for AttributeValue {
    fn from(n: f32) -> Self {
        Self::Number(n)
    }
}

/// Ordered attribute list, rendered as `[a="x", b=<...>]`.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    attrs: Vec<(&'static str, AttributeValue)>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a quoted attribute. Names may repeat; the renderer keeps order.
    #[must_use]
    pub fn set(mut self, name: &'static str, value: impl Into<AttributeValue>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    /// Appends an HTML-like label value, rendered between `<` and `>`.
    #[must_use]
    pub fn html(self, name: &'static str, value: String) -> Self {
        self.set(name, AttributeValue::Html(value))
    }

    /// Appends a bare keyword such as `box` or `LR`.
    #[must_use]
    pub fn keyword(self, name: &'static str, value: &'static str) -> Self {
        self.set(name, AttributeValue::Keyword(value))
    }

    /// First value set under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Renders the bracketed list, or an empty string when there is nothing to set.
    #[must_use]
    pub fn render(&self) -> String {
        if self.attrs.is_empty() {
            return String::new();
        }
        let mut result = String::from(" [");
        for (index, (name, value)) in self.attrs.iter().enumerate() {
            if index > 0 {
                result.push_str(", ");
            }
            let _ = write!(result, "{name}={value}");
        }
        result.push(']');
        result
    }
}

/// Escape text for a double-quoted DOT string.
#[must_use]
pub fn escape_dot_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => {}
            _ => result.push(c),
        }
    }
    result
}

/// Escape text for an HTML-like DOT label.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\n' => result.push_str("<br/>"),
            '\r' => {}
            _ => result.push(c),
        }
    }
    result
}

const KEYWORDS: &[&str] = &["node", "edge", "graph", "digraph", "subgraph", "strict"];

/// Node or graph identifier: bare when it is a plain DOT identifier, quoted
/// and escaped otherwise.
#[must_use]
pub fn dot_id(id: &str) -> String {
    let mut chars = id.chars();
    let plain = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(id));
    if plain {
        id.to_string()
    } else {
        format!("\"{}\"", escape_dot_string(id))
    }
}
