//! Formula and query text as stored in a BIM document.

use serde::Deserialize;

/// Expression text. BIM documents store long expressions either as a single
/// string or as an array of lines; both forms deserialize into one string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawExpression")]
pub struct Expression(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpression {
    Single(String),
    Lines(Vec<String>),
}

impl From<RawExpression> for Expression {
    fn from(raw: RawExpression) -> Self {
        match raw {
            RawExpression::Single(text) => Expression(text),
            RawExpression::Lines(lines) => Expression(lines.join("\n")),
        }
    }
}

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Expression(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Expression(text.to_string())
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Expression(text)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
