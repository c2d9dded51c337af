//! Log message values and normalization into printable lines.
//!
//! A single logging call may carry plain text, lists, key/value mappings or
//! any other displayable value. [`normalize`] flattens them into the ordered
//! list of lines that are emitted one record each:
//!
//! - lists become one `- <item>` line per element
//! - mappings become one `- <key>: <value>` line per pair
//! - text is kept whole, or split on line breaks when requested
//! - anything else is rendered through `Display`
//!
//! Empty lines never survive normalization.

use crate::Result;
use std::collections::BTreeMap;
use std::fmt;

/// One argument of a logging call
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Text(String),
    List(Vec<Message>),
    /// Key/value pairs in insertion order
    Map(Vec<(String, Message)>),
    /// Any other value, already rendered
    Value(String),
}

impl Message {
    /// Wrap any displayable value
    pub fn display(value: impl fmt::Display) -> Self {
        Message::Value(value.to_string())
    }

    /// Build a mapping message from ordered pairs
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Message>,
        I: IntoIterator<Item = (K, V)>,
    {
        Message::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse a JSON document into a message
    pub fn parse_json(input: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Ok(value.into())
    }

    /// Expand this message into lines (see [`normalize`])
    fn expand(&self, split_newline: bool, out: &mut Vec<String>) {
        match self {
            Message::List(items) => {
                out.extend(items.iter().map(|item| format!("- {}", item)));
            }
            Message::Map(pairs) => {
                out.extend(pairs.iter().map(|(k, v)| format!("- {}: {}", k, v)));
            }
            Message::Text(text) if split_newline => {
                out.extend(text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l).to_string()));
            }
            Message::Text(text) | Message::Value(text) => out.push(text.clone()),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(s) | Message::Value(s) => f.write_str(s),
            Message::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Message::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Flatten messages into non-empty printable lines, preserving order
pub fn normalize(messages: &[Message], split_newline: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for message in messages {
        message.expand(split_newline, &mut lines);
    }
    lines.retain(|line| !line.is_empty());
    lines
}

/// Normalize a single message as a one-element call
pub fn normalize_one(message: impl Into<Message>, split_newline: bool) -> Vec<String> {
    normalize(&[message.into()], split_newline)
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<&String> for Message {
    fn from(s: &String) -> Self {
        Message::Text(s.clone())
    }
}

impl<T: Into<Message>> From<Vec<T>> for Message {
    fn from(items: Vec<T>) -> Self {
        Message::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Message>> From<BTreeMap<K, V>> for Message {
    fn from(map: BTreeMap<K, V>) -> Self {
        Message::map(map)
    }
}

impl From<serde_json::Value> for Message {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::String(s) => Message::Text(s),
            Value::Array(items) => Message::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => Message::map(map),
            // null renders as an empty value and is dropped
            Value::Null => Message::Value(String::new()),
            other => Message::Value(other.to_string()),
        }
    }
}

macro_rules! impl_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Message {
                fn from(value: $ty) -> Self {
                    Message::Value(value.to_string())
                }
            }
        )*
    };
}

impl_from_display!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(normalize_one("hello", false), vec!["hello"]);
        assert_eq!(normalize_one(42, false), vec!["42"]);
        assert_eq!(normalize_one(true, false), vec!["true"]);
    }

    #[test]
    fn test_list_items_prefixed() {
        let lines = normalize_one(vec!["a", "b", "c"], false);
        assert_eq!(lines, vec!["- a", "- b", "- c"]);
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let msg = Message::map([("zeta", 1), ("alpha", 2), ("mid", 3)]);
        let lines = normalize(&[msg], false);
        assert_eq!(lines, vec!["- zeta: 1", "- alpha: 2", "- mid: 3"]);
    }

    #[test]
    fn test_split_newline() {
        assert_eq!(normalize_one("a\nb", true), vec!["a", "b"]);
        assert_eq!(normalize_one("a\nb", false), vec!["a\nb"]);
        assert_eq!(normalize_one("a\r\nb\n", true), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_entries_dropped() {
        let msgs = vec![Message::from(""), Message::from("x")];
        assert_eq!(normalize(&msgs, false), vec!["x"]);

        let lines = normalize_one("a\n\n\nb", true);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_nested_list_not_expanded() {
        let msg = Message::List(vec![
            Message::from(vec!["x", "y"]),
            Message::from("z"),
        ]);
        assert_eq!(normalize(&[msg], false), vec!["- [x, y]", "- z"]);
    }

    #[test]
    fn test_mixed_call_keeps_order() {
        let msgs = vec![
            Message::from("start"),
            Message::from(vec![1, 2]),
            Message::map([("k", "v")]),
            Message::display(3.5),
        ];
        assert_eq!(
            normalize(&msgs, false),
            vec!["start", "- 1", "- 2", "- k: v", "3.5"]
        );
    }

    #[test]
    fn test_json_value() {
        let msg = Message::parse_json(r#"{"b": [1, 2], "a": "text", "n": null}"#).unwrap();
        assert_eq!(
            normalize(&[msg], false),
            vec!["- b: [1, 2]", "- a: text", "- n: "]
        );

        let msg = Message::parse_json("null").unwrap();
        assert!(normalize(&[msg], false).is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Message::parse_json("{not json"),
            Err(crate::Error::Json(_))
        ));
    }
}
