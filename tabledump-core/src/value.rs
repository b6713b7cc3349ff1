//! Self-describing entry values.
//!
//! Tables hold arbitrary structured terms whose shape is unknown until read.
//! [`EntryValue`] is a tagged union over the primitive and composite shapes a
//! table can hold, so reports can render any entry with full nested detail.
//!
//! # Rendering
//! `Display` produces a term-style notation:
//! - tuples `{"a", 1}`, lists `[1, 2]`, maps `#{"k" => 1}`
//! - text is quoted and escaped, atoms are bare, bytes are `<<1, 2>>`
//!
//! # Ordering
//! [`EntryValue::term_cmp`] is a total order used by ordered tables:
//! null < bool < numbers < atoms < tuples < maps < lists < text < bytes.
//! Numbers compare numerically across `Int` and `Float`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single table entry or a component of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryValue {
    /// Absent value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point; NaN and infinities are written to JSON as
    /// the strings `"NaN"`, `"inf"` and `"-inf"`
    Float(#[serde(with = "float_repr")] f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes, base64 encoded in JSON output
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    /// Symbolic constant
    Atom(String),
    /// Fixed-size positional group; table entries are usually tuples
    Tuple(Vec<EntryValue>),
    /// Variable-length sequence
    List(Vec<EntryValue>),
    /// Key/value pairs in insertion order
    Map(Vec<(EntryValue, EntryValue)>),
}

/// Word size used for memory estimates.
const WORD_BYTES: usize = std::mem::size_of::<usize>();

impl EntryValue {
    /// Builds a tuple from its elements.
    pub fn tuple(elements: impl IntoIterator<Item = Self>) -> Self {
        Self::Tuple(elements.into_iter().collect())
    }

    /// Builds a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Builds an atom.
    pub fn atom(value: impl Into<String>) -> Self {
        Self::Atom(value.into())
    }

    /// Returns the key of a table entry: the first tuple element, or the
    /// whole value for anything that is not a non-empty tuple.
    pub fn key(&self) -> &Self {
        match self {
            Self::Tuple(elements) => elements.first().unwrap_or(self),
            _ => self,
        }
    }

    /// Rough memory footprint in machine words.
    pub fn word_size(&self) -> usize {
        let heap_words = |bytes: usize| bytes.div_ceil(WORD_BYTES);
        match self {
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Atom(_) => 1,
            Self::Float(_) => 2,
            Self::Text(text) => heap_words(text.len()).saturating_add(2),
            Self::Bytes(bytes) => heap_words(bytes.len()).saturating_add(2),
            Self::Tuple(elements) => elements
                .iter()
                .fold(1usize, |acc, e| acc.saturating_add(e.word_size())),
            Self::List(elements) => elements
                .iter()
                .fold(0usize, |acc, e| acc.saturating_add(e.word_size()).saturating_add(1)),
            Self::Map(pairs) => pairs.iter().fold(2usize, |acc, (k, v)| {
                acc.saturating_add(k.word_size()).saturating_add(v.word_size())
            }),
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Atom(_) => 3,
            Self::Tuple(_) => 4,
            Self::Map(_) => 5,
            Self::List(_) => 6,
            Self::Text(_) => 7,
            Self::Bytes(_) => 8,
        }
    }

    /// Total order over values. See the module docs for the type ranking.
    ///
    /// Tuples compare by size first, then element-wise; lists and maps
    /// compare element-wise.
    pub fn term_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Atom(a), Self::Atom(b)) | (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len().cmp(&b.len()).then_with(|| cmp_sequence(a, b))
            }
            (Self::List(a), Self::List(b)) => cmp_sequence(a, b),
            (Self::Map(a), Self::Map(b)) => a.len().cmp(&b.len()).then_with(|| {
                a.iter()
                    .zip(b.iter())
                    .map(|((ka, va), (kb, vb))| ka.term_cmp(kb).then_with(|| va.term_cmp(vb)))
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            }),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Converts a seed-file JSON value into an entry component.
    ///
    /// Arrays become lists here; [`EntryValue::from_seed_entry`] turns a
    /// top-level array into a tuple.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            Json::String(s) => Self::Text(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Self::Text(k), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts one seed-file entry: a top-level array is a tuple.
    pub fn from_seed_entry(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                Self::Tuple(items.into_iter().map(Self::from_json).collect())
            }
            other => Self::from_json(other),
        }
    }
}

fn cmp_sequence(a: &[EntryValue], b: &[EntryValue]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.term_cmp(y))
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn write_separated<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a EntryValue>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Atom(a) => f.write_str(a),
            Self::Bytes(bytes) => {
                f.write_str("<<")?;
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{byte}")?;
                }
                f.write_str(">>")
            }
            Self::Tuple(elements) => {
                f.write_str("{")?;
                write_separated(f, elements.iter())?;
                f.write_str("}")
            }
            Self::List(elements) => {
                f.write_str("[")?;
                write_separated(f, elements.iter())?;
                f.write_str("]")
            }
            Self::Map(pairs) => {
                f.write_str("#{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<i64> for EntryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for EntryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for EntryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for EntryValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Serde adapter storing byte values as base64 text.
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter keeping non-finite floats representable in JSON.
mod float_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Token(String),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if value.is_sign_positive() {
                INFINITY
            } else {
                NEG_INFINITY
            })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Token(token) => match token.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(serde::de::Error::custom(format!(
                    "invalid float token '{other}'"
                ))),
            },
        }
    }
}
