use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One of the three embedding roles carried by every record.
/// Families are clustered independently and laid out in separate columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    Trigger,
    Thought,
    Response,
}

impl Family {
    /// Families in processing order. Color assignment follows this order.
    pub const ALL: [Family; 3] = [Family::Trigger, Family::Thought, Family::Response];

    /// Display name, also used as the node id prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "Trigger",
            Self::Thought => "Thought",
            Self::Response => "Response",
        }
    }

    /// Name of the record's text field for this family.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Thought => "thought",
            Self::Response => "response",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trigger" => Some(Self::Trigger),
            "thought" => Some(Self::Thought),
            "response" => Some(Self::Response),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An embedding as it arrives from the data source, before normalization.
///
/// The upstream store is loose about shape: vectors show up as JSON arrays,
/// as `{"embedding": [...]}` wrappers, as strings holding a serialized array,
/// or as plain objects keyed by position. Every shape is captured here and
/// resolved by a single match in [`crate::normalize::resolve`].
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawEmbedding {
    /// A JSON array. Components are validated during resolution.
    Vector(Vec<Value>),
    /// An object carrying the real embedding under its `embedding` field.
    Wrapped(Box<RawEmbedding>),
    /// A string-encoded vector: `"[0.1, 0.2]"` or `"{0.1,0.2}"`.
    Encoded(String),
    /// Any other object; values are taken in key order.
    Mapping(Map<String, Value>),
    /// Null or absent.
    #[default]
    Missing,
    /// A bare number or boolean.
    Unsupported(Value),
}

impl RawEmbedding {
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self::Vector(values.into_iter().map(Value::from).collect())
    }

    /// Short shape name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Wrapped(_) => "wrapped",
            Self::Encoded(_) => "encoded",
            Self::Mapping(_) => "mapping",
            Self::Missing => "null",
            Self::Unsupported(Value::Bool(_)) => "boolean",
            Self::Unsupported(_) => "number",
        }
    }
}

impl From<Value> for RawEmbedding {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Vector(items),
            Value::String(s) => Self::Encoded(s),
            Value::Null => Self::Missing,
            Value::Object(mut map) => match map.remove("embedding") {
                Some(inner) if !inner.is_null() => Self::Wrapped(Box::new(Self::from(inner))),
                Some(inner) => {
                    map.insert("embedding".to_string(), inner);
                    Self::Mapping(map)
                }
                None => Self::Mapping(map),
            },
            other => Self::Unsupported(other),
        }
    }
}

impl From<RawEmbedding> for Value {
    fn from(raw: RawEmbedding) -> Self {
        match raw {
            RawEmbedding::Vector(items) => Value::Array(items),
            RawEmbedding::Wrapped(inner) => {
                let mut map = Map::new();
                map.insert("embedding".to_string(), Value::from(*inner));
                Value::Object(map)
            }
            RawEmbedding::Encoded(s) => Value::String(s),
            RawEmbedding::Mapping(map) => Value::Object(map),
            RawEmbedding::Missing => Value::Null,
            RawEmbedding::Unsupported(v) => v,
        }
    }
}

/// One processed message: three texts and their three embeddings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub thought: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub trigger_embedding: RawEmbedding,
    #[serde(default)]
    pub thought_embedding: RawEmbedding,
    #[serde(default)]
    pub response_embedding: RawEmbedding,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, family: Family, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match family {
            Family::Trigger => self.trigger = text,
            Family::Thought => self.thought = text,
            Family::Response => self.response = text,
        }
        self
    }

    pub fn with_embedding(mut self, family: Family, embedding: RawEmbedding) -> Self {
        match family {
            Family::Trigger => self.trigger_embedding = embedding,
            Family::Thought => self.thought_embedding = embedding,
            Family::Response => self.response_embedding = embedding,
        }
        self
    }

    pub fn text(&self, family: Family) -> Option<&str> {
        match family {
            Family::Trigger => self.trigger.as_deref(),
            Family::Thought => self.thought.as_deref(),
            Family::Response => self.response.as_deref(),
        }
    }

    pub fn embedding(&self, family: Family) -> &RawEmbedding {
        match family {
            Family::Trigger => &self.trigger_embedding,
            Family::Thought => &self.thought_embedding,
            Family::Response => &self.response_embedding,
        }
    }
}

/// Row ids are strings in most stores but integer keys are common too.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "record id must be a string or number, got {other}"
        ))),
    }
}
