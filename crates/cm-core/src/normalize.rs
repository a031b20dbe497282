//! Embedding normalization: resolve every accepted encoding to a flat
//! numeric vector, then scale it to unit L2 length.
//!
//! Resolution problems never abort a run. The offending index gets an empty
//! (or unnormalized) vector and an [`EmbeddingIssue`]; downstream stages treat
//! such points as incomparable with everything but themselves.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::{Family, RawEmbedding};

/// Why an embedding could not be used as-is.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbeddingIssue {
    /// A string that is neither a JSON array nor a Postgres array literal.
    Unparseable { reason: String },
    /// A component that is not a number.
    NonNumeric { position: usize },
    /// A shape that cannot carry a vector at all (null, number, boolean).
    Unsupported { shape: &'static str },
    /// Length differs from the family's reference dimension.
    DimensionMismatch { expected: usize, found: usize },
}

impl fmt::Display for EmbeddingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparseable { reason } => write!(f, "unparseable embedding string: {reason}"),
            Self::NonNumeric { position } => {
                write!(f, "non-numeric component at position {position}")
            }
            Self::Unsupported { shape } => write!(f, "unsupported embedding shape: {shape}"),
            Self::DimensionMismatch { expected, found } => {
                write!(f, "dimension {found} does not match family dimension {expected}")
            }
        }
    }
}

/// An issue attached to a position within one family.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedIssue {
    pub index: usize,
    pub issue: EmbeddingIssue,
}

/// Normalized vectors for one family, in record order.
#[derive(Clone, Debug)]
pub struct NormalizedFamily {
    pub family: Family,
    pub vectors: Vec<Vec<f64>>,
    /// Length of the first non-empty vector, if any.
    pub dimension: Option<usize>,
    pub issues: Vec<IndexedIssue>,
}

impl NormalizedFamily {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Resolve a raw embedding to a flat numeric vector (not yet normalized).
pub fn resolve(raw: &RawEmbedding) -> Result<Vec<f64>, EmbeddingIssue> {
    match raw {
        RawEmbedding::Vector(items) => numeric_components(items.iter()),
        RawEmbedding::Wrapped(inner) => resolve(inner),
        RawEmbedding::Encoded(text) => resolve_encoded(text),
        RawEmbedding::Mapping(map) => numeric_components(mapping_values(map).into_iter()),
        RawEmbedding::Missing | RawEmbedding::Unsupported(_) => Err(EmbeddingIssue::Unsupported {
            shape: raw.kind(),
        }),
    }
}

fn numeric_components<'a>(items: impl Iterator<Item = &'a Value>) -> Result<Vec<f64>, EmbeddingIssue> {
    items
        .enumerate()
        .map(|(position, v)| v.as_f64().ok_or(EmbeddingIssue::NonNumeric { position }))
        .collect()
}

/// Integer-like keys first in numeric order, then the remaining keys in
/// input order.
fn mapping_values(map: &Map<String, Value>) -> Vec<&Value> {
    let mut indexed: Vec<(u64, &Value)> = Vec::new();
    let mut named: Vec<&Value> = Vec::new();
    for (key, value) in map {
        match key.parse::<u64>() {
            Ok(i) if i.to_string() == *key => indexed.push((i, value)),
            _ => named.push(value),
        }
    }
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, v)| v).chain(named).collect()
}

fn resolve_encoded(text: &str) -> Result<Vec<f64>, EmbeddingIssue> {
    let trimmed = text.trim();
    // Postgres array literal: {0.1,0.2}
    let json = match trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) if !inner.contains(':') => format!("[{inner}]"),
        _ => trimmed.to_string(),
    };
    let value: Value = serde_json::from_str(&json).map_err(|e| EmbeddingIssue::Unparseable {
        reason: e.to_string(),
    })?;
    match RawEmbedding::from(value) {
        // An encoded string holding another string is not a vector.
        RawEmbedding::Encoded(_) => Err(EmbeddingIssue::Unparseable {
            reason: "string decodes to another string".to_string(),
        }),
        decoded => resolve(&decoded),
    }
}

/// Euclidean (L2) magnitude.
pub fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scale `v` to unit length in place. A zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f64]) {
    let mag = magnitude(v);
    if mag == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= mag;
    }
}

/// Resolve and normalize one family's embeddings. Output index `i` always
/// corresponds to input index `i`.
pub fn normalize_family<'a>(
    family: Family,
    raws: impl IntoIterator<Item = &'a RawEmbedding>,
) -> NormalizedFamily {
    let mut vectors = Vec::new();
    let mut issues = Vec::new();
    let mut dimension: Option<usize> = None;

    for (index, raw) in raws.into_iter().enumerate() {
        let vector = match resolve(raw) {
            Ok(mut v) => {
                if !v.is_empty() {
                    match dimension {
                        None => dimension = Some(v.len()),
                        Some(expected) if expected != v.len() => {
                            issues.push(IndexedIssue {
                                index,
                                issue: EmbeddingIssue::DimensionMismatch {
                                    expected,
                                    found: v.len(),
                                },
                            });
                        }
                        Some(_) => {}
                    }
                }
                l2_normalize(&mut v);
                v
            }
            Err(issue) => {
                issues.push(IndexedIssue { index, issue });
                Vec::new()
            }
        };
        vectors.push(vector);
    }

    NormalizedFamily {
        family,
        vectors,
        dimension,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn raw(value: Value) -> RawEmbedding {
        RawEmbedding::from(value)
    }

    #[test]
    fn test_resolve_every_shape() {
        assert_eq!(resolve(&raw(json!([1.0, 2.0]))).unwrap(), vec![1.0, 2.0]);
        assert_eq!(resolve(&raw(json!("[3, 4]"))).unwrap(), vec![3.0, 4.0]);
        assert_eq!(resolve(&raw(json!("{3,4}"))).unwrap(), vec![3.0, 4.0]);
        assert_eq!(
            resolve(&raw(json!({"embedding": [5.0, 6.0]}))).unwrap(),
            vec![5.0, 6.0]
        );
        assert_eq!(
            resolve(&raw(json!({"embedding": "[7, 8]"}))).unwrap(),
            vec![7.0, 8.0]
        );
    }

    #[test]
    fn test_mapping_uses_numeric_key_order() {
        let map = raw(json!({"10": 3.0, "2": 2.0, "0": 1.0}));
        assert_eq!(resolve(&map).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mapping_named_keys_keep_input_order() {
        let value: Value = serde_json::from_str(r#"{"b": 1.0, "a": 2.0}"#).unwrap();
        assert_eq!(resolve(&raw(value)).unwrap(), vec![1.0, 2.0]);

        let mixed: Value = serde_json::from_str(r#"{"z": 3.0, "1": 2.0, "y": 4.0, "0": 1.0}"#).unwrap();
        assert_eq!(resolve(&raw(mixed)).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_unparseable_string() {
        let err = resolve(&raw(json!("not a vector"))).unwrap_err();
        assert!(matches!(err, EmbeddingIssue::Unparseable { .. }));
    }

    #[test]
    fn test_double_encoded_string_rejected() {
        let err = resolve(&raw(json!("\"[1, 2]\""))).unwrap_err();
        assert!(matches!(err, EmbeddingIssue::Unparseable { .. }));
    }

    #[test]
    fn test_non_numeric_component() {
        let err = resolve(&raw(json!([1.0, "two", 3.0]))).unwrap_err();
        assert_eq!(err, EmbeddingIssue::NonNumeric { position: 1 });
    }

    #[test]
    fn test_null_and_scalars_unsupported() {
        assert_eq!(
            resolve(&RawEmbedding::Missing).unwrap_err(),
            EmbeddingIssue::Unsupported { shape: "null" }
        );
        assert_eq!(
            resolve(&raw(json!(0.5))).unwrap_err(),
            EmbeddingIssue::Unsupported { shape: "number" }
        );
    }

    #[test]
    fn test_zero_vector_unchanged() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_relative_eq!(v[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(v[1], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_family_preserves_order_and_reports() {
        let raws = vec![
            raw(json!([3.0, 4.0])),
            raw(json!("garbage")),
            raw(json!([1.0, 0.0, 0.0])),
            raw(json!([0.0, 2.0])),
        ];
        let family = normalize_family(Family::Thought, &raws);

        assert_eq!(family.len(), 4);
        assert_eq!(family.dimension, Some(2));
        assert!(family.vectors[1].is_empty());
        assert_relative_eq!(family.vectors[3][1], 1.0, epsilon = 1e-12);
        // Mismatched vectors are reported but still normalized.
        assert_relative_eq!(magnitude(&family.vectors[2]), 1.0, epsilon = 1e-12);

        let indices: Vec<usize> = family.issues.iter().map(|i| i.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(
            family.issues[1].issue,
            EmbeddingIssue::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_issue_display() {
        let issue = EmbeddingIssue::DimensionMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(
            issue.to_string(),
            "dimension 2 does not match family dimension 3"
        );
    }

    proptest! {
        #[test]
        fn prop_nonzero_vectors_have_unit_magnitude(
            v in prop::collection::vec(-1000.0f64..1000.0, 1..64)
        ) {
            prop_assume!(magnitude(&v) > 1e-6);
            let mut v = v;
            l2_normalize(&mut v);
            prop_assert!((magnitude(&v) - 1.0).abs() < 1e-9);
        }
    }
}
