use std::fmt;

use serde::Serialize;

use crate::normalize::EmbeddingIssue;
use crate::record::Family;

/// A non-fatal finding from one run. The affected record, node, or link is
/// degraded or skipped and the run continues.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    InvalidEmbedding {
        family: Family,
        index: usize,
        record_id: String,
        issue: EmbeddingIssue,
    },
    MissingRecord {
        family: Family,
        index: usize,
    },
    DanglingLink {
        record_id: String,
        source: String,
        target: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InvalidEmbedding {
                family,
                index,
                record_id,
                issue,
            } => write!(
                f,
                "invalid {family} embedding at index {index} (record {record_id}): {issue}"
            ),
            Diagnostic::MissingRecord { family, index } => {
                write!(f, "no record for {family} cluster member {index}, node skipped")
            }
            Diagnostic::DanglingLink {
                record_id,
                source,
                target,
            } => write!(
                f,
                "link {source} -> {target} skipped for record {record_id}: endpoint missing"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::InvalidEmbedding {
            family: Family::Thought,
            index: 2,
            record_id: "r2".into(),
            issue: EmbeddingIssue::NonNumeric { position: 0 },
        };
        assert_eq!(
            d.to_string(),
            "invalid Thought embedding at index 2 (record r2): non-numeric component at position 0"
        );
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let d = Diagnostic::MissingRecord {
            family: Family::Trigger,
            index: 7,
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type"], "missing_record");
        assert_eq!(json["family"], "Trigger");
        assert_eq!(json["index"], 7);
    }
}
