//! One full run: records in, graph out.
//!
//! normalize → cluster → fill noise → color + build → (refine)
//!
//! Families are clustered one after another in [`Family::ALL`] order, and a
//! fresh [`ColorRegistry`] is created per run, so two runs over the same
//! records produce identical graphs.

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::graph::{FamilyClusters, Graph, GraphBuilder};
use crate::layout::{RefineOutcome, refine};
use crate::noise::fill_noise;
use crate::normalize::{NormalizedFamily, normalize_family};
use crate::palette::ColorRegistry;
use crate::record::{Family, Record};
use crate::report::Diagnostic;

#[derive(Clone, Debug, Serialize)]
pub struct PipelineOutput {
    pub graph: Graph,
    pub clusters: Vec<FamilyClusters>,
    pub diagnostics: Vec<Diagnostic>,
    pub refine: Option<RefineOutcome>,
}

impl PipelineOutput {
    pub fn family(&self, family: Family) -> Option<&FamilyClusters> {
        self.clusters.iter().find(|fc| fc.family == family)
    }
}

/// Normalize every family of `records`, in record order.
pub fn normalize_records(records: &[Record]) -> Vec<NormalizedFamily> {
    Family::ALL
        .iter()
        .map(|&family| normalize_family(family, records.iter().map(|r| r.embedding(family))))
        .collect()
}

/// Run the whole pipeline. Only configuration problems fail the run; input
/// problems come back as diagnostics.
pub fn run(records: &[Record], config: &PipelineConfig) -> Result<PipelineOutput, ConfigError> {
    let dbscan = config.validate()?;

    let mut diagnostics = Vec::new();
    let mut clusters = Vec::with_capacity(Family::ALL.len());

    for normalized in normalize_records(records) {
        for issue in &normalized.issues {
            diagnostics.push(Diagnostic::InvalidEmbedding {
                family: normalized.family,
                index: issue.index,
                record_id: records[issue.index].id.clone(),
                issue: issue.issue.clone(),
            });
        }

        let dense = dbscan.fit(&normalized.vectors);
        let dense_count = dense.len();
        let filled = fill_noise(dense, normalized.len());
        debug_assert!(crate::noise::is_partition(&filled, normalized.len()));

        clusters.push(FamilyClusters {
            family: normalized.family,
            clusters: filled,
            dense: dense_count,
        });
    }

    let mut registry = ColorRegistry::new(config.palette.clone());
    let (mut graph, build_diagnostics) =
        GraphBuilder::new(records, &config.layout, &mut registry).build(&clusters);
    diagnostics.extend(build_diagnostics);

    let refined = config
        .refine
        .enabled
        .then(|| refine(&mut graph, &config.refine, &config.layout));

    Ok(PipelineOutput {
        graph,
        clusters,
        diagnostics,
        refine: refined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawEmbedding;
    use serde_json::json;

    fn record(id: &str, trigger: Vec<f64>, thought: Vec<f64>, response: Vec<f64>) -> Record {
        Record::new(id)
            .with_text(Family::Trigger, format!("{id} trigger"))
            .with_text(Family::Thought, format!("{id} thought"))
            .with_text(Family::Response, format!("{id} response"))
            .with_embedding(Family::Trigger, RawEmbedding::from_vec(trigger))
            .with_embedding(Family::Thought, RawEmbedding::from_vec(thought))
            .with_embedding(Family::Response, RawEmbedding::from_vec(response))
    }

    #[test]
    fn test_rejects_config_before_clustering() {
        let mut config = PipelineConfig::default();
        config.clustering.eps = -1.0;
        let err = run(&[], &config).unwrap_err();
        assert_eq!(err, ConfigError::InvalidEps(-1.0));
    }

    #[test]
    fn test_empty_input() {
        let output = run(&[], &PipelineConfig::default()).unwrap();
        assert!(output.graph.nodes.is_empty());
        assert!(output.graph.links.is_empty());
        assert_eq!(output.clusters.len(), 3);
        assert!(output.refine.is_none());
    }

    #[test]
    fn test_counts_dense_and_noise() {
        let records = vec![
            record("a", vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]),
            record("b", vec![1.0, 0.01], vec![0.0, 1.0], vec![1.0, 0.0]),
            record("c", vec![0.0, 1.0], vec![-1.0, 0.0], vec![1.0, 0.0]),
        ];
        let mut config = PipelineConfig::default();
        config.clustering.eps = 0.1;
        config.clustering.min_pts = 2;
        let output = run(&records, &config).unwrap();

        let trigger = output.family(Family::Trigger).unwrap();
        assert_eq!(trigger.clusters, vec![vec![0, 1], vec![2]]);
        assert_eq!(trigger.dense, 1);
        assert_eq!(trigger.noise(), 1);

        let thought = output.family(Family::Thought).unwrap();
        assert_eq!(thought.dense, 0);
        assert_eq!(thought.clusters, vec![vec![0], vec![1], vec![2]]);

        let response = output.family(Family::Response).unwrap();
        assert_eq!(response.clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_invalid_embedding_reported_with_record_id() {
        let records = vec![
            record("a", vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]),
            record("b", vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0])
                .with_embedding(Family::Thought, RawEmbedding::from(json!("oops"))),
        ];
        let output = run(&records, &PipelineConfig::default()).unwrap();

        assert_eq!(output.graph.nodes.len(), 6);
        assert_eq!(output.graph.links.len(), 4);
        assert!(matches!(
            &output.diagnostics[0],
            Diagnostic::InvalidEmbedding { family: Family::Thought, index: 1, record_id, .. }
                if record_id == "b"
        ));
    }

    #[test]
    fn test_refine_runs_when_enabled() {
        let records = vec![
            record("a", vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]),
            record("b", vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0]),
        ];
        let mut config = PipelineConfig::default();
        config.refine.enabled = true;
        let output = run(&records, &config).unwrap();
        let outcome = output.refine.unwrap();
        assert_eq!(outcome.remaining_overlaps, 0);
        assert!(output.graph.nodes.iter().all(|n| n.x == config.layout.columns.x(n.family)));
    }
}
