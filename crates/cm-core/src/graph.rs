//! Graph construction: positioned, colored nodes per cluster member, plus
//! trigger → thought → response links per record.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::LayoutConfig;
use crate::constants::PLACEHOLDER_LABEL;
use crate::palette::ColorRegistry;
use crate::record::{Family, Record};
use crate::report::Diagnostic;

/// Noise-filled clustering result for one family.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FamilyClusters {
    pub family: Family,
    pub clusters: Vec<Vec<usize>>,
    /// How many of `clusters` came from DBSCAN; the rest are noise singletons.
    pub dense: usize,
}

impl FamilyClusters {
    pub fn noise(&self) -> usize {
        self.clusters.len().saturating_sub(self.dense)
    }

    /// Cluster index containing `point`, if any.
    pub fn cluster_of(&self, point: usize) -> Option<usize> {
        self.clusters.iter().position(|c| c.contains(&point))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub family: Family,
    pub cluster: usize,
    pub color: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Node {
    pub fn node_id(family: Family, record_id: &str) -> String {
        format!("{}-{record_id}", family.as_str())
    }

    /// On-canvas label: the first `chars` characters followed by an ellipsis.
    pub fn preview(&self, chars: usize) -> String {
        let head: String = self.label.chars().take(chars).collect();
        format!("{head}...")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    /// Color of the source node's cluster.
    pub color: String,
}

/// Background rectangle behind one cluster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClusterRegion {
    pub family: Family,
    pub cluster: usize,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub size: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub regions: Vec<ClusterRegion>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_in(&self, family: Family) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.family == family)
    }
}

/// Builds one [`Graph`] from clustered families. Borrows the run's color
/// registry mutably, so colors assigned here stay fixed for the whole run.
pub struct GraphBuilder<'a> {
    records: &'a [Record],
    layout: &'a LayoutConfig,
    registry: &'a mut ColorRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        records: &'a [Record],
        layout: &'a LayoutConfig,
        registry: &'a mut ColorRegistry,
    ) -> Self {
        Self {
            records,
            layout,
            registry,
            diagnostics: Vec::new(),
        }
    }

    pub fn build(mut self, families: &[FamilyClusters]) -> (Graph, Vec<Diagnostic>) {
        let mut graph = Graph::default();

        for fc in families {
            self.add_family(&mut graph, fc);
        }
        self.add_links(&mut graph);

        (graph, self.diagnostics)
    }

    fn add_family(&mut self, graph: &mut Graph, fc: &FamilyClusters) {
        let x = self.layout.columns.x(fc.family);
        let spacing = self.layout.node_spacing;
        let slot_height = self.layout.canvas_height / (fc.clusters.len() + 1) as f64;

        for (cluster_index, members) in fc.clusters.iter().enumerate() {
            let color = self.registry.color_for(fc.family, cluster_index);
            let center = slot_height * (cluster_index + 1) as f64;
            let height = members.len() as f64 * spacing + self.layout.region_padding;
            let top = center - height / 2.0;

            graph.regions.push(ClusterRegion {
                family: fc.family,
                cluster: cluster_index,
                color: color.clone(),
                x: x - self.layout.region_width / 2.0,
                y: top,
                width: self.layout.region_width,
                height,
                size: members.len(),
            });

            for (rank, &point) in members.iter().enumerate() {
                let Some(record) = self.records.get(point) else {
                    self.diagnostics.push(Diagnostic::MissingRecord {
                        family: fc.family,
                        index: point,
                    });
                    continue;
                };

                let label = record
                    .text(fc.family)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(PLACEHOLDER_LABEL)
                    .to_string();

                graph.nodes.push(Node {
                    id: Node::node_id(fc.family, &record.id),
                    family: fc.family,
                    cluster: cluster_index,
                    color: color.clone(),
                    label,
                    x,
                    y: top + spacing + rank as f64 * spacing,
                    radius: self.layout.node_radius,
                });
            }
        }
    }

    fn add_links(&mut self, graph: &mut Graph) {
        let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(graph.nodes.len());
        for (i, node) in graph.nodes.iter().enumerate() {
            by_id.entry(node.id.as_str()).or_insert(i);
        }

        let mut links = Vec::with_capacity(self.records.len() * 2);
        for record in self.records {
            for (from, to) in [
                (Family::Trigger, Family::Thought),
                (Family::Thought, Family::Response),
            ] {
                let source = Node::node_id(from, &record.id);
                let target = Node::node_id(to, &record.id);
                match (by_id.get(source.as_str()), by_id.contains_key(target.as_str())) {
                    (Some(&s), true) => links.push(Link {
                        color: graph.nodes[s].color.clone(),
                        source,
                        target,
                    }),
                    _ => self.diagnostics.push(Diagnostic::DanglingLink {
                        record_id: record.id.clone(),
                        source,
                        target,
                    }),
                }
            }
        }
        graph.links = links;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Palette;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new(format!("r{i}"))
                    .with_text(Family::Trigger, format!("trigger {i}"))
                    .with_text(Family::Thought, format!("thought {i}"))
                    .with_text(Family::Response, format!("response {i}"))
            })
            .collect()
    }

    fn singletons(family: Family, n: usize) -> FamilyClusters {
        FamilyClusters {
            family,
            clusters: (0..n).map(|i| vec![i]).collect(),
            dense: n,
        }
    }

    fn all_families(n: usize) -> Vec<FamilyClusters> {
        Family::ALL.iter().map(|&f| singletons(f, n)).collect()
    }

    #[test]
    fn test_noise_count() {
        let fc = FamilyClusters {
            family: Family::Trigger,
            clusters: vec![vec![0, 1], vec![2], vec![3]],
            dense: 1,
        };
        assert_eq!(fc.noise(), 2);

        // an inconsistent dense count never underflows
        let fc = FamilyClusters { dense: 5, ..fc };
        assert_eq!(fc.noise(), 0);
    }

    #[test]
    fn test_three_records_nine_nodes_six_links() {
        let recs = records(3);
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        let (graph, diagnostics) =
            GraphBuilder::new(&recs, &layout, &mut registry).build(&all_families(3));

        assert_eq!(graph.nodes.len(), 9);
        assert_eq!(graph.links.len(), 6);
        assert_eq!(graph.regions.len(), 9);
        assert!(diagnostics.is_empty());

        assert_eq!(graph.links[0].source, "Trigger-r0");
        assert_eq!(graph.links[0].target, "Thought-r0");
        assert_eq!(graph.links[1].source, "Thought-r0");
        assert_eq!(graph.links[1].target, "Response-r0");
    }

    #[test]
    fn test_node_positions() {
        let recs = records(3);
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        let families = vec![FamilyClusters {
            family: Family::Trigger,
            clusters: vec![vec![0, 2], vec![1]],
            dense: 2,
        }];
        let (graph, _) = GraphBuilder::new(&recs, &layout, &mut registry).build(&families);

        // Two clusters on an 800px canvas: slot centers at 266.67 and 533.33.
        let slot = 800.0 / 3.0;
        let first_top = slot - (2.0 * 40.0 + 60.0) / 2.0;
        assert_eq!(graph.nodes[0].id, "Trigger-r0");
        assert!((graph.nodes[0].y - (first_top + 40.0)).abs() < 1e-9);
        assert_eq!(graph.nodes[1].id, "Trigger-r2");
        assert!((graph.nodes[1].y - (first_top + 80.0)).abs() < 1e-9);
        assert!(graph.nodes.iter().all(|n| n.x == 200.0));

        let region = &graph.regions[1];
        assert_eq!(region.cluster, 1);
        assert_eq!(region.x, 100.0);
        assert_eq!(region.width, 200.0);
        assert!((region.height - 100.0).abs() < 1e-9);
        assert!((region.y - (2.0 * slot - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_members_share_color() {
        let recs = records(3);
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        let families = vec![FamilyClusters {
            family: Family::Response,
            clusters: vec![vec![0, 1], vec![2]],
            dense: 1,
        }];
        let (graph, _) = GraphBuilder::new(&recs, &layout, &mut registry).build(&families);
        assert_eq!(graph.nodes[0].color, graph.nodes[1].color);
        assert_ne!(graph.nodes[0].color, graph.nodes[2].color);
        assert_eq!(registry.color_for(Family::Response, 1), graph.nodes[2].color);
    }

    #[test]
    fn test_placeholder_label() {
        let recs = vec![
            Record::new("a").with_text(Family::Trigger, ""),
            Record::new("b"),
        ];
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        let (graph, _) = GraphBuilder::new(&recs, &layout, &mut registry)
            .build(&[singletons(Family::Trigger, 2)]);
        assert!(graph.nodes.iter().all(|n| n.label == PLACEHOLDER_LABEL));
    }

    #[test]
    fn test_missing_record_skips_node() {
        let recs = records(1);
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        let families = vec![FamilyClusters {
            family: Family::Trigger,
            clusters: vec![vec![0, 4]],
            dense: 1,
        }];
        let (graph, diagnostics) =
            GraphBuilder::new(&recs, &layout, &mut registry).build(&families);
        assert_eq!(graph.nodes.len(), 1);
        assert!(diagnostics.contains(&Diagnostic::MissingRecord {
            family: Family::Trigger,
            index: 4
        }));
    }

    #[test]
    fn test_record_absent_from_clusters_gets_no_links() {
        let recs = records(2);
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        // Record 1 appears in no family's clusters.
        let families: Vec<FamilyClusters> = Family::ALL
            .iter()
            .map(|&family| FamilyClusters {
                family,
                clusters: vec![vec![0]],
                dense: 1,
            })
            .collect();
        let (graph, diagnostics) =
            GraphBuilder::new(&recs, &layout, &mut registry).build(&families);

        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 2);
        assert!(graph.links.iter().all(|l| l.source.ends_with("-r0")));
        let dangling = diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::DanglingLink { record_id, .. } if record_id == "r1"))
            .count();
        assert_eq!(dangling, 2);
    }

    #[test]
    fn test_link_takes_source_color() {
        let recs = records(1);
        let layout = LayoutConfig::default();
        let mut registry = ColorRegistry::new(Palette::default());
        let (graph, _) =
            GraphBuilder::new(&recs, &layout, &mut registry).build(&all_families(1));
        let trigger = graph.node("Trigger-r0").unwrap();
        assert_eq!(graph.links[0].color, trigger.color);
    }

    #[test]
    fn test_preview() {
        let node = Node {
            id: "Trigger-1".into(),
            family: Family::Trigger,
            cluster: 0,
            color: "#fff".into(),
            label: "my manager moved the deadline again".into(),
            x: 0.0,
            y: 0.0,
            radius: 15.0,
        };
        assert_eq!(node.preview(20), "my manager moved the...");
    }

    #[test]
    fn test_family_clusters_helpers() {
        let fc = FamilyClusters {
            family: Family::Thought,
            clusters: vec![vec![0, 2], vec![1]],
            dense: 1,
        };
        assert_eq!(fc.noise(), 1);
        assert_eq!(fc.cluster_of(2), Some(0));
        assert_eq!(fc.cluster_of(9), None);
    }
}
