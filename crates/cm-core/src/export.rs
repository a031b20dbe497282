//! JSON wire format handed to renderers.
//!
//! Node fields keep the renderer contract's camelCase names (`clusterColor`,
//! `fx`/`fy` for pinned positions). Output is deterministic: identical input
//! and config give byte-identical JSON.

use serde::{Deserialize, Serialize};

use crate::config::{ClusterParams, PipelineConfig};
use crate::graph::{ClusterRegion, Link, Node};
use crate::layout::RefineOutcome;
use crate::pipeline::PipelineOutput;
use crate::record::Record;

pub const CURRENT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphExport {
    pub version: String,
    pub params: ClusterParams,
    pub canvas: WireCanvas,
    pub nodes: Vec<WireNode>,
    pub links: Vec<WireLink>,
    pub regions: Vec<WireRegion>,
    pub clusters: Vec<WireFamilyClusters>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refine: Option<WireRefine>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WireCanvas {
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub cluster: usize,
    #[serde(rename = "clusterColor")]
    pub cluster_color: String,
    pub content: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub fx: f64,
    pub fy: f64,
    pub radius: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireLink {
    pub source: String,
    pub target: String,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireRegion {
    #[serde(rename = "type")]
    pub node_type: String,
    pub cluster: usize,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub size: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireFamilyClusters {
    #[serde(rename = "type")]
    pub node_type: String,
    pub clusters: Vec<Vec<usize>>,
    #[serde(rename = "denseCount")]
    pub dense_count: usize,
    #[serde(rename = "noiseCount")]
    pub noise_count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WireRefine {
    pub iterations: usize,
    pub converged: bool,
    #[serde(rename = "remainingOverlaps")]
    pub remaining_overlaps: usize,
}

impl GraphExport {
    pub fn from_output(output: &PipelineOutput, config: &PipelineConfig) -> Self {
        GraphExport {
            version: CURRENT_VERSION.to_string(),
            params: config.clustering,
            canvas: WireCanvas {
                width: config.layout.canvas_width,
                height: config.layout.canvas_height,
            },
            nodes: output.graph.nodes.iter().map(wire_node).collect(),
            links: output.graph.links.iter().map(wire_link).collect(),
            regions: output.graph.regions.iter().map(wire_region).collect(),
            clusters: output
                .clusters
                .iter()
                .map(|fc| WireFamilyClusters {
                    node_type: fc.family.as_str().to_string(),
                    clusters: fc.clusters.clone(),
                    dense_count: fc.dense,
                    noise_count: fc.noise(),
                })
                .collect(),
            refine: output.refine.map(wire_refine),
        }
    }
}

fn wire_node(node: &Node) -> WireNode {
    WireNode {
        id: node.id.clone(),
        node_type: node.family.as_str().to_string(),
        cluster: node.cluster,
        cluster_color: node.color.clone(),
        content: node.label.clone(),
        label: node.preview(crate::constants::LABEL_PREVIEW_CHARS),
        x: node.x,
        y: node.y,
        fx: node.x,
        fy: node.y,
        radius: node.radius,
    }
}

fn wire_link(link: &Link) -> WireLink {
    WireLink {
        source: link.source.clone(),
        target: link.target.clone(),
        color: link.color.clone(),
    }
}

fn wire_region(region: &ClusterRegion) -> WireRegion {
    WireRegion {
        node_type: region.family.as_str().to_string(),
        cluster: region.cluster,
        color: region.color.clone(),
        x: region.x,
        y: region.y,
        width: region.width,
        height: region.height,
        size: region.size,
    }
}

fn wire_refine(outcome: RefineOutcome) -> WireRefine {
    WireRefine {
        iterations: outcome.iterations,
        converged: outcome.converged,
        remaining_overlaps: outcome.remaining_overlaps,
    }
}

/// Serialize a run to pretty-printed JSON.
pub fn export_json(output: &PipelineOutput, config: &PipelineConfig) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&GraphExport::from_output(output, config))
}

/// Parse a JSON array of records, as returned by the upstream store.
pub fn parse_records(json: &str) -> serde_json::Result<Vec<Record>> {
    serde_json::from_str(json)
}
