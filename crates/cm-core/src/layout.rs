//! Cosmetic layout relaxation over a finished [`Graph`].
//!
//! Only `y` moves. Linked nodes are pulled gently toward each other's height,
//! with the pull cooling over the iteration budget, and after every step the
//! nodes of each column are pushed apart to a minimum separation. Running out
//! of iterations is an acceptable outcome.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{LayoutConfig, RefineConfig};
use crate::graph::Graph;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RefineOutcome {
    pub iterations: usize,
    pub converged: bool,
    pub remaining_overlaps: usize,
}

pub fn refine(graph: &mut Graph, config: &RefineConfig, layout: &LayoutConfig) -> RefineOutcome {
    let lo = layout.node_radius.min(layout.canvas_height / 2.0);
    let hi = (layout.canvas_height - layout.node_radius).max(lo);
    let mut rng = SmallRng::seed_from_u64(config.seed);

    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();
    let links: Vec<(usize, usize)> = graph
        .links
        .iter()
        .filter_map(|l| Some((*index.get(l.source.as_str())?, *index.get(l.target.as_str())?)))
        .collect();

    // Columns keyed by exact x; x never changes so this grouping is stable.
    let mut columns: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, node) in graph.nodes.iter().enumerate() {
        columns.entry(node.x.to_bits()).or_default().push(i);
    }
    let columns: Vec<Vec<usize>> = columns.into_values().collect();

    // Random but seeded order for nodes that sit at exactly the same height.
    let tiebreak: Vec<u32> = graph.nodes.iter().map(|_| rng.random()).collect();

    let mut y: Vec<f64> = graph.nodes.iter().map(|node| node.y).collect();
    let decay = 1.0 - 0.001_f64.powf(1.0 / config.iterations.max(1) as f64);
    let mut alpha = 1.0;
    let mut iterations = 0;
    let mut converged =
        links.is_empty() && count_overlaps(&columns, &y, config.min_separation) == 0;

    while !converged && iterations < config.iterations {
        iterations += 1;
        let before = y.clone();

        for &(s, t) in &links {
            let pull = (before[t] - before[s]) * config.link_strength * alpha;
            y[s] = (y[s] + pull).clamp(lo, hi);
            y[t] = (y[t] - pull).clamp(lo, hi);
        }

        for column in &columns {
            separate(column, &mut y, &tiebreak, config.min_separation, lo, hi);
        }

        let largest_move = y
            .iter()
            .zip(&before)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);

        alpha *= 1.0 - decay;
        converged = largest_move < config.tolerance;
    }

    for (node, yi) in graph.nodes.iter_mut().zip(y.iter()) {
        node.y = *yi;
    }

    RefineOutcome {
        iterations,
        converged,
        remaining_overlaps: count_overlaps(&columns, &y, config.min_separation),
    }
}

/// Enforce the minimum gap inside one column: sweep down from the top, then
/// back up from the bottom edge if the sweep ran off the canvas.
fn separate(column: &[usize], y: &mut [f64], tiebreak: &[u32], min_separation: f64, lo: f64, hi: f64) {
    for &i in column {
        y[i] = y[i].clamp(lo, hi);
    }
    let mut order = column.to_vec();
    order.sort_by(|&a, &b| y[a].total_cmp(&y[b]).then(tiebreak[a].cmp(&tiebreak[b])));

    for k in 1..order.len() {
        let floor = y[order[k - 1]] + min_separation;
        if y[order[k]] < floor {
            y[order[k]] = floor;
        }
    }

    let Some(&last) = order.last() else {
        return;
    };
    if y[last] > hi {
        y[last] = hi;
        for k in (0..order.len() - 1).rev() {
            let ceiling = y[order[k + 1]] - min_separation;
            if y[order[k]] > ceiling {
                y[order[k]] = ceiling;
            }
        }
        for &i in &order {
            y[i] = y[i].max(lo);
        }
    }
}

fn count_overlaps(columns: &[Vec<usize>], y: &[f64], min_separation: f64) -> usize {
    let tolerance = 1e-6;
    columns
        .iter()
        .map(|column| {
            let mut ys: Vec<f64> = column.iter().map(|&i| y[i]).collect();
            ys.sort_by(f64::total_cmp);
            ys.windows(2)
                .filter(|w| w[1] - w[0] < min_separation - tolerance)
                .count()
        })
        .sum()
}
