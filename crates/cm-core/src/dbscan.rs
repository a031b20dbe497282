//! Density-based clustering (DBSCAN) over normalized embeddings.
//!
//! Scan order is ascending point index, and the expansion frontier grows in
//! ascending neighbor order, so cluster membership and discovery order are a
//! pure function of `(points, eps, min_pts)`.

use crate::error::ConfigError;

/// DBSCAN parameters. Construct with [`Dbscan::new`], which validates them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dbscan {
    eps: f64,
    min_pts: usize,
}

impl Dbscan {
    /// `eps` must be positive and finite, `min_pts` at least 1.
    pub fn new(eps: f64, min_pts: usize) -> Result<Self, ConfigError> {
        if !eps.is_finite() || eps <= 0.0 {
            return Err(ConfigError::InvalidEps(eps));
        }
        if min_pts == 0 {
            return Err(ConfigError::InvalidMinPts(min_pts));
        }
        Ok(Self { eps, min_pts })
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_pts(&self) -> usize {
        self.min_pts
    }

    /// Cluster `points`. Returns clusters of point indices in discovery order;
    /// noise points are left out (see [`crate::noise::fill_noise`]).
    pub fn fit(&self, points: &[Vec<f64>]) -> Vec<Vec<usize>> {
        let n = points.len();
        let mut visited = vec![false; n];
        let mut assigned = vec![false; n];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        for point in 0..n {
            if visited[point] {
                continue;
            }
            visited[point] = true;

            let neighbors = self.region_query(points, point);
            if neighbors.len() < self.min_pts {
                // Noise for now; a later cluster may still claim it as a border point.
                continue;
            }

            let mut cluster = vec![point];
            assigned[point] = true;
            self.expand(points, neighbors, &mut cluster, &mut visited, &mut assigned);
            clusters.push(cluster);
        }

        clusters
    }

    fn expand(
        &self,
        points: &[Vec<f64>],
        mut frontier: Vec<usize>,
        cluster: &mut Vec<usize>,
        visited: &mut [bool],
        assigned: &mut [bool],
    ) {
        let mut queued = vec![false; points.len()];
        for &i in &frontier {
            queued[i] = true;
        }

        let mut cursor = 0;
        while cursor < frontier.len() {
            let candidate = frontier[cursor];
            cursor += 1;

            if !visited[candidate] {
                visited[candidate] = true;
                let reach = self.region_query(points, candidate);
                if reach.len() >= self.min_pts {
                    for j in reach {
                        if !queued[j] {
                            queued[j] = true;
                            frontier.push(j);
                        }
                    }
                }
            }

            if !assigned[candidate] {
                assigned[candidate] = true;
                cluster.push(candidate);
            }
        }
    }

    /// All indices within `eps` of `point` (strictly), including `point` itself.
    fn region_query(&self, points: &[Vec<f64>], point: usize) -> Vec<usize> {
        let origin = &points[point];
        (0..points.len())
            .filter(|&j| {
                j == point
                    || euclidean(origin, &points[j]).is_some_and(|d| d < self.eps)
            })
            .collect()
    }
}

/// Euclidean distance, or `None` when the vectors are not comparable
/// (different lengths, or empty after a failed resolution).
pub fn euclidean(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Some(sum.sqrt())
}
