/// Give every point left out by DBSCAN its own singleton cluster.
///
/// Singletons are appended after the dense clusters in ascending index order.
/// Indices outside `0..total` in the input are ignored when computing coverage.
pub fn fill_noise(mut clusters: Vec<Vec<usize>>, total: usize) -> Vec<Vec<usize>> {
    let mut covered = vec![false; total];
    for &i in clusters.iter().flatten() {
        if let Some(slot) = covered.get_mut(i) {
            *slot = true;
        }
    }
    clusters.extend((0..total).filter(|&i| !covered[i]).map(|i| vec![i]));
    clusters
}

/// True when every index in `0..total` appears in exactly one cluster and
/// nothing else appears at all.
pub fn is_partition(clusters: &[Vec<usize>], total: usize) -> bool {
    let mut seen = vec![false; total];
    for &i in clusters.iter().flatten() {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    seen.into_iter().all(|s| s)
}
