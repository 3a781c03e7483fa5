//! Nearest-anchor lookups and one-dimensional clustering.
//!
//! The BOM, blade and image matchers all ask the same question: which
//! anchor (a column, a row, a label, a placement) is closest to this
//! coordinate, provided it is close enough? These helpers answer it once.
//! Ties always go to the earliest candidate so results are deterministic.

use crate::geometry::Point;

/// Nearest candidate by a scalar position, within `window` of `target`.
pub fn nearest_within<T, I, F>(candidates: I, target: f64, window: f64, pos: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> f64,
{
    let mut best: Option<(f64, T)> = None;
    for c in candidates {
        let d = (pos(&c) - target).abs();
        if d > window {
            continue;
        }
        match best {
            Some((bd, _)) if bd <= d => {}
            _ => best = Some((d, c)),
        }
    }
    best.map(|(_, c)| c)
}

/// Nearest candidate by a 2D position, within `radius` of `target`.
pub fn nearest_point_within<T, I, F>(candidates: I, target: Point, radius: f64, pos: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> Point,
{
    let mut best: Option<(f64, T)> = None;
    for c in candidates {
        let d = pos(&c).distance(&target);
        if d > radius {
            continue;
        }
        match best {
            Some((bd, _)) if bd <= d => {}
            _ => best = Some((d, c)),
        }
    }
    best.map(|(_, c)| c)
}

/// Closest candidate whose position is at or to the left of `x` (with
/// `slack` allowed past it).
pub fn nearest_at_or_left<T, I, F>(candidates: I, x: f64, slack: f64, pos: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> f64,
{
    let mut best: Option<(f64, T)> = None;
    for c in candidates {
        let p = pos(&c);
        if p > x + slack {
            continue;
        }
        match best {
            Some((bp, _)) if bp >= p => {}
            _ => best = Some((p, c)),
        }
    }
    best.map(|(_, c)| c)
}

/// Group sorted-by-value items into clusters where neighbours differ by at
/// most `tolerance`. Returns clusters of indices into `values`.
pub fn cluster_1d(values: &[f64], tolerance: f64) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut last = f64::NEG_INFINITY;
    for idx in order {
        let v = values[idx];
        match clusters.last_mut() {
            Some(cluster) if v - last <= tolerance => cluster.push(idx),
            _ => clusters.push(vec![idx]),
        }
        last = v;
    }
    clusters
}

/// Center of the largest cluster (ties: the lower value).
pub fn dominant_level(values: &[f64], tolerance: f64) -> Option<f64> {
    let clusters = cluster_1d(values, tolerance);
    let best = clusters
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then(ib.cmp(ia)))?
        .1;
    let sum: f64 = best.iter().map(|&i| values[i]).sum();
    Some(sum / best.len() as f64)
}
