//! Centroid-based clustering over projected 3-D coordinates.
//!
//! Seeded k-means with k-means++ initialisation. Empty clusters are
//! re-seeded to the point farthest from its assigned centroid, so every
//! cluster id in [0, K) ends up populated whenever K <= M.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MAX_ITERATIONS: usize = 300;

/// A fitted clusterer: the final centroids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedClusterer {
    pub centroids: Vec<[f32; 3]>,
}

impl FittedClusterer {
    /// Fit over all points and return (model, per-point labels in input
    /// order). `k` is reduced to the point count when the corpus is smaller.
    pub fn fit(points: &[[f32; 3]], k: usize, seed: u64) -> Result<(Self, Vec<usize>)> {
        if points.is_empty() {
            return Err(Error::InsufficientData(
                "cannot cluster zero points".to_string(),
            ));
        }

        let k = k.min(points.len()).max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = plus_plus_init(points, k, &mut rng);
        let mut labels = vec![0usize; points.len()];

        for _ in 0..MAX_ITERATIONS {
            let mut changed = false;
            for (idx, point) in points.iter().enumerate() {
                let nearest = nearest_centroid(point, &centroids);
                if labels[idx] != nearest {
                    labels[idx] = nearest;
                    changed = true;
                }
            }

            // Recompute centroids; re-seed empties to the worst-fit point
            let mut sums = vec![[0.0f32; 3]; k];
            let mut counts = vec![0usize; k];
            for (idx, point) in points.iter().enumerate() {
                let label = labels[idx];
                for d in 0..3 {
                    sums[label][d] += point[d];
                }
                counts[label] += 1;
            }

            for c in 0..k {
                if counts[c] == 0 {
                    let farthest = farthest_point(points, &labels, &centroids);
                    centroids[c] = points[farthest];
                    labels[farthest] = c;
                    changed = true;
                } else {
                    for d in 0..3 {
                        centroids[c][d] = sums[c][d] / counts[c] as f32;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        Ok((Self { centroids }, labels))
    }

    /// Assign one point to its nearest centroid.
    pub fn predict(&self, point: &[f32; 3]) -> usize {
        nearest_centroid(point, &self.centroids)
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

/// k-means++ seeding: first centroid uniform, the rest proportional to
/// squared distance from the nearest chosen centroid.
fn plus_plus_init(points: &[[f32; 3]], k: usize, rng: &mut StdRng) -> Vec<[f32; 3]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f32> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f32::INFINITY, f32::min)
            })
            .collect();
        let total: f32 = weights.iter().sum();

        if total <= 0.0 {
            // All remaining points coincide with a centroid
            centroids.push(points[rng.random_range(0..points.len())]);
            continue;
        }

        let mut threshold = rng.random_range(0.0..total);
        let mut chosen = points.len() - 1;
        for (idx, weight) in weights.iter().enumerate() {
            if threshold <= *weight {
                chosen = idx;
                break;
            }
            threshold -= weight;
        }
        centroids.push(points[chosen]);
    }

    centroids
}

fn nearest_centroid(point: &[f32; 3], centroids: &[[f32; 3]]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

fn farthest_point(points: &[[f32; 3]], labels: &[usize], centroids: &[[f32; 3]]) -> usize {
    let mut worst = 0;
    let mut worst_dist = -1.0f32;
    for (idx, point) in points.iter().enumerate() {
        let dist = squared_distance(point, &centroids[labels[idx]]);
        if dist > worst_dist {
            worst_dist = dist;
            worst = idx;
        }
    }
    worst
}

fn squared_distance(p: &[f32; 3], q: &[f32; 3]) -> f32 {
    (0..3).map(|d| (p[d] - q[d]).powi(2)).sum()
}
