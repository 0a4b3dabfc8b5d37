//! Nonlinear 3-D projector.
//!
//! A compact UMAP-family embedding: cosine kNN graph, fuzzy edge weights
//! calibrated per point (smooth-kNN), and a seeded stochastic layout using
//! the standard low-dimensional attraction/repulsion curve. Deterministic
//! for a fixed seed. The fitted model keeps its training vectors so a
//! single new point can be placed later without refitting.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::cosine_similarity;

/// Layout epochs for the stochastic optimisation.
const N_EPOCHS: usize = 200;

/// Negative samples per attractive update.
const NEGATIVE_SAMPLES: usize = 5;

/// Gradient clip bound, matching the reference implementation.
const GRAD_CLIP: f32 = 4.0;

/// Edges below this weight are dropped from the optimisation.
const MIN_EDGE_WEIGHT: f32 = 1e-4;

/// Projector hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectorParams {
    pub n_neighbors: usize,
    pub min_dist: f32,
    pub seed: u64,
}

impl Default for ProjectorParams {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            seed: 42,
        }
    }
}

/// A fitted projector: hyperparameters, training vectors, and their layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedProjector {
    pub params: ProjectorParams,
    /// Effective neighbourhood size after clamping to the corpus size.
    pub effective_neighbors: usize,
    pub training_data: Vec<Vec<f32>>,
    pub points: Vec<[f32; 3]>,
}

impl FittedProjector {
    /// Fit the projector over the full corpus and return per-input 3-D
    /// points in input order.
    ///
    /// Requires at least two vectors. The neighbourhood size is clamped to
    /// `[2, M-1]`; corpora no larger than the neighbourhood use a random
    /// initialisation because the graph is too dense for a meaningful
    /// spectral/PCA starting layout.
    pub fn fit(data: &[Vec<f32>], params: ProjectorParams) -> Result<Self> {
        let m = data.len();
        if m < 2 {
            return Err(Error::InsufficientData(
                "at least 2 embeddings required to fit the projector".to_string(),
            ));
        }

        // Clamp the neighbourhood to the corpus: at most M-1 real
        // neighbours exist, and below 2 the graph carries no structure.
        let k = params.n_neighbors.min((m - 1).max(2));
        let mut rng = StdRng::seed_from_u64(params.seed);

        let edges = fuzzy_graph(data, k);
        let (a, b) = fit_curve(params.min_dist);

        let mut points = if m <= k + 1 {
            random_init(m, &mut rng)
        } else {
            pca_init(data)
        };

        optimize_layout(&mut points, &edges, a, b, &mut rng);

        Ok(Self {
            params,
            effective_neighbors: k,
            training_data: data.to_vec(),
            points,
        })
    }

    /// Place one new vector by distance-weighted interpolation over its
    /// nearest training points.
    pub fn transform(&self, vector: &[f32]) -> [f32; 3] {
        let k = self.effective_neighbors.min(self.training_data.len());
        let mut scored: Vec<(usize, f32)> = self
            .training_data
            .iter()
            .enumerate()
            .map(|(i, train)| (i, 1.0 - cosine_similarity(vector, train)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut out = [0.0f32; 3];
        let mut total = 0.0f32;
        for &(idx, dist) in scored.iter().take(k) {
            let weight = 1.0 / (dist + 1e-3);
            for d in 0..3 {
                out[d] += self.points[idx][d] * weight;
            }
            total += weight;
        }
        if total > 0.0 {
            for coord in &mut out {
                *coord /= total;
            }
        }
        out
    }
}

/// Centre points on their mean and scale so the maximum absolute coordinate
/// equals `scale`. Degenerate data (all points coincident) stays at the
/// origin.
pub fn normalize_coordinates(points: &[[f32; 3]], scale: f32) -> Vec<[f32; 3]> {
    if points.is_empty() {
        return vec![];
    }

    let mut mean = [0.0f32; 3];
    for p in points {
        for d in 0..3 {
            mean[d] += p[d];
        }
    }
    for m in &mut mean {
        *m /= points.len() as f32;
    }

    let centered: Vec<[f32; 3]> = points
        .iter()
        .map(|p| [p[0] - mean[0], p[1] - mean[1], p[2] - mean[2]])
        .collect();

    let max_abs = centered
        .iter()
        .flat_map(|p| p.iter())
        .fold(0.0f32, |acc, v| acc.max(v.abs()));

    if max_abs == 0.0 {
        return centered;
    }

    let factor = scale / max_abs;
    centered
        .iter()
        .map(|p| [p[0] * factor, p[1] * factor, p[2] * factor])
        .collect()
}

// ============================================================================
// GRAPH CONSTRUCTION
// ============================================================================

struct Edge {
    i: usize,
    j: usize,
    weight: f32,
}

/// Build the symmetrised fuzzy kNN graph.
fn fuzzy_graph(data: &[Vec<f32>], k: usize) -> Vec<Edge> {
    let m = data.len();
    let target = (k as f32).log2();

    // Directed membership strengths
    let mut directed = vec![vec![0.0f32; m]; m];
    for i in 0..m {
        let mut dists: Vec<(usize, f32)> = (0..m)
            .filter(|&j| j != i)
            .map(|j| (j, 1.0 - cosine_similarity(&data[i], &data[j])))
            .collect();
        dists.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        dists.truncate(k);

        let rho = dists.first().map(|&(_, d)| d).unwrap_or(0.0);
        let sigma = calibrate_sigma(&dists, rho, target);

        for &(j, dist) in &dists {
            let weight = (-((dist - rho).max(0.0)) / sigma).exp();
            directed[i][j] = weight;
        }
    }

    // Fuzzy union: w = w_ij + w_ji - w_ij * w_ji
    let mut edges = Vec::new();
    for i in 0..m {
        for j in (i + 1)..m {
            let wij = directed[i][j];
            let wji = directed[j][i];
            let weight = wij + wji - wij * wji;
            if weight > MIN_EDGE_WEIGHT {
                edges.push(Edge { i, j, weight });
            }
        }
    }
    edges
}

/// Binary search the per-point bandwidth so neighbour weights sum to
/// log2(k), the smooth-kNN calibration.
fn calibrate_sigma(dists: &[(usize, f32)], rho: f32, target: f32) -> f32 {
    let mut lo = 1e-4f32;
    let mut hi = 100.0f32;
    let mut sigma = 1.0f32;

    for _ in 0..64 {
        let sum: f32 = dists
            .iter()
            .map(|&(_, d)| (-((d - rho).max(0.0)) / sigma).exp())
            .sum();
        if (sum - target).abs() < 1e-5 {
            break;
        }
        if sum > target {
            hi = sigma;
            sigma = (lo + hi) / 2.0;
        } else {
            lo = sigma;
            sigma = if hi < 100.0 { (lo + hi) / 2.0 } else { sigma * 2.0 };
        }
    }
    sigma.max(1e-4)
}

// ============================================================================
// INITIALISATION
// ============================================================================

fn random_init(m: usize, rng: &mut StdRng) -> Vec<[f32; 3]> {
    (0..m)
        .map(|_| {
            [
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            ]
        })
        .collect()
}

/// PCA initialisation via power iteration with deflation: project the
/// centred data onto its top three principal directions and rescale to the
/// layout box.
fn pca_init(data: &[Vec<f32>]) -> Vec<[f32; 3]> {
    let m = data.len();
    let dim = data[0].len();

    let mut mean = vec![0.0f32; dim];
    for row in data {
        for (acc, v) in mean.iter_mut().zip(row.iter()) {
            *acc += v;
        }
    }
    for v in &mut mean {
        *v /= m as f32;
    }

    let centered: Vec<Vec<f32>> = data
        .iter()
        .map(|row| row.iter().zip(mean.iter()).map(|(v, mu)| v - mu).collect())
        .collect();

    let mut components: Vec<Vec<f32>> = Vec::with_capacity(3);
    for c in 0..3 {
        // Deterministic start vector, distinct per component
        let mut v: Vec<f32> = (0..dim)
            .map(|i| if i % 3 == c { 1.0 } else { 0.1 })
            .collect();

        for _ in 0..50 {
            // w = X^T (X v), computed row-wise to avoid a dim x dim matrix
            let mut w = vec![0.0f32; dim];
            for row in &centered {
                let dot: f32 = row.iter().zip(v.iter()).map(|(x, y)| x * y).sum();
                for (acc, x) in w.iter_mut().zip(row.iter()) {
                    *acc += dot * x;
                }
            }
            // Deflate previously found components
            for prev in &components {
                let dot: f32 = w.iter().zip(prev.iter()).map(|(x, y)| x * y).sum();
                for (acc, p) in w.iter_mut().zip(prev.iter()) {
                    *acc -= dot * p;
                }
            }
            let norm: f32 = w.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-9 {
                break;
            }
            for (dst, x) in v.iter_mut().zip(w.iter()) {
                *dst = x / norm;
            }
        }
        components.push(v);
    }

    let raw: Vec<[f32; 3]> = centered
        .iter()
        .map(|row| {
            let mut p = [0.0f32; 3];
            for (d, comp) in components.iter().enumerate() {
                p[d] = row.iter().zip(comp.iter()).map(|(x, y)| x * y).sum();
            }
            p
        })
        .collect();

    normalize_coordinates(&raw, 10.0)
}

// ============================================================================
// LAYOUT OPTIMISATION
// ============================================================================

/// Stochastic layout with the 1 / (1 + a d^{2b}) low-dimensional curve.
fn optimize_layout(points: &mut [[f32; 3]], edges: &[Edge], a: f32, b: f32, rng: &mut StdRng) {
    let m = points.len();
    let max_weight = edges.iter().map(|e| e.weight).fold(0.0f32, f32::max);
    if max_weight == 0.0 {
        return;
    }

    for epoch in 0..N_EPOCHS {
        let alpha = 1.0 * (1.0 - epoch as f32 / N_EPOCHS as f32);

        for edge in edges {
            // Sample edges proportionally to their membership strength
            if rng.random_range(0.0..1.0) > edge.weight / max_weight {
                continue;
            }

            apply_attraction(points, edge.i, edge.j, a, b, alpha);

            for _ in 0..NEGATIVE_SAMPLES {
                let other = rng.random_range(0..m);
                if other == edge.i || other == edge.j {
                    continue;
                }
                apply_repulsion(points, edge.i, other, a, b, alpha);
            }
        }
    }
}

fn apply_attraction(points: &mut [[f32; 3]], i: usize, j: usize, a: f32, b: f32, alpha: f32) {
    let d2 = squared_distance(&points[i], &points[j]);
    if d2 <= 0.0 {
        return;
    }
    let coeff = (-2.0 * a * b * d2.powf(b - 1.0)) / (1.0 + a * d2.powf(b));
    for d in 0..3 {
        let grad = (coeff * (points[i][d] - points[j][d])).clamp(-GRAD_CLIP, GRAD_CLIP);
        points[i][d] += alpha * grad;
        points[j][d] -= alpha * grad;
    }
}

fn apply_repulsion(points: &mut [[f32; 3]], i: usize, other: usize, a: f32, b: f32, alpha: f32) {
    let d2 = squared_distance(&points[i], &points[other]);
    let coeff = (2.0 * b) / ((0.001 + d2) * (1.0 + a * d2.powf(b)));
    for d in 0..3 {
        let grad = (coeff * (points[i][d] - points[other][d])).clamp(-GRAD_CLIP, GRAD_CLIP);
        points[i][d] += alpha * grad;
    }
}

fn squared_distance(p: &[f32; 3], q: &[f32; 3]) -> f32 {
    (0..3).map(|d| (p[d] - q[d]).powi(2)).sum()
}

// ============================================================================
// CURVE FIT
// ============================================================================

/// Fit the (a, b) pair so 1 / (1 + a x^{2b}) approximates the target
/// membership curve for the configured min_dist: flat at 1 inside
/// min_dist, exponential decay outside. Coarse grid search with one
/// refinement pass; deterministic.
fn fit_curve(min_dist: f32) -> (f32, f32) {
    let xs: Vec<f32> = (1..=300).map(|i| i as f32 * 0.01).collect();
    let targets: Vec<f32> = xs
        .iter()
        .map(|&x| if x <= min_dist { 1.0 } else { (-(x - min_dist)).exp() })
        .collect();

    let error = |a: f32, b: f32| -> f32 {
        xs.iter()
            .zip(targets.iter())
            .map(|(&x, &t)| {
                let y = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (y - t).powi(2)
            })
            .sum()
    };

    let mut best = (1.0f32, 1.0f32);
    let mut best_err = f32::INFINITY;
    for ai in 1..=60 {
        let a = ai as f32 * 0.1;
        for bi in 1..=30 {
            let b = bi as f32 * 0.1;
            let e = error(a, b);
            if e < best_err {
                best_err = e;
                best = (a, b);
            }
        }
    }

    // Refine around the coarse winner
    let (ca, cb) = best;
    for ai in -10..=10 {
        let a = (ca + ai as f32 * 0.01).max(0.01);
        for bi in -10..=10 {
            let b = (cb + bi as f32 * 0.01).max(0.05);
            let e = error(a, b);
            if e < best_err {
                best_err = e;
                best = (a, b);
            }
        }
    }

    best
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(clusters: usize, per_cluster: usize, dim: usize) -> Vec<Vec<f32>> {
        // Well-separated synthetic clusters along distinct axes
        let mut data = Vec::new();
        for c in 0..clusters {
            for i in 0..per_cluster {
                let mut v = vec![0.01f32; dim];
                v[c % dim] = 1.0;
                v[(c + 7) % dim] = 0.2 + (i as f32) * 0.01;
                data.push(v);
            }
        }
        data
    }

    #[test]
    fn test_fit_rejects_single_point() {
        let err = FittedProjector::fit(&[vec![1.0, 0.0]], ProjectorParams::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = corpus(3, 4, 16);
        let a = FittedProjector::fit(&data, ProjectorParams::default()).unwrap();
        let b = FittedProjector::fit(&data, ProjectorParams::default()).unwrap();
        assert_eq!(a.points, b.points);
    }

    #[test]
    fn test_points_are_finite() {
        let data = corpus(3, 6, 16);
        let fitted = FittedProjector::fit(&data, ProjectorParams::default()).unwrap();
        assert_eq!(fitted.points.len(), data.len());
        for p in &fitted.points {
            assert!(p.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_tiny_corpus_uses_random_init_without_panicking() {
        // M = 2 sits at the neighbourhood floor and takes the random-init path
        let data = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        let fitted = FittedProjector::fit(&data, ProjectorParams::default()).unwrap();
        assert_eq!(fitted.points.len(), 2);
        for p in &fitted.points {
            assert!(p.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_similar_points_land_closer_than_dissimilar() {
        let data = corpus(2, 8, 16);
        let fitted = FittedProjector::fit(&data, ProjectorParams::default()).unwrap();
        let points = normalize_coordinates(&fitted.points, 10.0);

        // Mean intra-cluster vs inter-cluster layout distance
        let dist = |p: &[f32; 3], q: &[f32; 3]| -> f32 { squared_distance(p, q).sqrt() };
        let mut intra = 0.0;
        let mut intra_n = 0;
        let mut inter = 0.0;
        let mut inter_n = 0;
        for i in 0..16 {
            for j in (i + 1)..16 {
                if (i < 8) == (j < 8) {
                    intra += dist(&points[i], &points[j]);
                    intra_n += 1;
                } else {
                    inter += dist(&points[i], &points[j]);
                    inter_n += 1;
                }
            }
        }
        let intra = intra / intra_n as f32;
        let inter = inter / inter_n as f32;
        assert!(
            intra < inter,
            "mean intra-cluster {} should be under mean inter-cluster {}",
            intra,
            inter
        );
    }

    #[test]
    fn test_transform_places_known_point_near_its_layout() {
        let data = corpus(2, 8, 16);
        let fitted = FittedProjector::fit(&data, ProjectorParams::default()).unwrap();

        let placed = fitted.transform(&data[0]);
        let dist = squared_distance(&placed, &fitted.points[0]).sqrt();
        let far = squared_distance(&placed, &fitted.points[8]).sqrt();
        assert!(dist < far);
    }

    #[test]
    fn test_normalize_centers_and_scales() {
        let points = vec![[1.0, 1.0, 1.0], [3.0, 1.0, 1.0]];
        let normalized = normalize_coordinates(&points, 10.0);

        // Centred: mean is origin
        let mean_x: f32 = normalized.iter().map(|p| p[0]).sum::<f32>() / 2.0;
        assert!(mean_x.abs() < 1e-5);

        // Scaled: max |coord| == 10
        let max_abs = normalized
            .iter()
            .flat_map(|p| p.iter())
            .fold(0.0f32, |acc, v| acc.max(v.abs()));
        assert!((max_abs - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_degenerate_stays_at_origin() {
        let points = vec![[2.0, 2.0, 2.0], [2.0, 2.0, 2.0]];
        let normalized = normalize_coordinates(&points, 10.0);
        for p in normalized {
            assert_eq!(p, [0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_curve_fit_matches_known_min_dist() {
        // For min_dist = 0.1 the reference values are a ~ 1.577, b ~ 0.895
        let (a, b) = fit_curve(0.1);
        assert!((a - 1.577).abs() < 0.25, "a = {}", a);
        assert!((b - 0.895).abs() < 0.15, "b = {}", b);
    }
}
