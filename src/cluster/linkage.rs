//! Agglomerative linkage over a precomputed dissimilarity matrix.
//!
//! Every linkage here is expressed as a Lance–Williams update: after
//! merging clusters `a` and `b`, the distance from the new cluster to any
//! other active cluster `k` is computed from `d(a,k)`, `d(b,k)`, `d(a,b)`
//! and the three cluster sizes, never from the raw items.
//!
//! | Linkage | Update |
//! |---------|--------|
//! | Single | `min(d(a,k), d(b,k))` |
//! | Complete | `max(d(a,k), d(b,k))` |
//! | Average | `(nₐ d(a,k) + nᵦ d(b,k)) / (nₐ + nᵦ)` |
//! | Ward | `sqrt(((nₐ+nₖ) d(a,k)² + (nᵦ+nₖ) d(b,k)² − nₖ d(a,b)²) / (nₐ+nᵦ+nₖ))` |
//!
//! Ward is applied to plain (not squared) dissimilarities, so merge heights
//! match SciPy's `linkage(..., method="ward")`.
//!
//! # Ties
//!
//! When several active pairs share the minimum distance exactly, the pair
//! with the lowest `(smaller id, larger id)` cluster ids wins. Leaves are
//! `0..n`, merge step `s` creates cluster `n + s`, so older clusters win ties.
//!
//! # Complexity
//!
//! O(n³) time (a full scan of the active pairs per merge), O(n²) memory for
//! the condensed working copy.

use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use crate::matrix::{condensed_index, DissimilarityMatrix};

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage (UPGMA): mean distance between clusters.
    Average,
    /// Ward's method: minimize within-cluster variance.
    #[default]
    Ward,
}

impl Linkage {
    /// Lance–Williams update for the distance from `a ∪ b` to `k`.
    #[inline]
    fn update(self, d_ak: f64, d_bk: f64, d_ab: f64, n_a: f64, n_b: f64, n_k: f64) -> f64 {
        match self {
            Linkage::Single => d_ak.min(d_bk),
            Linkage::Complete => d_ak.max(d_bk),
            Linkage::Average => (n_a * d_ak + n_b * d_bk) / (n_a + n_b),
            Linkage::Ward => {
                let num = (n_a + n_k) * d_ak * d_ak + (n_b + n_k) * d_bk * d_bk
                    - n_k * d_ab * d_ab;
                // Rounding can push the radicand a hair below zero when the
                // three clusters are (nearly) equidistant.
                (num / (n_a + n_b + n_k)).max(0.0).sqrt()
            }
        }
    }
}

impl std::str::FromStr for Linkage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "average" => Ok(Linkage::Average),
            "ward" => Ok(Linkage::Ward),
            other => Err(Error::invalid(format!(
                "unknown linkage '{other}' (expected single, complete, average or ward)"
            ))),
        }
    }
}

/// Default tolerance for the symmetry check, relative to entry magnitude.
pub const DEFAULT_SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Turns a [`DissimilarityMatrix`] into a [`Dendrogram`].
///
/// ```rust
/// use ibd_dendrogram::cluster::LinkageEngine;
/// use ibd_dendrogram::matrix::DissimilarityMatrix;
///
/// let m = DissimilarityMatrix::from_rows(&[
///     vec![0.0, 0.1, 0.4],
///     vec![0.1, 0.0, 0.4],
///     vec![0.4, 0.4, 0.0],
/// ]).unwrap();
///
/// let tree = LinkageEngine::new().cluster(&m).unwrap();
/// let first = tree.merges().next().unwrap();
/// assert_eq!((first.cluster_a, first.cluster_b), (0, 1));
/// assert_eq!(tree.n_merges(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkageEngine {
    linkage: Linkage,
    tolerance: f64,
}

impl Default for LinkageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkageEngine {
    /// Ward linkage, default symmetry tolerance.
    pub fn new() -> Self {
        Self {
            linkage: Linkage::Ward,
            tolerance: DEFAULT_SYMMETRY_TOLERANCE,
        }
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set the symmetry tolerance used when validating input.
    ///
    /// A negative or non-finite tolerance makes [`LinkageEngine::cluster`]
    /// fail with [`Error::InvalidInput`].
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Linkage in use.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Cluster the matrix. The matrix is only read.
    pub fn cluster(&self, matrix: &DissimilarityMatrix) -> Result<Dendrogram> {
        let n = matrix.len();
        if n < 2 {
            return Err(Error::InsufficientData {
                found: n,
                required: 2,
            });
        }
        matrix.validate(self.tolerance)?;

        let mut dist = matrix.to_condensed();
        // slot -> current cluster id; slots are reused by merged clusters.
        let mut label: Vec<usize> = (0..n).collect();
        let mut size: Vec<usize> = vec![1; n];
        let mut active: Vec<bool> = vec![true; n];

        let mut dendro = Dendrogram::new(n);
        let mut last_height = 0.0_f64;
        for step in 0..(n - 1) {
            let (p, q, d_pq) = closest_pair(&dist, &label, &active, n);

            let (id_p, id_q) = (label[p], label[q]);
            let (n_p, n_q) = (size[p] as f64, size[q] as f64);
            for k in (0..n).filter(|&k| active[k] && k != p && k != q) {
                let d_pk = dist[pair_index(n, p, k)];
                let d_qk = dist[pair_index(n, q, k)];
                dist[pair_index(n, p, k)] =
                    self.linkage
                        .update(d_pk, d_qk, d_pq, n_p, n_q, size[k] as f64);
            }

            let merged = size[p] + size[q];
            // All four linkages are monotone in exact arithmetic; the
            // Lance–Williams updates can still land an ulp below the previous
            // height (e.g. averaging equal distances), so heights are floored
            // at the last one recorded.
            let height = d_pq.max(last_height);
            last_height = height;
            dendro.add_merge(id_p.min(id_q), id_p.max(id_q), height, merged);

            // The new cluster takes over slot p.
            active[q] = false;
            label[p] = n + step;
            size[p] = merged;
        }

        tracing::info!(
            identities = n,
            linkage = ?self.linkage,
            root_height = dendro.distances().last().copied().unwrap_or(0.0),
            "clustered distance matrix"
        );
        Ok(dendro)
    }
}

/// Active slot pair `(p, q)` with minimum distance, ties to the lowest
/// cluster-id pair.
fn closest_pair(dist: &[f64], label: &[usize], active: &[bool], n: usize) -> (usize, usize, f64) {
    let mut best: Option<(f64, (usize, usize), usize, usize)> = None;
    for p in (0..n).filter(|&p| active[p]) {
        for q in ((p + 1)..n).filter(|&q| active[q]) {
            let d = dist[condensed_index(n, p, q)];
            let ids = (label[p].min(label[q]), label[p].max(label[q]));
            let better = match best {
                None => true,
                Some((bd, bids, _, _)) => d < bd || (d == bd && ids < bids),
            };
            if better {
                best = Some((d, ids, p, q));
            }
        }
    }
    // n >= 2 and one merge per step leaves at least two active slots here.
    let (d, _, p, q) = best.unwrap_or((0.0, (0, 0), 0, 0));
    (p, q, d)
}

#[inline]
fn pair_index(n: usize, i: usize, j: usize) -> usize {
    if i < j {
        condensed_index(n, i, j)
    } else {
        condensed_index(n, j, i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> DissimilarityMatrix {
        DissimilarityMatrix::from_rows(&[
            vec![0.0, 0.1, 0.4],
            vec![0.1, 0.0, 0.4],
            vec![0.4, 0.4, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_ward_three_points() {
        let tree = LinkageEngine::new().cluster(&three()).unwrap();
        let merges: Vec<_> = tree.merges().copied().collect();
        assert_eq!(merges.len(), 2);

        assert_eq!((merges[0].cluster_a, merges[0].cluster_b), (0, 1));
        assert_eq!(merges[0].distance, 0.1);
        assert_eq!(merges[0].size, 2);

        assert_eq!((merges[1].cluster_a, merges[1].cluster_b), (2, 3));
        assert_eq!(merges[1].size, 3);
        // sqrt((2 * 0.16 + 2 * 0.16 - 0.01) / 3)
        let expected = ((2.0 * 0.16 + 2.0 * 0.16 - 0.01) / 3.0_f64).sqrt();
        assert!((merges[1].distance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_other_linkages_three_points() {
        let m = three();
        for (linkage, top) in [
            (Linkage::Single, 0.4),
            (Linkage::Complete, 0.4),
            (Linkage::Average, 0.4),
        ] {
            let tree = LinkageEngine::new().with_linkage(linkage).cluster(&m).unwrap();
            assert_eq!(tree.distances(), vec![0.1, top], "{linkage:?}");
        }
    }

    #[test]
    fn test_ties_break_to_lowest_ids() {
        // Every pair equidistant.
        let m = DissimilarityMatrix::from_rows(&[
            vec![0.0, 1.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0, 1.0],
            vec![1.0, 1.0, 0.0, 1.0],
            vec![1.0, 1.0, 1.0, 0.0],
        ])
        .unwrap();
        let tree = LinkageEngine::new()
            .with_linkage(Linkage::Single)
            .cluster(&m)
            .unwrap();
        let pairs: Vec<_> = tree.merges().map(|m| (m.cluster_a, m.cluster_b)).collect();
        assert_eq!(pairs, vec![(0, 1), (2, 3), (4, 5)]);
    }

    #[test]
    fn test_insufficient_data() {
        let err = LinkageEngine::new().cluster(&DissimilarityMatrix::zeros(1)).unwrap_err();
        assert!(err.is_insufficient_data());
        let err = LinkageEngine::new().cluster(&DissimilarityMatrix::zeros(0)).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_rejects_invalid_matrix() {
        let asym = DissimilarityMatrix::from_rows(&[
            vec![0.0, 0.1, 0.4],
            vec![0.2, 0.0, 0.4],
            vec![0.4, 0.4, 0.0],
        ])
        .unwrap();
        assert!(LinkageEngine::new().cluster(&asym).unwrap_err().is_invalid_input());

        let diag = DissimilarityMatrix::from_rows(&[vec![1.0, 0.1], vec![0.1, 0.0]]).unwrap();
        assert!(LinkageEngine::new().cluster(&diag).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_input_not_mutated() {
        let m = three();
        let before = m.clone();
        let _ = LinkageEngine::new().cluster(&m).unwrap();
        assert_eq!(m, before);
    }

    #[test]
    fn test_average_heights_never_drop() {
        // Averaging 0.4 with 0.4 at unequal weights can round to just under 0.4.
        let x = 0.4;
        let m = DissimilarityMatrix::from_rows(&[
            vec![0.0, 0.1, x, x, x],
            vec![0.1, 0.0, x, x, x],
            vec![x, x, 0.0, 0.2, x],
            vec![x, x, 0.2, 0.0, x],
            vec![x, x, x, x, 0.0],
        ])
        .unwrap();
        for linkage in [Linkage::Average, Linkage::Ward, Linkage::Single, Linkage::Complete] {
            let tree = LinkageEngine::new().with_linkage(linkage).cluster(&m).unwrap();
            assert!(tree.is_monotonic(), "{linkage:?}: {:?}", tree.distances());
        }
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        for tolerance in [f64::NAN, -1e-9, f64::INFINITY] {
            let err = LinkageEngine::new()
                .with_tolerance(tolerance)
                .cluster(&three())
                .unwrap_err();
            assert!(err.is_invalid_input(), "tolerance {tolerance} accepted");
        }
    }

    #[test]
    fn test_parse_linkage() {
        assert_eq!("WARD".parse::<Linkage>().unwrap(), Linkage::Ward);
        assert_eq!("average".parse::<Linkage>().unwrap(), Linkage::Average);
        assert!("centroid".parse::<Linkage>().is_err());
    }
}
