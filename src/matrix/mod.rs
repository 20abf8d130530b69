//! Dense dissimilarity matrices built from sparse IBD sharing.
//!
//! The pairwise table only lists pairs that share at least one detected
//! segment. Clustering needs a distance for *every* pair, so the builder
//! fills the gaps with a fixed "no detected sharing" distance:
//!
//! ```text
//! d(i, i) = 0
//! d(i, j) = 1 / L(i, j)              record of L cM exists for {i, j}
//! d(i, j) = 1 / (cm_threshold / 2)   no record
//! ```
//!
//! Longer shared segments mean closer relatives, so the reciprocal turns
//! sharing into dissimilarity. Half the detection threshold is the longest
//! segment that could have gone undetected, which makes its reciprocal the
//! largest distance the table can express.
//!
//! # Condensed form
//!
//! Linkage routines work on the upper triangle, row-major, without the
//! diagonal (the SciPy `squareform` layout):
//!
//! ```text
//!     0   1   2   3
//! 0 [ .  c0  c1  c2 ]
//! 1 [     .  c3  c4 ]       condensed = [c0, c1, c2, c3, c4, c5]
//! 2 [         .  c5 ]
//! ```

mod builder;

pub use builder::{
    DistanceMatrixBuilder, DistanceStrategy, FallbackReporter, MatrixConfig, ReciprocalLength,
    TracingReporter, DEFAULT_CM_THRESHOLD,
};

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the pairwise sharing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseRecord {
    /// Identity in the first pair column.
    #[serde(rename = "pair_1")]
    pub id_a: String,
    /// Identity in the second pair column.
    #[serde(rename = "pair_2")]
    pub id_b: String,
    /// Shared IBD length in centimorgans.
    #[serde(rename = "length")]
    pub length_cm: f64,
}

impl PairwiseRecord {
    /// Create a record.
    pub fn new(id_a: impl Into<String>, id_b: impl Into<String>, length_cm: f64) -> Self {
        Self {
            id_a: id_a.into(),
            id_b: id_b.into(),
            length_cm,
        }
    }
}

/// Ordered identities; position `i` names row and column `i` of the matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityIndex {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IdentityIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from identities, rejecting duplicates.
    pub fn from_ids<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for id in ids {
            let id = id.into();
            if index.contains(&id) {
                return Err(Error::invalid(format!("identity '{id}' appears twice")));
            }
            index.insert(id);
        }
        Ok(index)
    }

    /// Insert `id` if absent; returns its position either way.
    pub fn insert(&mut self, id: impl Into<String>) -> usize {
        let id = id.into();
        if let Some(&pos) = self.positions.get(&id) {
            return pos;
        }
        let pos = self.ids.len();
        self.positions.insert(id.clone(), pos);
        self.ids.push(id);
        pos
    }

    /// Position of `id`, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// True if `id` is indexed.
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Identity at `pos`.
    pub fn get(&self, pos: usize) -> Option<&str> {
        self.ids.get(pos).map(String::as_str)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no identities are indexed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identities in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Identities in index order, as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }
}

/// Square dissimilarity matrix.
///
/// Construction through [`DistanceMatrixBuilder`] guarantees symmetry,
/// non-negativity, and a zero diagonal. Matrices read from elsewhere
/// ([`DissimilarityMatrix::from_rows`]) are only shape-checked; the linkage
/// engine validates the remaining invariants before clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMatrix {
    data: Array2<f64>,
}

impl DissimilarityMatrix {
    /// All-zero `n x n` matrix.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: Array2::zeros((n, n)),
        }
    }

    /// Wrap an existing array. Fails if it is not square.
    pub fn from_array(data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(Error::invalid(format!(
                "matrix is not square: {rows} rows x {cols} columns"
            )));
        }
        Ok(Self { data })
    }

    /// Build from row vectors. Fails if any row length differs from the row count.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(Error::invalid(format!(
                "matrix is not square: row {i} has {} columns, expected {n}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((n, n), flat)
            .map_err(|e| Error::invalid(format!("matrix shape: {e}")))?;
        Ok(Self { data })
    }

    /// Rebuild a full matrix from its condensed upper triangle.
    pub fn from_condensed(condensed: &[f64], n: usize) -> Result<Self> {
        let expected = condensed_len(n);
        if condensed.len() != expected {
            return Err(Error::invalid(format!(
                "condensed vector has {} entries, expected {expected} for {n} identities",
                condensed.len()
            )));
        }
        let mut data = Array2::zeros((n, n));
        let mut k = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                data[[i, j]] = condensed[k];
                data[[j, i]] = condensed[k];
                k += 1;
            }
        }
        Ok(Self { data })
    }

    /// Upper triangle, row-major, diagonal excluded.
    pub fn to_condensed(&self) -> Vec<f64> {
        let n = self.len();
        let mut condensed = Vec::with_capacity(condensed_len(n));
        for i in 0..n {
            for j in (i + 1)..n {
                condensed.push(self.data[[i, j]]);
            }
        }
        condensed
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// True for a 0 x 0 matrix.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    pub(crate) fn set_symmetric(&mut self, i: usize, j: usize, value: f64) {
        self.data[[i, j]] = value;
        self.data[[j, i]] = value;
    }

    /// Row `i` as a vector.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.data.row(i).to_vec()
    }

    /// Underlying array.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Check symmetry (within `tolerance`, relative to magnitude), a zero
    /// diagonal, and finite non-negative entries.
    pub fn validate(&self, tolerance: f64) -> Result<()> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(Error::invalid(format!(
                "symmetry tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        let n = self.len();
        for i in 0..n {
            let diag = self.data[[i, i]];
            if diag != 0.0 {
                return Err(Error::invalid(format!(
                    "diagonal entry ({i}, {i}) is {diag}, expected 0"
                )));
            }
            for j in (i + 1)..n {
                let upper = self.data[[i, j]];
                let lower = self.data[[j, i]];
                for (r, c, v) in [(i, j, upper), (j, i, lower)] {
                    if !v.is_finite() || v < 0.0 {
                        return Err(Error::invalid(format!(
                            "entry ({r}, {c}) is {v}, expected a finite non-negative distance"
                        )));
                    }
                }
                let scale = upper.abs().max(lower.abs()).max(1.0);
                if (upper - lower).abs() > tolerance * scale {
                    return Err(Error::invalid(format!(
                        "matrix is not symmetric: ({i}, {j}) = {upper} but ({j}, {i}) = {lower}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Length of the condensed form for `n` identities: n choose 2.
#[inline]
pub fn condensed_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Position of `(i, j)`, `i < j`, inside a condensed vector for `n` identities.
#[inline]
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    n * i - i * (i + 1) / 2 + (j - i - 1)
}
