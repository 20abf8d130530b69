//! Clustering traits.

use crate::error::Result;
use crate::matrix::DissimilarityMatrix;

/// Trait for clustering algorithms over a precomputed dissimilarity matrix.
pub trait Clustering {
    /// Fit the model and return cluster assignments.
    ///
    /// Returns a vector of cluster labels, one per matrix row.
    fn fit_predict(&self, matrix: &DissimilarityMatrix) -> Result<Vec<usize>>;

    /// Get the number of clusters.
    fn n_clusters(&self) -> usize;
}
