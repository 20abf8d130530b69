//! # ibd-dendrogram
//!
//! Pairwise IBD segment lengths in, pedigree-revealing dendrograms out.
//!
//! ```text
//! pairs table ──► DistanceMatrixBuilder ──► DissimilarityMatrix
//!                                                   │
//!                                            LinkageEngine (Ward)
//!                                                   │
//!                                               Dendrogram ──► DendrogramLayout ──► renderer
//! ```
//!
//! IBD segments themselves are not computed here; the input is a table of
//! already-detected shared lengths in centimorgans.
//!
//! ```rust
//! use ibd_dendrogram::{cluster_pairs, PairwiseRecord};
//!
//! let records = vec![PairwiseRecord::new("A", "B", 10.0)];
//! let run = cluster_pairs(&records, 5.0).unwrap();
//!
//! assert_eq!(run.ids.as_slice(), &["A", "B"]);
//! assert_eq!(run.matrix.get(0, 1), 0.1);
//! assert_eq!(run.tree.n_merges(), 1);
//! ```

pub mod cluster;
/// Error types used across `ibd-dendrogram`.
pub mod error;
pub mod hierarchy;
pub mod io;
pub mod matrix;

pub use cluster::{Clustering, HierarchicalClustering, Linkage, LinkageEngine};
pub use error::{Error, Result};
pub use hierarchy::{Dendrogram, DendrogramLayout, LeafCategory, Merge};
pub use matrix::{
    DissimilarityMatrix, DistanceMatrixBuilder, DistanceStrategy, FallbackReporter, IdentityIndex,
    MatrixConfig, PairwiseRecord, ReciprocalLength, TracingReporter,
};

/// Output of [`cluster_pairs`].
#[derive(Debug, Clone)]
pub struct ClusterRun {
    /// Row/column labels.
    pub ids: IdentityIndex,
    /// Dense dissimilarities.
    pub matrix: DissimilarityMatrix,
    /// Ward merge tree.
    pub tree: Dendrogram,
}

/// Build the matrix with the default reciprocal-length convention and
/// cluster it with Ward linkage.
pub fn cluster_pairs(records: &[PairwiseRecord], cm_threshold: f64) -> Result<ClusterRun> {
    let (ids, matrix) = DistanceMatrixBuilder::new(cm_threshold).build(records)?;
    let tree = LinkageEngine::new().cluster(&matrix)?;
    Ok(ClusterRun { ids, matrix, tree })
}
