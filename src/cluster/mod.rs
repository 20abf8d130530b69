//! Agglomerative clustering of identities by IBD dissimilarity.
//!
//! Bottom-up: start with each identity as its own cluster, repeatedly merge
//! the two closest clusters until one remains. The merge history forms a
//! **dendrogram**, a binary tree you can cut at any height to get k groups.
//!
//! **Linkage methods** determine "distance between clusters":
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min(pairwise) | Chaining; elongated clusters |
//! | Complete | max(pairwise) | Compact, spherical clusters |
//! | Average | mean(pairwise) | Balanced compromise |
//! | Ward | Variance increase | Minimizes within-cluster variance |
//!
//! Ward is the default: close relatives share long segments, giving tight
//! low-variance groups that Ward keeps together before joining families.
//!
//! ## Usage
//!
//! ```rust
//! use ibd_dendrogram::cluster::{Clustering, HierarchicalClustering, LinkageEngine};
//! use ibd_dendrogram::matrix::{DistanceMatrixBuilder, PairwiseRecord};
//!
//! let records = vec![
//!     PairwiseRecord::new("A", "B", 10.0),
//!     PairwiseRecord::new("C", "D", 12.0),
//! ];
//! let (_ids, matrix) = DistanceMatrixBuilder::new(5.0).build(&records).unwrap();
//!
//! let tree = LinkageEngine::new().cluster(&matrix).unwrap();
//! assert_eq!(tree.n_merges(), 3);
//!
//! let labels = HierarchicalClustering::new(2).fit_predict(&matrix).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod hierarchical;
mod linkage;
mod traits;

pub use hierarchical::HierarchicalClustering;
pub use linkage::{Linkage, LinkageEngine, DEFAULT_SYMMETRY_TOLERANCE};
pub use traits::Clustering;
