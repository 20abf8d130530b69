//! Flat groups from a hierarchical clustering.
//!
//! The dendrogram answers "who is related to whom, at every depth". Many
//! downstream steps just want k groups (candidate families). This cuts the
//! tree after `n - k` merges.

use super::linkage::{Linkage, LinkageEngine};
use super::traits::Clustering;
use crate::error::Result;
use crate::hierarchy::Dendrogram;
use crate::matrix::DissimilarityMatrix;

/// Hierarchical (agglomerative) clustering cut to a fixed group count.
#[derive(Debug, Clone)]
pub struct HierarchicalClustering {
    /// Number of clusters to produce.
    n_clusters: usize,
    engine: LinkageEngine,
}

impl HierarchicalClustering {
    /// Create a new hierarchical clusterer (Ward linkage).
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            engine: LinkageEngine::new(),
        }
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.engine = self.engine.with_linkage(linkage);
        self
    }

    /// Fit and return the full dendrogram.
    pub fn fit_dendrogram(&self, matrix: &DissimilarityMatrix) -> Result<Dendrogram> {
        self.engine.cluster(matrix)
    }
}

impl Clustering for HierarchicalClustering {
    fn fit_predict(&self, matrix: &DissimilarityMatrix) -> Result<Vec<usize>> {
        let dendro = self.fit_dendrogram(matrix)?;
        dendro.cut_to_k(self.n_clusters)
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{DistanceMatrixBuilder, PairwiseRecord};

    #[test]
    fn test_two_families() {
        // Two sibling pairs, no sharing across families.
        let records = vec![
            PairwiseRecord::new("A1", "A2", 2600.0),
            PairwiseRecord::new("B1", "B2", 2500.0),
        ];
        let (ids, m) = DistanceMatrixBuilder::new(5.0).build(&records).unwrap();

        let hc = HierarchicalClustering::new(2);
        let labels = hc.fit_predict(&m).unwrap();
        let at = |id: &str| labels[ids.position(id).unwrap()];

        assert_eq!(at("A1"), at("A2"));
        assert_eq!(at("B1"), at("B2"));
        assert_ne!(at("A1"), at("B1"));
        assert_eq!(hc.n_clusters(), 2);
    }

    #[test]
    fn test_dendrogram() {
        let m = DissimilarityMatrix::from_rows(&[
            vec![0.0, 1.0, 10.0],
            vec![1.0, 0.0, 9.0],
            vec![10.0, 9.0, 0.0],
        ])
        .unwrap();

        let hc = HierarchicalClustering::new(2).with_linkage(Linkage::Average);
        let dendro = hc.fit_dendrogram(&m).unwrap();

        assert_eq!(dendro.n_items(), 3);
        assert_eq!(dendro.n_merges(), 2);
        assert_eq!(dendro.distances(), vec![1.0, 9.5]);
    }
}
