//! Sparse pairwise table to dense matrix.

use super::{DissimilarityMatrix, IdentityIndex, PairwiseRecord};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default minimum detectable segment length, in cM.
pub const DEFAULT_CM_THRESHOLD: f64 = 5.0;

/// Builder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Minimum segment length (cM) the upstream IBD caller reports.
    ///
    /// Only used to derive the "no detected sharing" distance,
    /// `1 / (cm_threshold / 2)`. Records are not filtered by it.
    pub cm_threshold: f64,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            cm_threshold: DEFAULT_CM_THRESHOLD,
        }
    }
}

impl MatrixConfig {
    fn validate(&self) -> Result<()> {
        if !self.cm_threshold.is_finite() || self.cm_threshold <= 0.0 {
            return Err(Error::invalid(format!(
                "cm_threshold must be a finite positive number, got {}",
                self.cm_threshold
            )));
        }
        Ok(())
    }
}

/// Converts shared segment length into a distance for one off-diagonal pair.
///
/// `shared_cm` is `None` when the table has no record for the pair. The
/// builder writes the diagonal itself; strategies are never asked about
/// `(i, i)`.
pub trait DistanceStrategy {
    /// Distance for a pair sharing `shared_cm` (or nothing).
    fn distance(&self, shared_cm: Option<f64>, cm_threshold: f64) -> f64;
}

/// `1 / length`, or `1 / (cm_threshold / 2)` without a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReciprocalLength;

impl DistanceStrategy for ReciprocalLength {
    #[inline]
    fn distance(&self, shared_cm: Option<f64>, cm_threshold: f64) -> f64 {
        match shared_cm {
            Some(length) => 1.0 / length,
            None => 1.0 / (cm_threshold / 2.0),
        }
    }
}

impl<F> DistanceStrategy for F
where
    F: Fn(Option<f64>, f64) -> f64,
{
    fn distance(&self, shared_cm: Option<f64>, cm_threshold: f64) -> f64 {
        self(shared_cm, cm_threshold)
    }
}

/// Receives one event per unordered pair that fell back to the
/// "no detected sharing" distance.
pub trait FallbackReporter {
    /// `id_a` and `id_b` had no record; the strategy put `distance` in the
    /// matrix for them.
    fn no_sharing(&mut self, id_a: &str, id_b: &str, distance: f64);
}

/// Emits each fallback as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FallbackReporter for TracingReporter {
    fn no_sharing(&mut self, id_a: &str, id_b: &str, distance: f64) {
        tracing::debug!(id_a, id_b, distance, "no pairwise sharing; using fallback distance");
    }
}

impl<F> FallbackReporter for F
where
    F: FnMut(&str, &str, f64),
{
    fn no_sharing(&mut self, id_a: &str, id_b: &str, distance: f64) {
        self(id_a, id_b, distance)
    }
}

/// Builds a [`DissimilarityMatrix`] from pairwise IBD records.
///
/// ```rust
/// use ibd_dendrogram::matrix::{DistanceMatrixBuilder, PairwiseRecord};
///
/// let records = vec![
///     PairwiseRecord::new("A", "B", 10.0),
///     PairwiseRecord::new("A", "C", 1.0),
/// ];
/// let (ids, matrix) = DistanceMatrixBuilder::new(5.0).build(&records).unwrap();
///
/// let (a, b, c) = (ids.position("A").unwrap(), ids.position("B").unwrap(), ids.position("C").unwrap());
/// assert_eq!(matrix.get(a, b), 0.1);
/// assert_eq!(matrix.get(b, c), 0.4); // no record: 1 / (5 / 2)
/// ```
#[derive(Debug, Clone)]
pub struct DistanceMatrixBuilder<S = ReciprocalLength> {
    config: MatrixConfig,
    strategy: S,
}

impl Default for DistanceMatrixBuilder {
    fn default() -> Self {
        Self::with_config(MatrixConfig::default())
    }
}

impl DistanceMatrixBuilder {
    /// Builder with the given threshold and the reciprocal-length strategy.
    pub fn new(cm_threshold: f64) -> Self {
        Self::with_config(MatrixConfig { cm_threshold })
    }

    /// Builder from a full configuration.
    pub fn with_config(config: MatrixConfig) -> Self {
        Self {
            config,
            strategy: ReciprocalLength,
        }
    }
}

impl<S: DistanceStrategy> DistanceMatrixBuilder<S> {
    /// Swap the distance convention.
    pub fn with_strategy<T: DistanceStrategy>(self, strategy: T) -> DistanceMatrixBuilder<T> {
        DistanceMatrixBuilder {
            config: self.config,
            strategy,
        }
    }

    /// Set the detection threshold.
    pub fn with_cm_threshold(mut self, cm_threshold: f64) -> Self {
        self.config.cm_threshold = cm_threshold;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Build the matrix, reporting fallbacks through `tracing`.
    pub fn build(&self, records: &[PairwiseRecord]) -> Result<(IdentityIndex, DissimilarityMatrix)> {
        self.build_with_reporter(records, &mut TracingReporter)
    }

    /// Build the matrix, sending every fallback pair to `reporter`.
    pub fn build_with_reporter<R: FallbackReporter + ?Sized>(
        &self,
        records: &[PairwiseRecord],
        reporter: &mut R,
    ) -> Result<(IdentityIndex, DissimilarityMatrix)> {
        self.build_with_identities(IdentityIndex::new(), records, reporter)
    }

    /// Build over `identities` plus every id the records mention.
    ///
    /// Seeded identities keep their positions and come first; identities
    /// that appear in no record end up at the fallback distance from
    /// everyone.
    pub fn build_with_identities<R: FallbackReporter + ?Sized>(
        &self,
        identities: IdentityIndex,
        records: &[PairwiseRecord],
        reporter: &mut R,
    ) -> Result<(IdentityIndex, DissimilarityMatrix)> {
        self.config.validate()?;

        let (ids, lengths) = index_records(identities, records)?;
        let n = ids.len();
        let threshold = self.config.cm_threshold;

        let mut matrix = DissimilarityMatrix::zeros(n);
        let mut fallbacks = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                let (id_i, id_j) = (&ids.as_slice()[i], &ids.as_slice()[j]);
                let shared = lengths.get(&(i, j)).copied();
                let d = self.strategy.distance(shared, threshold);
                if !d.is_finite() || d < 0.0 {
                    return Err(Error::invalid(format!(
                        "distance strategy produced {d} for pair ({id_i}, {id_j})"
                    )));
                }
                if shared.is_none() {
                    fallbacks += 1;
                    reporter.no_sharing(id_i, id_j, d);
                }
                matrix.set_symmetric(i, j, d);
            }
        }

        tracing::info!(
            identities = n,
            records = records.len(),
            fallback_pairs = fallbacks,
            "built distance matrix"
        );
        Ok((ids, matrix))
    }
}

/// Identity index extended in first-appearance order, plus lengths keyed by
/// unordered position pair `(low, high)`. First record for a pair wins.
fn index_records(
    mut ids: IdentityIndex,
    records: &[PairwiseRecord],
) -> Result<(IdentityIndex, HashMap<(usize, usize), f64>)> {
    let mut lengths = HashMap::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        if !record.length_cm.is_finite() || record.length_cm <= 0.0 {
            return Err(Error::invalid(format!(
                "record {row}: pair ({}, {}) has length {} cM, expected a finite positive length",
                record.id_a, record.id_b, record.length_cm
            )));
        }

        let a = ids.insert(record.id_a.as_str());
        let b = ids.insert(record.id_b.as_str());
        if a == b {
            tracing::warn!(
                row,
                id = record.id_a.as_str(),
                "skipping self-pair record; diagonal is always 0"
            );
            continue;
        }

        let key = if a < b { (a, b) } else { (b, a) };
        if lengths.contains_key(&key) {
            tracing::debug!(
                row,
                id_a = record.id_a.as_str(),
                id_b = record.id_b.as_str(),
                "duplicate pair record ignored"
            );
            continue;
        }
        lengths.insert(key, record.length_cm);
    }

    Ok((ids, lengths))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<PairwiseRecord> {
        vec![PairwiseRecord::new("A", "B", 10.0), PairwiseRecord::new("C", "A", 20.0)]
    }

    #[test]
    fn test_identity_order_is_first_appearance() {
        let (ids, _) = DistanceMatrixBuilder::new(5.0).build(&abc()).unwrap();
        assert_eq!(ids.as_slice(), &["A", "B", "C"]);
    }

    #[test]
    fn test_reciprocal_and_fallback() {
        let (ids, m) = DistanceMatrixBuilder::new(5.0).build(&abc()).unwrap();
        let (a, b, c) = (0, 1, 2);
        assert_eq!(ids.get(c), Some("C"));
        assert_eq!(m.get(a, b), 1.0 / 10.0);
        assert_eq!(m.get(a, c), 1.0 / 20.0);
        assert_eq!(m.get(c, a), 1.0 / 20.0);
        assert_eq!(m.get(b, c), 1.0 / 2.5);
        for i in 0..3 {
            assert_eq!(m.get(i, i), 0.0);
        }
    }

    #[test]
    fn test_first_duplicate_wins() {
        let records = vec![
            PairwiseRecord::new("A", "B", 10.0),
            PairwiseRecord::new("B", "A", 40.0),
        ];
        let (_, m) = DistanceMatrixBuilder::new(5.0).build(&records).unwrap();
        assert_eq!(m.get(0, 1), 0.1);
    }

    #[test]
    fn test_self_pair_ignored() {
        let records = vec![
            PairwiseRecord::new("A", "A", 50.0),
            PairwiseRecord::new("A", "B", 10.0),
        ];
        let (ids, m) = DistanceMatrixBuilder::new(5.0).build(&records).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(m.get(0, 0), 0.0);
        assert_eq!(m.get(0, 1), 0.1);
    }

    #[test]
    fn test_threshold_must_be_positive() {
        for t in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = DistanceMatrixBuilder::new(t).build(&abc()).unwrap_err();
            assert!(err.is_invalid_input(), "threshold {t} accepted");
        }
    }

    #[test]
    fn test_length_must_be_positive() {
        let records = vec![
            PairwiseRecord::new("A", "B", 10.0),
            PairwiseRecord::new("B", "C", 0.0),
        ];
        let err = DistanceMatrixBuilder::new(5.0).build(&records).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("record 1"), "{msg}");
        assert!(msg.contains("(B, C)"), "{msg}");
    }

    #[test]
    fn test_reporter_sees_each_missing_pair_once() {
        let records = vec![PairwiseRecord::new("A", "B", 10.0), PairwiseRecord::new("C", "D", 8.0)];
        let mut seen = Vec::new();
        let mut reporter = |a: &str, b: &str, d: f64| seen.push((a.to_string(), b.to_string(), d));
        DistanceMatrixBuilder::new(5.0)
            .build_with_reporter(&records, &mut reporter)
            .unwrap();

        // A-C, A-D, B-C, B-D at 1 / 2.5 cM
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(_, _, d)| *d == 1.0 / 2.5));
        assert!(seen.contains(&("A".into(), "C".into(), 0.4)));
    }

    #[test]
    fn test_reporter_sees_strategy_distance() {
        let mut seen = Vec::new();
        let mut reporter = |_: &str, _: &str, d: f64| seen.push(d);
        let (_, m) = DistanceMatrixBuilder::new(5.0)
            .with_strategy(|shared: Option<f64>, _t: f64| shared.map_or(1.0, |l| 1.0 / l))
            .build_with_reporter(&abc(), &mut reporter)
            .unwrap();

        assert_eq!(seen, vec![1.0]);
        assert_eq!(m.get(1, 2), 1.0);
    }

    #[test]
    fn test_custom_strategy() {
        let builder = DistanceMatrixBuilder::new(5.0)
            .with_strategy(|shared: Option<f64>, _t: f64| shared.map_or(1.0, |l| 1.0 / (1.0 + l)));
        let (_, m) = builder.build(&abc()).unwrap();
        assert_eq!(m.get(0, 1), 1.0 / 11.0);
        assert_eq!(m.get(1, 2), 1.0);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn test_strategy_output_is_checked() {
        let builder = DistanceMatrixBuilder::new(5.0).with_strategy(|_: Option<f64>, _: f64| -1.0);
        assert!(builder.build(&abc()).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_seeded_identity_without_records() {
        let seed = IdentityIndex::from_ids(["A", "B", "C"]).unwrap();
        let records = vec![PairwiseRecord::new("A", "B", 10.0)];
        let (ids, m) = DistanceMatrixBuilder::new(5.0)
            .build_with_identities(seed, &records, &mut TracingReporter)
            .unwrap();
        assert_eq!(ids.as_slice(), &["A", "B", "C"]);
        assert_eq!(m.get(0, 1), 0.1);
        assert_eq!(m.get(0, 2), 0.4);
        assert_eq!(m.get(1, 2), 0.4);
    }

    #[test]
    fn test_empty_table() {
        let (ids, m) = DistanceMatrixBuilder::default().build(&[]).unwrap();
        assert!(ids.is_empty());
        assert!(m.is_empty());
    }
}
