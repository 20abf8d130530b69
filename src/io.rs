//! Delimited-file readers and writers.
//!
//! | File | Layout |
//! |------|--------|
//! | pairs | header row with `pair_1`, `pair_2`, `length` (extra columns ignored) |
//! | matrix | `<id>\t<d_0>\t...\t<d_{n-1}>`, no header, rows and columns in index order |
//! | linkage | `<cluster_a>\t<cluster_b>\t<distance>\t<size>`, one merge per line |
//! | leaves | `<id>\t<case\|other>`, display order |
//! | cases | one identity per line |
//!
//! Floats are written with Rust's shortest round-trip formatting, so a
//! matrix read back from disk is bit-identical to the one written.

use crate::error::{Error, Result};
use crate::hierarchy::{Dendrogram, DendrogramLayout};
use crate::matrix::{DissimilarityMatrix, IdentityIndex, PairwiseRecord};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Read pairwise records from a delimited table with a header row.
pub fn read_pairs<R: Read>(reader: R, delimiter: u8) -> Result<Vec<PairwiseRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize() {
        let record: PairwiseRecord = row?;
        records.push(record);
    }
    tracing::debug!(records = records.len(), "read pairwise table");
    Ok(records)
}

/// [`read_pairs`] from a file path.
pub fn read_pairs_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<PairwiseRecord>> {
    read_pairs(File::open(path)?, delimiter)
}

/// Write the matrix, one tab-separated row per identity, no header.
pub fn write_matrix<W: Write>(
    writer: W,
    ids: &IdentityIndex,
    matrix: &DissimilarityMatrix,
) -> Result<()> {
    if ids.len() != matrix.len() {
        return Err(Error::invalid(format!(
            "identity index has {} entries but the matrix has {} rows",
            ids.len(),
            matrix.len()
        )));
    }
    let mut out = BufWriter::new(writer);
    for (i, id) in ids.iter().enumerate() {
        write!(out, "{id}")?;
        for d in matrix.as_array().row(i) {
            write!(out, "\t{d}")?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// [`write_matrix`] to a file path.
pub fn write_matrix_path(
    path: impl AsRef<Path>,
    ids: &IdentityIndex,
    matrix: &DissimilarityMatrix,
) -> Result<()> {
    write_matrix(File::create(path)?, ids, matrix)
}

/// Parse a matrix written by [`write_matrix`].
///
/// Only the layout is checked here (square, numeric, unique ids); the
/// linkage engine checks symmetry and the diagonal.
pub fn read_matrix<R: Read>(reader: R) -> Result<(IdentityIndex, DissimilarityMatrix)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let mut ids = IdentityIndex::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let line = i + 1;
        let mut fields = row.iter();
        let id = fields.next().ok_or_else(|| Error::Parse {
            line,
            message: "empty row".into(),
        })?;
        if ids.contains(id) {
            return Err(Error::Parse {
                line,
                message: format!("identity '{id}' appears twice"),
            });
        }
        ids.insert(id);

        let values = fields
            .enumerate()
            .map(|(col, field)| {
                field.trim().parse::<f64>().map_err(|e| Error::Parse {
                    line,
                    message: format!("column {}: '{field}': {e}", col + 1),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }

    let n = rows.len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
        return Err(Error::Parse {
            line: i + 1,
            message: format!("{} distances, expected {n}", row.len()),
        });
    }
    let matrix = DissimilarityMatrix::from_rows(&rows)?;
    Ok((ids, matrix))
}

/// [`read_matrix`] from a file path.
pub fn read_matrix_path(path: impl AsRef<Path>) -> Result<(IdentityIndex, DissimilarityMatrix)> {
    read_matrix(File::open(path)?)
}

/// Write merge records as SciPy-style linkage rows.
pub fn write_linkage<W: Write>(writer: W, tree: &Dendrogram) -> Result<()> {
    let mut out = BufWriter::new(writer);
    for m in tree.merges() {
        writeln!(out, "{}\t{}\t{}\t{}", m.cluster_a, m.cluster_b, m.distance, m.size)?;
    }
    out.flush()?;
    Ok(())
}

/// Write leaves in display order with their category.
pub fn write_layout<W: Write>(writer: W, layout: &DendrogramLayout) -> Result<()> {
    let mut out = BufWriter::new(writer);
    for leaf in layout.leaves() {
        writeln!(out, "{}\t{}", leaf.id, leaf.category)?;
    }
    out.flush()?;
    Ok(())
}

/// Write flat group assignments, `<id>\t<group>`, in index order.
pub fn write_groups<W: Write>(writer: W, ids: &IdentityIndex, labels: &[usize]) -> Result<()> {
    if ids.len() != labels.len() {
        return Err(Error::invalid(format!(
            "{} group labels for {} identities",
            labels.len(),
            ids.len()
        )));
    }
    let mut out = BufWriter::new(writer);
    for (id, label) in ids.iter().zip(labels) {
        writeln!(out, "{id}\t{label}")?;
    }
    out.flush()?;
    Ok(())
}

/// Read a case list: one identity per line, blanks skipped.
pub fn read_cases<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut cases = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            cases.push(id.to_string());
        }
    }
    Ok(cases)
}

/// [`read_cases`] from a file path.
pub fn read_cases_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    read_cases(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DistanceMatrixBuilder;
    use pretty_assertions::assert_eq;

    const PAIRS: &str = "pair_1\tpair_2\tchromosome\tlength\n\
                         A\tB\t1\t10.0\n\
                         C\tA\t2\t20.5\n";

    #[test]
    fn test_read_pairs_by_header() {
        let records = read_pairs(PAIRS.as_bytes(), b'\t').unwrap();
        assert_eq!(
            records,
            vec![
                PairwiseRecord::new("A", "B", 10.0),
                PairwiseRecord::new("C", "A", 20.5),
            ]
        );
    }

    #[test]
    fn test_read_pairs_comma() {
        let text = "length,pair_2,pair_1\n7.5,y,x\n";
        let records = read_pairs(text.as_bytes(), b',').unwrap();
        assert_eq!(records, vec![PairwiseRecord::new("x", "y", 7.5)]);
    }

    #[test]
    fn test_read_pairs_missing_column() {
        let text = "pair_1\tpair_2\nA\tB\n";
        assert!(matches!(read_pairs(text.as_bytes(), b'\t'), Err(Error::Csv(_))));
    }

    #[test]
    fn test_matrix_format() {
        let records = read_pairs(PAIRS.as_bytes(), b'\t').unwrap();
        let (ids, m) = DistanceMatrixBuilder::new(5.0).build(&records).unwrap();

        let mut buf = Vec::new();
        write_matrix(&mut buf, &ids, &m).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(first, format!("A\t0\t0.1\t{}", 1.0 / 20.5));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_matrix_round_trip() {
        let records = read_pairs(PAIRS.as_bytes(), b'\t').unwrap();
        let (ids, m) = DistanceMatrixBuilder::new(7.0).build(&records).unwrap();

        let mut buf = Vec::new();
        write_matrix(&mut buf, &ids, &m).unwrap();
        let (ids2, m2) = read_matrix(buf.as_slice()).unwrap();
        assert_eq!(ids2, ids);
        assert_eq!(m2, m);
    }

    #[test]
    fn test_read_matrix_ragged() {
        let text = "A\t0\t0.1\nB\t0.1\n";
        let err = read_matrix(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_read_matrix_bad_number() {
        let text = "A\t0\tx\nB\t0.1\t0\n";
        let err = read_matrix(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("'x'"), "{err}");
    }

    #[test]
    fn test_linkage_and_layout_output() {
        let mut tree = Dendrogram::new(3);
        tree.add_merge(0, 1, 0.1, 2);
        tree.add_merge(2, 3, 0.5, 3);
        let mut buf = Vec::new();
        write_linkage(&mut buf, &tree).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0\t1\t0.1\t2\n2\t3\t0.5\t3\n");

        let ids = IdentityIndex::from_ids(["A", "B", "C"]).unwrap();
        let cases = vec!["B".to_string()];
        let layout = DendrogramLayout::assemble(&tree, &ids, Some(&cases)).unwrap();
        let mut buf = Vec::new();
        write_layout(&mut buf, &layout).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "A\tother\nB\tcase\nC\tother\n");
    }

    #[test]
    fn test_read_cases() {
        let cases = read_cases(" A \n\nB\n".as_bytes()).unwrap();
        assert_eq!(cases, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_write_groups() {
        let ids = IdentityIndex::from_ids(["A", "B"]).unwrap();
        let mut buf = Vec::new();
        write_groups(&mut buf, &ids, &[0, 1]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "A\t0\nB\t1\n");
        assert!(write_groups(Vec::new(), &ids, &[0]).is_err());
    }
}
