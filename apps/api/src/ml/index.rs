//! Flat (exact) nearest-neighbor index over occupation embeddings.
//!
//! Artifact layout, produced by the offline index-build job:
//! - index file: `FLATIDX1` magic, `u32` dimension, `u32` vector count
//!   (little-endian), then `count × dimension` `f32` values row-major.
//! - mapping side-table: CSV with header `row,occupation_uri`, one line per
//!   vector, in row order.
//!
//! The mapping row count must equal the index vector count; a mismatch is a
//! data-integrity failure and aborts the load. Distances are plain L2 over
//! unit vectors; converting them to similarity scores is the engine's job.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

const MAGIC: &[u8; 8] = b"FLATIDX1";
const HEADER_LEN: usize = 16;

/// One search result: index row and L2 distance (ascending = more similar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub row: usize,
    pub distance: f32,
}

/// Read-only flat index, loaded once at startup and shared across requests.
#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
    uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MappingRecord {
    #[allow(dead_code)]
    row: usize,
    occupation_uri: String,
}

impl FlatIndex {
    /// Loads the index artifact and its URI mapping, validating both.
    pub fn load(index_path: &Path, mapping_path: &Path) -> Result<Self> {
        let bytes = std::fs::read(index_path)
            .with_context(|| format!("Failed to read index file {}", index_path.display()))?;

        if bytes.len() < HEADER_LEN {
            bail!(
                "Index file {} is truncated ({} bytes)",
                index_path.display(),
                bytes.len()
            );
        }
        if &bytes[0..8] != MAGIC {
            bail!("Index file {} has an unknown format", index_path.display());
        }

        let dimension = u32::from_le_bytes(bytes[8..12].try_into()?) as usize;
        let count = u32::from_le_bytes(bytes[12..16].try_into()?) as usize;
        if dimension == 0 {
            bail!("Index file declares a zero dimension");
        }

        let expected_len = HEADER_LEN + count * dimension * 4;
        if bytes.len() != expected_len {
            bail!(
                "Index file length mismatch: expected {expected_len} bytes for {count} \
                 vectors of dimension {dimension}, found {}",
                bytes.len()
            );
        }

        let mut vectors = Vec::with_capacity(count * dimension);
        for chunk in bytes[HEADER_LEN..].chunks_exact(4) {
            vectors.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        let uris = load_mapping(mapping_path)?;
        if uris.len() != count {
            bail!(
                "Mapping table row count ({}) does not match index vector count ({count})",
                uris.len()
            );
        }

        info!(
            "Vector index loaded: {count} vectors, dimension {dimension}, mapping {}",
            mapping_path.display()
        );

        Ok(Self {
            dimension,
            vectors,
            uris,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Resolves an index row to its occupation URI. Rows outside the valid
    /// range yield `None`; the caller decides whether that is fatal.
    pub fn uri_for_row(&self, row: usize) -> Option<&str> {
        self.uris.get(row).map(String::as_str)
    }

    /// Exact k-nearest-neighbor search, ascending by L2 distance.
    ///
    /// A query of the wrong dimension indicates an embedding-model/index
    /// version mismatch and is an error, never silently padded.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            bail!("Search requires k >= 1");
        }
        if query.len() != self.dimension {
            bail!(
                "Query dimension ({}) does not match index dimension ({})",
                query.len(),
                self.dimension
            );
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| SearchHit {
                row,
                distance: l2_distance(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

fn load_mapping(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read mapping table {}", path.display()))?;

    let mut uris = Vec::new();
    for record in reader.deserialize() {
        let record: MappingRecord = record.context("Malformed mapping table row")?;
        uris.push(record.occupation_uri);
    }
    Ok(uris)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_artifacts(dir: &Path, vectors: &[Vec<f32>], uris: &[&str]) -> (std::path::PathBuf, std::path::PathBuf) {
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);

        let index_path = dir.join("test.index");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
        for vector in vectors {
            for value in vector {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
        std::fs::write(&index_path, bytes).unwrap();

        let mapping_path = dir.join("mapping.csv");
        let mut file = std::fs::File::create(&mapping_path).unwrap();
        writeln!(file, "row,occupation_uri").unwrap();
        for (row, uri) in uris.iter().enumerate() {
            writeln!(file, "{row},{uri}").unwrap();
        }

        (index_path, mapping_path)
    }

    fn sample_index(dir: &Path) -> FlatIndex {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let (index_path, mapping_path) =
            write_artifacts(dir, &vectors, &["occ:a", "occ:b", "occ:c"]);
        FlatIndex::load(&index_path, &mapping_path).unwrap()
    }

    #[test]
    fn test_load_and_search_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());

        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), 3);

        let hits = index.search(&[0.9, 0.1, 0.0], 3).unwrap();
        assert_eq!(hits[0].row, 0);
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits[1].distance <= hits[2].distance);
        assert_eq!(index.uri_for_row(hits[0].row), Some("occ:a"));
    }

    #[test]
    fn test_search_truncates_to_k() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
    }

    #[test]
    fn test_search_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());
        assert!(index.search(&[1.0, 0.0], 3).is_err());
    }

    #[test]
    fn test_search_rejects_zero_k() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());
        assert!(index.search(&[1.0, 0.0, 0.0], 0).is_err());
    }

    #[test]
    fn test_uri_for_row_out_of_range_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index(dir.path());
        assert_eq!(index.uri_for_row(99), None);
    }

    #[test]
    fn test_load_rejects_mapping_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let (index_path, mapping_path) = write_artifacts(dir.path(), &vectors, &["occ:a"]);
        let err = FlatIndex::load(&index_path, &mapping_path).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("bad.index");
        std::fs::write(&index_path, b"NOTANIDXAAAAAAAA").unwrap();
        let mapping_path = dir.path().join("mapping.csv");
        std::fs::write(&mapping_path, "row,occupation_uri\n").unwrap();
        assert!(FlatIndex::load(&index_path, &mapping_path).is_err());
    }

    #[test]
    fn test_load_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("short.index");
        std::fs::write(&index_path, b"FLAT").unwrap();
        let mapping_path = dir.path().join("mapping.csv");
        std::fs::write(&mapping_path, "row,occupation_uri\n").unwrap();
        assert!(FlatIndex::load(&index_path, &mapping_path).is_err());
    }
}
