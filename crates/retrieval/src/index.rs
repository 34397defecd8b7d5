//! Flat vector index with cosine similarity search.
//!
//! Vectors are L2-normalized at build time and queries at search time,
//! so the inner product is the cosine similarity. The on-disk format
//! is a fixed header (magic, version, dimension, vector count, corpus
//! checksum) followed by the vectors as little-endian `f32` values.

use crate::corpus::Corpus;
use crate::types::RetrievalCandidate;
use qanun_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

const INDEX_MAGIC: [u8; 8] = *b"qanunvec";
const INDEX_VERSION: u32 = 1;
const HEADER_LEN: usize = 52;

/// In-memory flat index over the corpus embeddings, one row per chunk.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    /// Row-major, `len() * dim` values, each row L2-normalized.
    vectors: Vec<f32>,
    corpus_checksum: [u8; 32],
}

impl VectorIndex {
    /// Builds an index from embedding rows. Every row must have the
    /// declared dimension.
    pub fn build(dim: usize, rows: &[Vec<f32>], corpus_checksum: [u8; 32]) -> AppResult<Self> {
        if dim == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be positive".to_string(),
            ));
        }
        let mut vectors = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(AppError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            vectors.extend(normalize(row));
        }
        Ok(Self {
            dim,
            vectors,
            corpus_checksum,
        })
    }

    /// Returns the `k` most similar chunk positions, best first.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<RetrievalCandidate>> {
        if self.vectors.is_empty() {
            return Err(AppError::IndexNotReady(
                "Vector index holds no vectors".to_string(),
            ));
        }
        if query.len() != self.dim {
            return Err(AppError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(vec![]);
        }

        let query = normalize(query);
        let mut candidates: Vec<RetrievalCandidate> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, row)| RetrievalCandidate {
                position,
                score: inner_product(&query, row),
            })
            .collect();

        // Stable sort keeps corpus order between equal scores.
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k);
        Ok(candidates)
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn corpus_checksum(&self) -> &[u8; 32] {
        &self.corpus_checksum
    }

    pub fn write_file(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut buf = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        buf.extend_from_slice(&INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.dim as u32).to_le_bytes());
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.corpus_checksum);
        for value in &self.vectors {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        fs::write(path, buf)?;
        Ok(())
    }

    /// Reads an index file, rejecting anything that is missing,
    /// foreign, or truncated.
    pub fn read_file(path: &Path) -> AppResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::IndexNotReady(format!("Cannot read index file {}: {}", path.display(), e))
        })?;
        if bytes.len() < HEADER_LEN {
            return Err(AppError::IndexNotReady(format!(
                "Index file {} is too short to hold a header",
                path.display()
            )));
        }
        if bytes[0..8] != INDEX_MAGIC {
            return Err(AppError::IndexNotReady(format!(
                "File {} is not a qanun vector index",
                path.display()
            )));
        }
        let version = le_u32(&bytes[8..12]);
        if version != INDEX_VERSION {
            return Err(AppError::IndexNotReady(format!(
                "Unsupported index version {} (expected {})",
                version, INDEX_VERSION
            )));
        }
        let dim = le_u32(&bytes[12..16]) as usize;
        let count = le_u32(&bytes[16..20]) as usize;
        if dim == 0 || count == 0 {
            return Err(AppError::IndexNotReady(
                "Index file declares no vectors".to_string(),
            ));
        }
        let mut corpus_checksum = [0u8; 32];
        corpus_checksum.copy_from_slice(&bytes[20..52]);

        let expected_body = count
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                AppError::IndexNotReady("Index header declares an implausible size".to_string())
            })?;
        let body = &bytes[HEADER_LEN..];
        if body.len() != expected_body {
            return Err(AppError::IndexNotReady(format!(
                "Index file {} is truncated: expected {} data bytes, found {}",
                path.display(),
                expected_body,
                body.len()
            )));
        }

        let mut vectors = Vec::with_capacity(count * dim);
        for chunk in body.chunks_exact(4) {
            let mut value = [0u8; 4];
            value.copy_from_slice(chunk);
            vectors.push(f32::from_le_bytes(value));
        }
        Ok(Self {
            dim,
            vectors,
            corpus_checksum,
        })
    }
}

/// Checks that a corpus and an index were built together.
pub fn verify_sync(corpus: &Corpus, index: &VectorIndex) -> AppResult<()> {
    if corpus.len() != index.len() {
        return Err(AppError::CorpusIndexMismatch(format!(
            "Corpus holds {} chunks but index holds {} vectors",
            corpus.len(),
            index.len()
        )));
    }
    if corpus.checksum() != index.corpus_checksum() {
        return Err(AppError::CorpusIndexMismatch(
            "Corpus file changed since the index was built".to_string(),
        ));
    }
    Ok(())
}

/// Decodes a little-endian `u32` from a 4-byte slice.
fn le_u32(bytes: &[u8]) -> u32 {
    let mut value = [0u8; 4];
    value.copy_from_slice(bytes);
    u32::from_le_bytes(value)
}

fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
