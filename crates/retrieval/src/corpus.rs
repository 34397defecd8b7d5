//! Statute corpus storage.
//!
//! The corpus is the ordered list of statute chunks, persisted as a
//! JSON array. Its SHA-256 checksum is recorded inside the vector
//! index so a stale pairing is caught at startup.

use crate::types::Chunk;
use qanun_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// The loaded statute corpus. Never empty.
#[derive(Debug, Clone)]
pub struct Corpus {
    chunks: Vec<Chunk>,
    checksum: [u8; 32],
}

impl Corpus {
    /// Wraps freshly built chunks, computing the checksum they will
    /// have on disk.
    pub fn from_chunks(chunks: Vec<Chunk>) -> AppResult<Self> {
        if chunks.is_empty() {
            return Err(AppError::EmptyCorpus(
                "Corpus contains no chunks".to_string(),
            ));
        }
        let bytes = serde_json::to_vec(&chunks)?;
        Ok(Self {
            chunks,
            checksum: sha256_bytes(&bytes),
        })
    }

    /// Loads a corpus file, checksumming the raw bytes as read.
    pub fn load(path: &Path) -> AppResult<Self> {
        let bytes = fs::read(path)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&bytes)?;
        if chunks.is_empty() {
            return Err(AppError::EmptyCorpus(format!(
                "Corpus file {} contains no chunks",
                path.display()
            )));
        }
        Ok(Self {
            checksum: sha256_bytes(&bytes),
            chunks,
        })
    }

    /// Writes the corpus as the exact bytes its checksum was computed
    /// over.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(&self.chunks)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Chunk> {
        self.chunks.get(position)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The definitions chunk, always the first entry.
    pub fn definitions(&self) -> &Chunk {
        // Constructors reject empty corpora.
        &self.chunks[0]
    }

    pub fn checksum(&self) -> &[u8; 32] {
        &self.checksum
    }
}

fn sha256_bytes(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, article_ref: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            article_ref: article_ref.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn rejects_empty_chunk_list() {
        let result = Corpus::from_chunks(vec![]);
        assert!(matches!(result, Err(AppError::EmptyCorpus(_))));
    }

    #[test]
    fn definitions_is_the_first_chunk() {
        let corpus = Corpus::from_chunks(vec![
            chunk("0", "0", "definitions text"),
            chunk("1", "12", "article twelve"),
        ])
        .unwrap();
        assert_eq!(corpus.definitions().article_ref, "0");
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn save_then_load_preserves_chunks_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.json");

        let corpus = Corpus::from_chunks(vec![
            chunk("0", "0", "تعريفات"),
            chunk("1", "48", "نص المادة"),
        ])
        .unwrap();
        corpus.save(&path).unwrap();

        let loaded = Corpus::load(&path).unwrap();
        assert_eq!(loaded.chunks(), corpus.chunks());
        assert_eq!(loaded.checksum(), corpus.checksum());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.json");
        fs::write(&path, b"not json at all").unwrap();

        assert!(Corpus::load(&path).is_err());
    }

    #[test]
    fn load_rejects_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunks.json");
        fs::write(&path, b"[]").unwrap();

        assert!(matches!(
            Corpus::load(&path),
            Err(AppError::EmptyCorpus(_))
        ));
    }

    #[test]
    fn checksum_tracks_content() {
        let a = Corpus::from_chunks(vec![chunk("0", "0", "alpha")]).unwrap();
        let b = Corpus::from_chunks(vec![chunk("0", "0", "beta")]).unwrap();
        assert_ne!(a.checksum(), b.checksum());
    }
}
