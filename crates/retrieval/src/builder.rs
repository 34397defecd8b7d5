//! Offline corpus and index construction.
//!
//! The statute text is split on article markers of the form
//! `مادة (N):`. Text before the first marker becomes the definitions
//! chunk with reference `"0"`; every article keeps its marker line and
//! its number, with Arabic-Indic digits normalized to ASCII.

use crate::corpus::Corpus;
use crate::index::VectorIndex;
use crate::types::Chunk;
use qanun_core::{AppError, AppResult};
use qanun_gateway::Embedder;
use regex::Regex;
use std::path::Path;

/// Chunks are embedded in batches of this size.
pub const EMBED_BATCH_SIZE: usize = 32;

const ARTICLE_MARKER: &str = r"مادة\s*\(\s*([^)]+)\)\s*:";

/// A chunk before it has an identifier or an embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSeed {
    pub article_ref: String,
    pub text: String,
}

/// Splits raw statute text into chunk seeds, one per article plus the
/// preamble.
pub fn chunk_statute(text: &str) -> AppResult<Vec<ChunkSeed>> {
    let pattern = Regex::new(ARTICLE_MARKER)
        .map_err(|e| AppError::Config(format!("Invalid article marker pattern: {}", e)))?;

    let mut markers: Vec<(usize, String)> = Vec::new();
    for capture in pattern.captures_iter(text) {
        if let (Some(whole), Some(reference)) = (capture.get(0), capture.get(1)) {
            markers.push((whole.start(), normalize_digits(reference.as_str())));
        }
    }

    if markers.is_empty() {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::EmptyCorpus("Statute text is empty".to_string()));
        }
        tracing::warn!("No article markers found, treating the whole text as one chunk");
        return Ok(vec![ChunkSeed {
            article_ref: "0".to_string(),
            text: trimmed.to_string(),
        }]);
    }

    let mut seeds = Vec::with_capacity(markers.len() + 1);
    let preamble = text[..markers[0].0].trim();
    if !preamble.is_empty() {
        seeds.push(ChunkSeed {
            article_ref: "0".to_string(),
            text: preamble.to_string(),
        });
    }
    for (position, (start, reference)) in markers.iter().enumerate() {
        let end = markers
            .get(position + 1)
            .map(|(next, _)| *next)
            .unwrap_or(text.len());
        let segment = text[*start..end].trim();
        if segment.is_empty() {
            continue;
        }
        seeds.push(ChunkSeed {
            article_ref: reference.clone(),
            text: segment.to_string(),
        });
    }
    Ok(seeds)
}

/// Embeds every seed and builds the corpus/index pair.
pub async fn build_artifacts(
    seeds: &[ChunkSeed],
    embedder: &dyn Embedder,
    dim: usize,
) -> AppResult<(Corpus, VectorIndex)> {
    if seeds.is_empty() {
        return Err(AppError::EmptyCorpus("No chunks to index".to_string()));
    }

    let chunks: Vec<Chunk> = seeds
        .iter()
        .enumerate()
        .map(|(position, seed)| Chunk {
            id: position.to_string(),
            article_ref: seed.article_ref.clone(),
            text: seed.text.clone(),
        })
        .collect();

    let mut rows: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        for vector in &vectors {
            if vector.len() != dim {
                return Err(AppError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        }
        rows.extend(vectors);
        tracing::info!("Embedded {}/{} chunks", rows.len(), chunks.len());
    }

    let corpus = Corpus::from_chunks(chunks)?;
    let index = VectorIndex::build(dim, &rows, *corpus.checksum())?;
    Ok((corpus, index))
}

/// Writes the corpus before the index so the checksum recorded in the
/// index header always describes the corpus file on disk.
pub fn write_artifacts(
    corpus: &Corpus,
    index: &VectorIndex,
    corpus_path: &Path,
    index_path: &Path,
) -> AppResult<()> {
    corpus.save(corpus_path)?;
    index.write_file(index_path)?;
    tracing::info!(
        "Wrote {} chunks to {} and {} vectors to {}",
        corpus.len(),
        corpus_path.display(),
        index.len(),
        index_path.display()
    );
    Ok(())
}

fn normalize_digits(reference: &str) -> String {
    reference
        .trim()
        .chars()
        .map(|c| {
            if ('\u{0660}'..='\u{0669}').contains(&c) {
                char::from_u32('0' as u32 + (c as u32 - '\u{0660}' as u32)).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}
