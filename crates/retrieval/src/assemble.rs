//! Context assembly under a character budget.
//!
//! Candidates are admitted in relevance order until the budget would
//! overflow, then the surviving entries are re-sorted into statute
//! order so the generator sees articles as the law presents them.

use crate::corpus::Corpus;
use crate::types::{AssembledContext, ContextEntry, RankedCandidate};
use std::cmp::Ordering;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    budget_chars: usize,
}

impl ContextAssembler {
    pub fn new(budget_chars: usize) -> Self {
        Self { budget_chars }
    }

    /// Selects reranked chunks into a context block.
    ///
    /// Admission runs in relevance order and stops at the first chunk
    /// that would overflow the budget. Duplicate chunks keep their
    /// first (highest-relevance) occurrence. If even the top chunk is
    /// oversize it is truncated at a word boundary instead of dropped.
    pub fn assemble(&self, corpus: &Corpus, ranked: &[RankedCandidate]) -> AssembledContext {
        let mut picked: Vec<(usize, ContextEntry)> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut used = 0usize;
        let mut truncated = false;

        for candidate in ranked {
            let chunk = match corpus.get(candidate.position) {
                Some(chunk) => chunk,
                None => {
                    tracing::warn!(
                        "Ranked position {} is outside the corpus, skipping",
                        candidate.position
                    );
                    continue;
                }
            };
            if seen.contains(chunk.id.as_str()) {
                continue;
            }
            let len = chunk.text.chars().count();
            if used + len > self.budget_chars {
                break;
            }
            seen.insert(chunk.id.as_str());
            used += len;
            picked.push((
                candidate.position,
                ContextEntry {
                    chunk_id: chunk.id.clone(),
                    article_ref: chunk.article_ref.clone(),
                    text: chunk.text.clone(),
                },
            ));
        }

        if picked.is_empty() {
            if let Some((position, chunk)) = ranked
                .iter()
                .find_map(|c| corpus.get(c.position).map(|chunk| (c.position, chunk)))
            {
                let text = truncate_at_word_boundary(&chunk.text, self.budget_chars);
                used = text.chars().count();
                truncated = true;
                picked.push((
                    position,
                    ContextEntry {
                        chunk_id: chunk.id.clone(),
                        article_ref: chunk.article_ref.clone(),
                        text,
                    },
                ));
            }
        }

        picked.sort_by(|a, b| {
            compare_article_refs(&a.1.article_ref, &b.1.article_ref).then(a.0.cmp(&b.0))
        });

        AssembledContext {
            entries: picked.into_iter().map(|(_, entry)| entry).collect(),
            total_chars: used,
            truncated,
        }
    }
}

/// Numeric references sort numerically and ahead of non-numeric ones;
/// everything else falls back to lexicographic order.
fn compare_article_refs(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Cuts `text` to at most `max_chars` characters, keeping whole words
/// and trimming trailing whitespace.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    let byte_limit = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return text.to_string(),
    };
    let mut end = 0;
    for (start, word) in text.split_word_bound_indices() {
        if start + word.len() > byte_limit {
            break;
        }
        end = start + word.len();
    }
    text[..end].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn corpus_of(specs: &[(&str, &str)]) -> Corpus {
        let chunks = specs
            .iter()
            .enumerate()
            .map(|(position, (article_ref, text))| Chunk {
                id: position.to_string(),
                article_ref: article_ref.to_string(),
                text: text.to_string(),
            })
            .collect();
        Corpus::from_chunks(chunks).unwrap()
    }

    fn ranked(positions: &[usize]) -> Vec<RankedCandidate> {
        positions
            .iter()
            .enumerate()
            .map(|(rank, &position)| RankedCandidate {
                position,
                relevance_score: 1.0 - rank as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn entries_come_back_in_statute_order() {
        let corpus = corpus_of(&[
            ("0", "definitions"),
            ("48", "annual leave"),
            ("12", "probation"),
            ("7", "contracts"),
        ]);

        let context = ContextAssembler::new(1_000).assemble(&corpus, &ranked(&[1, 3, 2]));
        let refs: Vec<&str> = context
            .entries
            .iter()
            .map(|e| e.article_ref.as_str())
            .collect();
        assert_eq!(refs, vec!["7", "12", "48"]);
        assert!(!context.truncated);
    }

    #[test]
    fn duplicate_candidates_keep_the_first_occurrence() {
        let corpus = corpus_of(&[("0", "definitions"), ("5", "wages")]);

        let context = ContextAssembler::new(1_000).assemble(&corpus, &ranked(&[1, 1, 1]));
        assert_eq!(context.entries.len(), 1);
        assert_eq!(context.entries[0].article_ref, "5");
    }

    #[test]
    fn admission_stops_at_the_first_overflow() {
        let corpus = corpus_of(&[
            ("1", "aaaa"),
            ("2", "bbbb"),
            ("3", "cccccccccc"),
            ("4", "dd"),
        ]);

        // 4 + 4 fit in 10; the ten-char chunk overflows and ends admission,
        // so the two-char chunk after it is never considered.
        let context = ContextAssembler::new(10).assemble(&corpus, &ranked(&[0, 1, 2, 3]));
        let refs: Vec<&str> = context
            .entries
            .iter()
            .map(|e| e.article_ref.as_str())
            .collect();
        assert_eq!(refs, vec!["1", "2"]);
        assert_eq!(context.total_chars, 8);
        assert!(!context.truncated);
    }

    #[test]
    fn oversize_top_chunk_is_truncated_at_a_word_boundary() {
        let corpus = corpus_of(&[("9", "alpha beta gamma delta")]);

        let context = ContextAssembler::new(12).assemble(&corpus, &ranked(&[0]));
        assert_eq!(context.entries.len(), 1);
        assert_eq!(context.entries[0].text, "alpha beta");
        assert_eq!(context.total_chars, 10);
        assert!(context.truncated);
    }

    #[test]
    fn arabic_text_truncates_between_words() {
        let corpus = corpus_of(&[("3", "كلمة واحدة ثم أخرى")]);

        let context = ContextAssembler::new(12).assemble(&corpus, &ranked(&[0]));
        assert_eq!(context.entries[0].text, "كلمة واحدة");
        assert!(context.truncated);
    }

    #[test]
    fn numeric_refs_sort_numerically_before_text_refs() {
        let corpus = corpus_of(&[("مكرر", "annex"), ("14", "leave"), ("0", "definitions")]);

        let context = ContextAssembler::new(1_000).assemble(&corpus, &ranked(&[0, 1, 2]));
        let refs: Vec<&str> = context
            .entries
            .iter()
            .map(|e| e.article_ref.as_str())
            .collect();
        assert_eq!(refs, vec!["0", "14", "مكرر"]);
    }

    #[test]
    fn equal_refs_fall_back_to_corpus_position() {
        let corpus = corpus_of(&[("0", "x"), ("5", "first"), ("7", "y"), ("5", "second")]);

        let context = ContextAssembler::new(1_000).assemble(&corpus, &ranked(&[3, 1]));
        let texts: Vec<&str> = context.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn out_of_range_positions_are_skipped() {
        let corpus = corpus_of(&[("1", "only chunk")]);

        let context = ContextAssembler::new(1_000).assemble(&corpus, &ranked(&[99, 0]));
        assert_eq!(context.entries.len(), 1);
        assert_eq!(context.entries[0].article_ref, "1");
    }
}
