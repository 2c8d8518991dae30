#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::documents::PageText;

/// Represents a chunk of page text ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChunk {
    /// The content text
    pub content: String,
    /// File name of the PDF the chunk came from
    pub source: String,
    /// 1-based page number within the source
    pub page: u32,
    /// The index of this chunk within its page
    pub chunk_index: usize,
    /// Estimated token count
    pub token_count: usize,
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks
    pub chunk_overlap: usize,
    /// Split points tried in order, the empty separator splits into characters
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: ["\n\n", "\n", " ", ""]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Split every page independently and tag the chunks with their origin
#[inline]
pub fn chunk_pages(pages: &[PageText], config: &ChunkingConfig) -> Vec<ContentChunk> {
    let mut chunks = Vec::new();

    for page in pages {
        for (chunk_index, content) in split_text(&page.text, config).into_iter().enumerate() {
            let token_count = estimate_token_count(&content);
            chunks.push(ContentChunk {
                content,
                source: page.source.clone(),
                page: page.page,
                chunk_index,
                token_count,
            });
        }
    }

    debug!(
        "Chunked {} pages into {} chunks (avg {} chars)",
        pages.len(),
        chunks.len(),
        chunks
            .iter()
            .map(|c| c.content.chars().count())
            .sum::<usize>()
            / chunks.len().max(1)
    );

    chunks
}

/// Split text into chunks of at most `chunk_size` characters with `chunk_overlap` carried over
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let separators: Vec<&str> = config.separators.iter().map(String::as_str).collect();
    split_recursive(text, &separators, config)
}

fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut final_chunks = Vec::new();
    let (separator, remaining) = pick_separator(text, separators);

    let mut good_splits: Vec<&str> = Vec::new();
    for split in split_keeping_separator(text, separator) {
        if char_len(split) < config.chunk_size {
            good_splits.push(split);
            continue;
        }

        if !good_splits.is_empty() {
            final_chunks.extend(merge_splits(&good_splits, config));
            good_splits.clear();
        }

        if remaining.is_empty() {
            final_chunks.push(split.to_string());
        } else {
            final_chunks.extend(split_recursive(split, remaining, config));
        }
    }

    if !good_splits.is_empty() {
        final_chunks.extend(merge_splits(&good_splits, config));
    }

    final_chunks
}

/// First separator present in the text, plus the finer separators after it
fn pick_separator<'a, 's>(text: &str, separators: &'s [&'a str]) -> (&'a str, &'s [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, separators.get(i + 1..).unwrap_or_default());
        }
    }

    (separators.last().copied().unwrap_or_default(), &[])
}

/// Split at each occurrence of `separator`, which stays at the start of the following piece
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .filter_map(|(i, c)| text.get(i..i + c.len_utf8()))
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    let boundaries = text
        .match_indices(separator)
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));

    for boundary in boundaries {
        if let Some(piece) = text.get(last..boundary) {
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }
        last = boundary;
    }

    pieces
}

/// Greedily pack pieces into chunks, keeping a tail of at most `chunk_overlap` characters
fn merge_splits(splits: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for &piece in splits {
        let len = char_len(piece);

        if total + len > config.chunk_size {
            if total > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total, config.chunk_size
                );
            }

            if !current.is_empty() {
                if let Some(doc) = join_pieces(&current) {
                    docs.push(doc);
                }

                while total > config.chunk_overlap
                    || (total + len > config.chunk_size && total > 0)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                }
            }
        }

        current.push_back(piece);
        total += len;
    }

    if let Some(doc) = join_pieces(&current) {
        docs.push(doc);
    }

    docs
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined = pieces.iter().copied().collect::<String>();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
