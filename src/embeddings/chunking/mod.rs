
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Chunk, Document};
use crate::{RagError, Result};

/// Unit in which `chunk_size` and `overlap` are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// One unit per character
    #[default]
    Chars,
    /// A word together with the whitespace that follows it
    Words,
    /// A sentence together with the whitespace that follows it
    Sentences,
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in `unit`s
    pub chunk_size: usize,
    /// Units shared by adjacent chunks
    pub overlap: usize,
    /// How the text is divided into units
    pub unit: ChunkUnit,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            unit: ChunkUnit::Chars,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        validate_window(self.chunk_size, self.overlap)
    }
}

/// Divides text into consecutive units.
///
/// Returns the byte offset at which each unit ends, in increasing order.
/// The units must partition the text: the last offset equals `text.len()`
/// and every offset lies on a char boundary. Empty text has no units.
pub trait Segmenter {
    fn segment_ends(&self, text: &str) -> Vec<usize>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CharSegmenter;

impl Segmenter for CharSegmenter {
    #[inline]
    fn segment_ends(&self, text: &str) -> Vec<usize> {
        text.char_indices()
            .map(|(offset, c)| offset + c.len_utf8())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordSegmenter;

impl Segmenter for WordSegmenter {
    #[inline]
    fn segment_ends(&self, text: &str) -> Vec<usize> {
        let mut ends = Vec::new();
        let mut seen_word = false;
        let mut after_whitespace = false;

        for (offset, c) in text.char_indices() {
            if c.is_whitespace() {
                after_whitespace = true;
                continue;
            }
            if seen_word && after_whitespace {
                ends.push(offset);
            }
            seen_word = true;
            after_whitespace = false;
        }

        if !text.is_empty() {
            ends.push(text.len());
        }
        ends
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSegmenter;

#[derive(Clone, Copy, PartialEq, Eq)]
enum SentenceState {
    InSentence,
    AfterTerminal,
    InGap,
}

impl Segmenter for SentenceSegmenter {
    #[inline]
    fn segment_ends(&self, text: &str) -> Vec<usize> {
        let is_terminal = |c: char| matches!(c, '.' | '!' | '?');
        let mut ends = Vec::new();
        let mut state = SentenceState::InSentence;

        for (offset, c) in text.char_indices() {
            state = match state {
                SentenceState::InSentence if is_terminal(c) => SentenceState::AfterTerminal,
                SentenceState::InSentence => SentenceState::InSentence,
                SentenceState::AfterTerminal if c.is_whitespace() => SentenceState::InGap,
                SentenceState::AfterTerminal if is_terminal(c) => SentenceState::AfterTerminal,
                SentenceState::AfterTerminal => SentenceState::InSentence,
                SentenceState::InGap if c.is_whitespace() => SentenceState::InGap,
                SentenceState::InGap => {
                    ends.push(offset);
                    if is_terminal(c) {
                        SentenceState::AfterTerminal
                    } else {
                        SentenceState::InSentence
                    }
                }
            };
        }

        if !text.is_empty() {
            ends.push(text.len());
        }
        ends
    }
}

/// Split a document into character windows of `chunk_size` that share `overlap` characters
#[inline]
pub fn chunk(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    chunk_with(document, chunk_size, overlap, &CharSegmenter)
}

/// Split a document according to `config`
#[inline]
pub fn chunk_document(document: &Document, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    match config.unit {
        ChunkUnit::Chars => chunk_with(document, config.chunk_size, config.overlap, &CharSegmenter),
        ChunkUnit::Words => chunk_with(document, config.chunk_size, config.overlap, &WordSegmenter),
        ChunkUnit::Sentences => chunk_with(
            document,
            config.chunk_size,
            config.overlap,
            &SentenceSegmenter,
        ),
    }
}

/// Split a document into windows of `chunk_size` units produced by `segmenter`.
///
/// Each window starts `chunk_size - overlap` units after the previous one;
/// the last window may be shorter. Empty text yields no chunks.
#[inline]
pub fn chunk_with<S>(
    document: &Document,
    chunk_size: usize,
    overlap: usize,
    segmenter: &S,
) -> Result<Vec<Chunk>>
where
    S: Segmenter + ?Sized,
{
    validate_window(chunk_size, overlap)?;

    let text = document.raw_text();
    let ends = segmenter.segment_ends(text);
    check_partition(text, &ends)?;

    let mut bounds = Vec::with_capacity(ends.len() + 1);
    bounds.push(0);
    bounds.extend(ends);
    let unit_count = bounds.len() - 1;

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < unit_count {
        let end = (start + chunk_size).min(unit_count);
        chunks.push(Chunk::from_span(
            document,
            chunks.len(),
            bounds[start]..bounds[end],
        ));
        if end == unit_count {
            break;
        }
        start += step;
    }

    debug!(
        "Chunked document '{}' into {} chunks ({} units, size {}, overlap {})",
        document.id(),
        chunks.len(),
        unit_count,
        chunk_size,
        overlap
    );

    Ok(chunks)
}

/// Rebuild the parent text from its chunks by dropping the overlapping prefixes.
///
/// Returns `None` when a chunk has no known span or the chunks leave a gap.
#[inline]
pub fn reassemble(chunks: &[Chunk]) -> Option<String> {
    let mut ordered = chunks.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|c| c.sequence_index());

    let mut text = String::new();
    let mut covered = 0;

    for chunk in ordered {
        let span = chunk.span()?;
        if span.start > covered {
            return None;
        }
        if span.end <= covered {
            continue;
        }
        text.push_str(chunk.text().get(covered - span.start..)?);
        covered = span.end;
    }

    Some(text)
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

fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(RagError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }
    Ok(())
}

fn check_partition(text: &str, ends: &[usize]) -> Result<()> {
    let mut previous = 0;
    for &end in ends {
        if end <= previous || !text.is_char_boundary(end) {
            return Err(RagError::Other(anyhow!(
                "segmenter produced invalid boundary {} after {}",
                end,
                previous
            )));
        }
        previous = end;
    }
    if previous != text.len() {
        return Err(RagError::Other(anyhow!(
            "segmenter covered {} of {} bytes",
            previous,
            text.len()
        )));
    }
    Ok(())
}
