//! Recursive character text splitting
//!
//! Text is split on the coarsest separator that occurs in it (blank line,
//! newline, space, then single characters) and the pieces are merged back
//! greedily into chunks of at most `chunk_size` characters. Consecutive chunks
//! share up to `chunk_overlap` characters of context.
//!
//! All sizes are counted in `char`s, not bytes.

use std::collections::VecDeque;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{RelayError, RelayResult};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// 1-based, inclusive line range of a chunk inside its source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub lines: LineRange,
}

/// A piece of the document and its byte offset in it.
type Piece<'a> = (usize, &'a str);

struct Span {
    text: String,
    range: Range<usize>,
}

pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Interpret a raw `chunkSize` request value.
///
/// Accepts any JSON number with no fractional part (`500` and `500.0`), rejects
/// strings, fractions and non-positive values.
pub fn parse_chunk_size(value: &Value) -> RelayResult<usize> {
    let number = match value {
        Value::Number(n) => n,
        _ => return Err(RelayError::InvalidChunkSize("chunkSize must be an integer".into())),
    };

    let size = if let Some(i) = number.as_i64() {
        i
    } else if let Some(u) = number.as_u64() {
        i64::try_from(u).unwrap_or(i64::MAX)
    } else {
        match number.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 => f as i64,
            _ => return Err(RelayError::InvalidChunkSize("chunkSize must be an integer".into())),
        }
    };

    if size <= 0 {
        return Err(RelayError::InvalidChunkSize(
            "chunkSize must be a positive integer".into(),
        ));
    }

    usize::try_from(size)
        .map_err(|_| RelayError::InvalidChunkSize("chunkSize is too large".into()))
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> RelayResult<Self> {
        if chunk_size == 0 {
            return Err(RelayError::InvalidChunkSize(
                "chunkSize must be a positive integer".into(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RelayError::InvalidChunkSize(format!(
                "Cannot have chunkOverlap >= chunkSize: {} >= {}",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split `text` into ordered chunks annotated with their line ranges.
    pub fn create_chunks(&self, text: &str) -> Vec<Chunk> {
        let newlines: Vec<usize> = text.match_indices('\n').map(|(i, _)| i).collect();
        let line_at = |byte: usize| 1 + newlines.partition_point(|&nl| nl < byte);

        self.spans(text)
            .into_iter()
            .map(|span| Chunk {
                lines: LineRange {
                    from: line_at(span.range.start),
                    to: line_at(span.range.end.saturating_sub(1).max(span.range.start)),
                },
                text: span.text,
            })
            .collect()
    }

    /// Split `text` into ordered chunk strings of at most `chunk_size` chars.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.spans(text).into_iter().map(|span| span.text).collect()
    }

    /// Trimmed, non-empty chunks with the byte range each one covers in `text`.
    fn spans(&self, text: &str) -> Vec<Span> {
        self.split_recursive(text, 0, &SEPARATORS)
            .into_iter()
            .filter_map(|span| {
                let trimmed = span.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let source = &text[span.range.clone()];
                let start = span.range.start + (source.len() - source.trim_start().len());
                let end = span.range.end - (source.len() - source.trim_end().len());
                Some(Span {
                    text: trimmed.to_string(),
                    range: start..end.max(start),
                })
            })
            .collect()
    }

    /// `text` starts at byte `base` of the document being split.
    fn split_recursive(&self, text: &str, base: usize, separators: &[&str]) -> Vec<Span> {
        let (separator, finer) = pick_separator(text, separators);

        let splits: Vec<Piece> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| (base + i, &text[i..i + c.len_utf8()]))
                .collect()
        } else {
            let mut offset = base;
            let mut pieces = Vec::new();
            for part in text.split(separator) {
                if !part.is_empty() {
                    pieces.push((offset, part));
                }
                offset += part.len() + separator.len();
            }
            pieces
        };

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<Piece> = Vec::new();

        for (offset, split) in splits {
            if char_len(split) < self.chunk_size {
                good_splits.push((offset, split));
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits, separator));
                good_splits.clear();
            }

            if finer.is_empty() {
                final_chunks.push(Span {
                    text: split.to_string(),
                    range: offset..offset + split.len(),
                });
            } else {
                final_chunks.extend(self.split_recursive(split, offset, finer));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits, separator));
        }

        final_chunks
    }

    fn merge_splits(&self, splits: &[Piece], separator: &str) -> Vec<Span> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<Piece> = VecDeque::new();
        let mut total = 0usize;

        for &(offset, split) in splits {
            let len = char_len(split);
            let joiner = if current.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.chunk_size && !current.is_empty() {
                if total > self.chunk_size {
                    warn!(
                        chunk_chars = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk larger than the requested size"
                    );
                }
                if let Some(doc) = join_docs(&current, separator) {
                    docs.push(doc);
                }

                // Drop pieces from the front until what is left fits as overlap
                // and the next piece can be appended.
                loop {
                    let joiner = if current.is_empty() { 0 } else { separator_len };
                    let too_much_overlap = total > self.chunk_overlap;
                    let no_room = total > 0 && total + len + joiner > self.chunk_size;
                    if !(too_much_overlap || no_room) {
                        break;
                    }
                    let trailing = if current.len() > 1 { separator_len } else { 0 };
                    match current.pop_front() {
                        Some((_, first)) => {
                            total = total.saturating_sub(char_len(first) + trailing)
                        }
                        None => {
                            total = 0;
                            break;
                        }
                    }
                }
            }

            current.push_back((offset, split));
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(doc) = join_docs(&current, separator) {
            docs.push(doc);
        }

        docs
    }
}

fn pick_separator<'a, 's>(text: &str, separators: &'s [&'a str]) -> (&'a str, &'s [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Join pieces with `separator`; the range runs from the first piece to the end
/// of the last one, whatever the source held between them.
fn join_docs(docs: &VecDeque<Piece>, separator: &str) -> Option<Span> {
    let (first, _) = *docs.front()?;
    let (last, last_text) = *docs.back()?;
    let joined = docs
        .iter()
        .map(|&(_, text)| text)
        .collect::<Vec<_>>()
        .join(separator);
    if joined.trim().is_empty() {
        return None;
    }
    Some(Span {
        text: joined,
        range: first..last + last_text.len(),
    })
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
