//! Splits sequences into smaller groups.
//!
//! [chunk_clause_top_level] is the one that matters for SQL: it cuts a list of conditions into
//! pieces that can each be rendered as an independent WHERE clause, so a single statement never
//! outgrows what a backend accepts.
use crate::engine::condition::FilterCondition;
use log::{debug, warn};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    InvalidChunkSize(usize),
    InvalidHardMaximum(usize),
}

impl Display for ChunkingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkingError::InvalidChunkSize(size) => {
                write!(f, "Chunk size must be greater than zero, got {size}")
            }
            ChunkingError::InvalidHardMaximum(size) => {
                write!(f, "Hard maximum chunk size must be greater than zero, got {size}")
            }
        }
    }
}

/// Groups runs of consecutive elements that share the same key.
///
/// Groups are produced one at a time while pulling from the source, so the source is only read as
/// far as the consumer goes (plus one element of lookahead to find where a group ends).
pub fn chunk_by<I, F, K>(source: I, key: F) -> ChunkBy<I::IntoIter, F, K>
where
    I: IntoIterator,
    F: FnMut(&I::Item) -> K,
    K: PartialEq,
{
    ChunkBy {
        source: source.into_iter(),
        key,
        pending: None,
    }
}

/// Splits a sequence in groups of exactly `size` elements. Only the last group can be smaller.
pub fn chunk_by_fixed_size<I>(source: I, size: usize) -> Result<FixedChunks<I::IntoIter>, ChunkingError>
where
    I: IntoIterator,
{
    if size == 0 {
        return Err(ChunkingError::InvalidChunkSize(size));
    }

    Ok(FixedChunks {
        source: source.into_iter(),
        size,
    })
}

/// Splits conditions only at top-level boundaries: outside of any parentheses, right before an
/// OR.
///
/// A chunk is closed as soon as it holds at least `chunk_size` conditions and such a boundary
/// comes up. If `hard_max_chunk_size` is given, chunks are cut at that size no matter what.
/// Concatenating the chunks gives back the input.
pub fn chunk_clause_top_level(
    conditions: &[FilterCondition],
    chunk_size: usize,
    hard_max_chunk_size: Option<usize>,
) -> Result<TopLevelChunks<'_>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize(chunk_size));
    }

    if let Some(0) = hard_max_chunk_size {
        return Err(ChunkingError::InvalidHardMaximum(0));
    }

    Ok(TopLevelChunks {
        conditions,
        position: 0,
        depth: 0,
        chunk_size,
        hard_max_chunk_size,
    })
}

pub struct ChunkBy<I: Iterator, F, K> {
    source: I,
    key: F,
    /// The element that ended the previous group, with its key already computed.
    pending: Option<(I::Item, K)>,
}

impl<I, F, K> Iterator for ChunkBy<I, F, K>
where
    I: Iterator,
    F: FnMut(&I::Item) -> K,
    K: PartialEq,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, group_key) = match self.pending.take() {
            Some(pending) => pending,
            None => {
                let first = self.source.next()?;
                let key = (self.key)(&first);
                (first, key)
            }
        };

        let mut group = vec![first];

        for item in self.source.by_ref() {
            let key = (self.key)(&item);

            if key != group_key {
                self.pending = Some((item, key));
                break;
            }

            group.push(item);
        }

        Some(group)
    }
}

pub struct FixedChunks<I> {
    source: I,
    size: usize,
}

impl<I: Iterator> Iterator for FixedChunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<_> = self.source.by_ref().take(self.size).collect();

        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}

pub struct TopLevelChunks<'a> {
    conditions: &'a [FilterCondition],
    position: usize,
    /// Parenthesis depth after the last condition handed out. Carries over between chunks.
    depth: usize,
    chunk_size: usize,
    hard_max_chunk_size: Option<usize>,
}

impl<'a> Iterator for TopLevelChunks<'a> {
    type Item = &'a [FilterCondition];

    fn next(&mut self) -> Option<Self::Item> {
        let conditions = self.conditions;
        let start = self.position;

        if start >= conditions.len() {
            return None;
        }

        loop {
            self.track_depth(&conditions[self.position]);
            self.position += 1;

            let Some(upcoming) = conditions.get(self.position) else {
                break;
            };

            let length = self.position - start;

            if self.hard_max_chunk_size.is_some_and(|max| length >= max) {
                debug!("Forcing a split after {length} conditions at depth {}", self.depth);
                break;
            }

            let at_boundary = self.depth == 0 && upcoming.boolean_operator.is_or();
            if length >= self.chunk_size && at_boundary {
                break;
            }
        }

        debug!("Chunk of conditions {start}..{}", self.position);

        Some(&conditions[start..self.position])
    }
}

impl TopLevelChunks<'_> {
    fn track_depth(&mut self, condition: &FilterCondition) {
        self.depth += condition.open_parentheses;

        if condition.close_parentheses > self.depth {
            // More closing than opening parentheses. We keep going as if they were balanced.
            warn!(
                "Unbalanced parentheses: closing {} at depth {}",
                condition.close_parentheses, self.depth
            );
        }

        self.depth = self.depth.saturating_sub(condition.close_parentheses);
    }
}
