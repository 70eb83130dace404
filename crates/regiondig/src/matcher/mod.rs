//! Approximate byte-sequence search over captured regions.
//!
//! Every alignment of the query inside a buffer is scored by the number of
//! positions where the bytes agree. Positive scores go through an
//! [`AdmissionPolicy`] so a weak query over a large image does not keep
//! millions of candidates.

mod admission;
mod diff;
mod query;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;
use tracing::debug;

use crate::dump::DumpRegion;
use crate::memory::layout::limits;

pub use admission::AdmissionPolicy;
pub use diff::{Aligner, DiffBuffer, DiffOp, Hunk, MyersAligner};
pub use query::parse_query;

/// One scored alignment of the query.
///
/// `region` and `buffer` borrow caller-owned data, so candidates cannot
/// outlive the images they point into.
#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    /// Start of the alignment within `buffer`
    pub offset: usize,
    /// Number of agreeing bytes, `1..=len`
    pub score: usize,
    /// Query length
    pub len: usize,
    pub region: Option<&'a DumpRegion>,
    pub buffer: &'a [u8],
    discovery: u64,
}

/// Bytes around a match, clipped to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchContext<'a> {
    pub before: &'a [u8],
    pub matched: &'a [u8],
    pub after: &'a [u8],
}

impl<'a> MatchCandidate<'a> {
    /// The matched bytes plus up to `wrap` bytes on either side
    pub fn context(&self, wrap: usize) -> MatchContext<'a> {
        let end = self.offset + self.len;
        let start = self.offset.saturating_sub(wrap);
        let after_end = end.saturating_add(wrap).min(self.buffer.len());
        MatchContext {
            before: &self.buffer[start..self.offset],
            matched: &self.buffer[self.offset..end],
            after: &self.buffer[end..after_end],
        }
    }

    pub fn report(&self, wrap: usize) -> MatchReport {
        let context = self.context(wrap);
        MatchReport {
            offset: self.offset,
            score: self.score,
            query_len: self.len,
            region_base: self.region.map(|r| r.base),
            before: context.before.to_vec(),
            matched: context.matched.to_vec(),
            after: context.after.to_vec(),
        }
    }
}

impl PartialEq for MatchCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MatchCandidate<'_> {}

impl PartialOrd for MatchCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatchCandidate<'_> {
    /// Higher score first, then earlier discovery first
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.discovery.cmp(&self.discovery))
    }
}

/// Owned, serializable form of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub offset: usize,
    pub score: usize,
    pub query_len: usize,
    pub region_base: Option<i32>,
    pub before: Vec<u8>,
    pub matched: Vec<u8>,
    pub after: Vec<u8>,
}

/// Accumulates candidates over any number of buffers
#[derive(Debug)]
pub struct SequenceMatcher<'a> {
    policy: AdmissionPolicy,
    candidates: BinaryHeap<MatchCandidate<'a>>,
    discovered: u64,
    offered: usize,
}

impl<'a> SequenceMatcher<'a> {
    pub fn new(fan_out: usize) -> Self {
        Self {
            policy: AdmissionPolicy::new(fan_out),
            candidates: BinaryHeap::new(),
            discovered: 0,
            offered: 0,
        }
    }

    pub fn search(&mut self, query: &[u8], region: &'a DumpRegion) {
        self.search_buffer(query, &region.bytes, Some(region));
    }

    /// Search a flattened diff, attributing matches to `source`
    pub fn search_diff(&mut self, query: &[u8], diff: &'a DiffBuffer, source: &'a DumpRegion) {
        self.search_buffer(query, diff.as_bytes(), Some(source));
    }

    /// Search a buffer that belongs to no region
    pub fn search_bytes(&mut self, query: &[u8], buffer: &'a [u8]) {
        self.search_buffer(query, buffer, None);
    }

    fn search_buffer(&mut self, query: &[u8], buffer: &'a [u8], region: Option<&'a DumpRegion>) {
        if query.is_empty() || query.len() > buffer.len() {
            return;
        }

        for (offset, window) in buffer.windows(query.len()).enumerate() {
            let score = window.iter().zip(query).filter(|(a, b)| a == b).count();
            if score == 0 {
                continue;
            }
            self.offered += 1;
            if self.policy.offer(score) {
                self.candidates.push(MatchCandidate {
                    offset,
                    score,
                    len: query.len(),
                    region,
                    buffer,
                    discovery: self.discovered,
                });
                self.discovered += 1;
            }
        }
    }

    /// Candidates kept so far
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Positive-score alignments seen, kept or not
    pub fn offered(&self) -> usize {
        self.offered
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Kept candidates, best first
    pub fn into_matches(self) -> Vec<MatchCandidate<'a>> {
        debug!(
            "{} of {} partial matches kept (floor {}, best {})",
            self.candidates.len(),
            self.offered,
            self.policy.floor(),
            self.policy.best()
        );
        let mut matches = self.candidates.into_sorted_vec();
        matches.reverse();
        matches
    }
}

impl Default for SequenceMatcher<'_> {
    fn default() -> Self {
        Self::new(limits::MATCH_FAN_OUT)
    }
}
