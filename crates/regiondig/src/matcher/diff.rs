//! Byte-level differences between two versions of a region.

use std::ops::Range;
use std::time::{Duration, Instant};

use similar::{Algorithm, DiffTag};

use crate::memory::layout::timing;

/// One element of an edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Common(u8),
    Added(u8),
    Removed(u8),
}

impl DiffOp {
    pub fn byte(self) -> u8 {
        match self {
            Self::Common(b) | Self::Added(b) | Self::Removed(b) => b,
        }
    }
}

/// A run of changes plus its surrounding context.
///
/// `source` and `target` are the byte ranges the hunk covers in each input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub source: Range<usize>,
    pub target: Range<usize>,
    pub ops: Vec<DiffOp>,
}

impl Hunk {
    pub fn changes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !matches!(op, DiffOp::Common(_)))
            .count()
    }
}

/// Produces an edit script turning `source` into `target`.
///
/// Implementations decide how much unchanged context they report.
pub trait Aligner {
    fn hunks(&self, source: &[u8], target: &[u8]) -> Vec<Hunk>;

    /// All hunks back to back
    fn align(&self, source: &[u8], target: &[u8]) -> Vec<DiffOp> {
        self.hunks(source, target)
            .into_iter()
            .flat_map(|hunk| hunk.ops)
            .collect()
    }
}

/// A diff flattened into one searchable buffer.
///
/// Common, added and removed bytes all appear, in script order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffBuffer {
    bytes: Vec<u8>,
    added: usize,
    removed: usize,
}

impl DiffBuffer {
    pub fn from_ops<I: IntoIterator<Item = DiffOp>>(ops: I) -> Self {
        let mut buffer = Self::default();
        for op in ops {
            match op {
                DiffOp::Added(_) => buffer.added += 1,
                DiffOp::Removed(_) => buffer.removed += 1,
                DiffOp::Common(_) => {}
            }
            buffer.bytes.push(op.byte());
        }
        buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn added(&self) -> usize {
        self.added
    }

    pub fn removed(&self) -> usize {
        self.removed
    }
}

/// Minimal edit scripts from Myers' algorithm.
///
/// Changes closer than `2 * context` bytes share a hunk. An alignment that
/// runs past its timeout degrades to a coarser, still valid, script.
#[derive(Debug, Clone, Copy)]
pub struct MyersAligner {
    context: usize,
    timeout: Option<Duration>,
}

impl MyersAligner {
    pub fn new(context: usize) -> Self {
        Self {
            context,
            timeout: Some(Duration::from_secs(timing::DIFF_TIMEOUT_SECS)),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for MyersAligner {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Aligner for MyersAligner {
    fn hunks(&self, source: &[u8], target: &[u8]) -> Vec<Hunk> {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let ops = similar::capture_diff_slices_deadline(Algorithm::Myers, source, target, deadline);

        similar::group_diff_ops(ops, self.context)
            .iter()
            .filter_map(|group| to_hunk(group, source, target))
            .collect()
    }
}

fn to_hunk(group: &[similar::DiffOp], source: &[u8], target: &[u8]) -> Option<Hunk> {
    let first = group.first()?;
    let last = group.last()?;
    let mut hunk = Hunk {
        source: first.old_range().start..last.old_range().end,
        target: first.new_range().start..last.new_range().end,
        ops: Vec::new(),
    };

    for op in group {
        let (tag, old, new) = op.as_tag_tuple();
        let removed = source[old.clone()].iter().copied().map(DiffOp::Removed);
        let added = target[new].iter().copied().map(DiffOp::Added);
        match tag {
            DiffTag::Equal => hunk
                .ops
                .extend(source[old].iter().copied().map(DiffOp::Common)),
            DiffTag::Delete => hunk.ops.extend(removed),
            DiffTag::Insert => hunk.ops.extend(added),
            DiffTag::Replace => {
                hunk.ops.extend(removed);
                hunk.ops.extend(added);
            }
        }
    }
    Some(hunk)
}
