//! Region descriptors reported by the memory-layout query.

use std::fmt;

use serde::Serialize;

/// Read/write/execute flags of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Protection {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Protection {
    pub const NONE: Self = Self::new(false, false, false);
    pub const READ_ONLY: Self = Self::new(true, false, false);
    pub const READ_WRITE: Self = Self::new(true, true, false);
    pub const READ_EXECUTE: Self = Self::new(true, false, true);
    pub const ALL: Self = Self::new(true, true, true);

    pub const fn new(read: bool, write: bool, execute: bool) -> Self {
        Self {
            read,
            write,
            execute,
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'R' } else { ' ' },
            if self.write { 'W' } else { ' ' },
            if self.execute { 'X' } else { ' ' }
        )
    }
}

/// Commit state of an address range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Committed,
    Reserved,
    Free,
}

/// Raw answer of one layout query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionQuery {
    /// Base of the allocation this range belongs to
    pub allocation_base: u64,
    /// First address of the queried range
    pub base: u64,
    pub size: usize,
    pub state: RegionState,
    pub protection: Protection,
}

/// A committed span of the target's address space.
///
/// `base` is the allocation base and `mapped_base` the first address of this
/// span; addresses inside the region are always relative to `mapped_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub base: u64,
    pub mapped_base: u64,
    pub size: usize,
    pub protection: Protection,
}

impl Region {
    /// One past the last address of the region
    pub fn end(&self) -> u64 {
        self.mapped_base.saturating_add(self.size as u64)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.mapped_base && address < self.end()
    }

    pub fn is_readable(&self) -> bool {
        self.protection.read
    }

    pub fn is_writable(&self) -> bool {
        self.protection.write
    }

    pub fn is_executable(&self) -> bool {
        self.protection.execute
    }
}

impl From<RegionQuery> for Region {
    fn from(query: RegionQuery) -> Self {
        Self {
            base: query.allocation_base.min(query.base),
            mapped_base: query.base,
            size: query.size,
            protection: query.protection,
        }
    }
}
