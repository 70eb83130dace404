//! In-memory fake process for tests.

use std::io;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::memory::{MemoryTarget, Protection, RegionQuery, RegionState};

#[derive(Debug, Clone)]
struct MockRegion {
    allocation_base: u64,
    base: u64,
    bytes: Vec<u8>,
    state: RegionState,
    protection: Protection,
    deny_reads: bool,
    readable_len: Option<usize>,
}

impl MockRegion {
    fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }
}

/// Fake target with a fixed region layout and mutable contents
pub struct MockTarget {
    regions: RwLock<Vec<MockRegion>>,
    alive: AtomicBool,
    queries: AtomicUsize,
    writes: AtomicUsize,
}

impl MockTarget {
    pub fn builder() -> MockTargetBuilder {
        MockTargetBuilder::default()
    }

    /// Overwrite bytes directly, ignoring protection
    pub fn poke(&self, address: u64, data: &[u8]) {
        let mut regions = self.regions.write().unwrap();
        let region = regions
            .iter_mut()
            .find(|r| address >= r.base && address + data.len() as u64 <= r.end())
            .expect("poke outside of any region");
        let offset = (address - region.base) as usize;
        region.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn peek(&self, address: u64, len: usize) -> Vec<u8> {
        let regions = self.regions.read().unwrap();
        let region = regions
            .iter()
            .find(|r| address >= r.base && address + len as u64 <= r.end())
            .expect("peek outside of any region");
        let offset = (address - region.base) as usize;
        region.bytes[offset..offset + len].to_vec()
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl MemoryTarget for MockTarget {
    fn query_region(&self, address: u64) -> Option<RegionQuery> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let regions = self.regions.read().unwrap();
        let region = regions.iter().find(|r| r.end() > address)?;

        if address < region.base {
            return Some(RegionQuery {
                allocation_base: address,
                base: address,
                size: (region.base - address) as usize,
                state: RegionState::Free,
                protection: Protection::NONE,
            });
        }

        Some(RegionQuery {
            allocation_base: region.allocation_base,
            base: region.base,
            size: region.bytes.len(),
            state: region.state,
            protection: region.protection,
        })
    }

    fn read_memory(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        let regions = self.regions.read().unwrap();
        let region = regions
            .iter()
            .find(|r| address >= r.base && address < r.end() && r.state == RegionState::Committed)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "unmapped address"))?;

        if region.deny_reads || !region.protection.read {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read denied"));
        }

        let offset = (address - region.base) as usize;
        let limit = region.readable_len.unwrap_or(region.bytes.len());
        let available = limit.saturating_sub(offset);
        let n = buf.len().min(available);
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "page not present"));
        }
        buf[..n].copy_from_slice(&region.bytes[offset..offset + n]);
        Ok(n)
    }

    fn write_memory(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        let mut regions = self.regions.write().unwrap();
        let region = regions
            .iter_mut()
            .find(|r| address >= r.base && address < r.end() && r.state == RegionState::Committed)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "unmapped address"))?;

        if !region.protection.write {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "write denied"));
        }

        let offset = (address - region.base) as usize;
        let n = data.len().min(region.bytes.len() - offset);
        region.bytes[offset..offset + n].copy_from_slice(&data[..n]);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(n)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Builder for [`MockTarget`]; regions may be added in any order
#[derive(Default)]
pub struct MockTargetBuilder {
    regions: Vec<MockRegion>,
}

impl MockTargetBuilder {
    /// Committed read/write region
    pub fn region(self, base: u64, bytes: Vec<u8>) -> Self {
        self.region_with(base, bytes, Protection::READ_WRITE)
    }

    pub fn region_with(mut self, base: u64, bytes: Vec<u8>, protection: Protection) -> Self {
        self.regions.push(MockRegion {
            allocation_base: base,
            base,
            bytes,
            state: RegionState::Committed,
            protection,
            deny_reads: false,
            readable_len: None,
        });
        self
    }

    /// Committed region that belongs to an allocation starting at `allocation_base`
    pub fn sub_region(mut self, allocation_base: u64, base: u64, bytes: Vec<u8>) -> Self {
        self.regions.push(MockRegion {
            allocation_base,
            base,
            bytes,
            state: RegionState::Committed,
            protection: Protection::READ_WRITE,
            deny_reads: false,
            readable_len: None,
        });
        self
    }

    /// Reserved but uncommitted range
    pub fn reserved(mut self, base: u64, size: usize) -> Self {
        self.regions.push(MockRegion {
            allocation_base: base,
            base,
            bytes: vec![0; size],
            state: RegionState::Reserved,
            protection: Protection::NONE,
            deny_reads: false,
            readable_len: None,
        });
        self
    }

    /// Committed region whose reads always fail
    pub fn denied(mut self, base: u64, size: usize) -> Self {
        self.regions.push(MockRegion {
            allocation_base: base,
            base,
            bytes: vec![0; size],
            state: RegionState::Committed,
            protection: Protection::READ_WRITE,
            deny_reads: true,
            readable_len: None,
        });
        self
    }

    /// Committed region where only the first `readable_len` bytes can be read
    pub fn partial(mut self, base: u64, bytes: Vec<u8>, readable_len: usize) -> Self {
        self.regions.push(MockRegion {
            allocation_base: base,
            base,
            bytes,
            state: RegionState::Committed,
            protection: Protection::READ_WRITE,
            deny_reads: false,
            readable_len: Some(readable_len),
        });
        self
    }

    pub fn build(mut self) -> MockTarget {
        self.regions.sort_by_key(|r| r.base);
        MockTarget {
            regions: RwLock::new(self.regions),
            alive: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}
