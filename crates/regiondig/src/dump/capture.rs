use memchr::memmem;
use tracing::{debug, warn};

use crate::dump::DumpRegion;
use crate::memory::layout::dump::MAX_REGION_LEN;
use crate::memory::{MemoryTarget, RegionIterator, RegionReader};

/// Address of the first occurrence of `magic` in the target's readable,
/// non-executable memory.
///
/// The result is the natural reference offset for [`capture`]: a string
/// baked into the target lands at a stable distance from its data.
pub fn find_reference_offset<T: MemoryTarget + ?Sized>(target: &T, magic: &[u8]) -> Option<u64> {
    if magic.is_empty() {
        return None;
    }

    let finder = memmem::Finder::new(magic);
    let mut reader = RegionReader::new();

    for region in RegionIterator::new(target) {
        if !region.is_readable() || region.is_executable() {
            continue;
        }
        let Ok(bytes) = reader.read(target, &region) else {
            continue;
        };
        if let Some(pos) = finder.find(bytes) {
            let address = region.mapped_base + pos as u64;
            debug!("Reference string found at {:#x}", address);
            return Some(address);
        }
    }

    warn!(
        "Reference string {:?} not found",
        String::from_utf8_lossy(magic)
    );
    None
}

/// Snapshot the target's readable regions.
///
/// Each region's base is stored as its mapped address minus `reference`,
/// truncated to 32 bits. Regions that cannot be read or do not fit in a dump
/// record are skipped; short reads keep what was read.
pub fn capture<T: MemoryTarget + ?Sized>(
    target: &T,
    reference: u64,
    skip_executable: bool,
) -> Vec<DumpRegion> {
    let mut reader = RegionReader::new();
    let mut regions = Vec::new();
    let mut failed = 0usize;

    for region in RegionIterator::new(target) {
        if !region.is_readable() || (skip_executable && region.is_executable()) {
            continue;
        }
        if region.size as u64 > MAX_REGION_LEN {
            warn!(
                "Skipping region at {:#x}: {} bytes do not fit in a dump record",
                region.mapped_base, region.size
            );
            continue;
        }
        match reader.read(target, &region) {
            Ok(bytes) => {
                let base = region.mapped_base.wrapping_sub(reference) as u32 as i32;
                regions.push(DumpRegion::new(base, bytes.to_vec()));
            }
            Err(e) => {
                debug!("{}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        warn!("{} regions could not be read", failed);
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockTarget, Protection};

    fn target() -> MockTarget {
        let mut data = vec![0u8; 64];
        data[40..46].copy_from_slice(b"MAGIC!");
        MockTarget::builder()
            .region_with(0x1000, b"MAGIC! in code".to_vec(), Protection::READ_EXECUTE)
            .region(0x2000, data)
            .partial(0x3000, vec![5; 32], 8)
            .denied(0x4000, 16)
            .region_with(0x5000, vec![1; 8], Protection::NONE)
            .build()
    }

    #[test]
    fn test_reference_skips_executable_regions() {
        assert_eq!(find_reference_offset(&target(), b"MAGIC!"), Some(0x2000 + 40));
    }

    #[test]
    fn test_reference_not_found() {
        assert_eq!(find_reference_offset(&target(), b"absent"), None);
        assert_eq!(find_reference_offset(&target(), b""), None);
    }

    #[test]
    fn test_capture_relative_bases() {
        let target = target();
        let regions = capture(&target, 0x2000, true);

        let bases: Vec<i32> = regions.iter().map(|r| r.base).collect();
        assert_eq!(bases, vec![0, 0x1000]);
        assert_eq!(regions[0].bytes.len(), 64);
        // partial read keeps the readable prefix
        assert_eq!(regions[1].bytes, vec![5; 8]);
    }

    #[test]
    fn test_capture_below_reference_is_negative() {
        let target = target();
        let regions = capture(&target, 0x3000, false);

        let bases: Vec<i32> = regions.iter().map(|r| r.base).collect();
        assert_eq!(bases, vec![-0x2000, -0x1000, 0]);
    }
}
