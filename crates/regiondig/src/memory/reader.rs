use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryTarget, Region};

/// Snapshots region contents into a reusable scratch buffer.
///
/// The buffer grows to the largest region read so far and is never shrunk,
/// so scanning thousands of regions does not reallocate per region.
#[derive(Debug, Default)]
pub struct RegionReader {
    scratch: Vec<u8>,
}

impl RegionReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scratch: vec![0; capacity],
        }
    }

    /// Current scratch size in bytes
    pub fn capacity(&self) -> usize {
        self.scratch.len()
    }

    /// Read the live bytes of `region`.
    ///
    /// A short read succeeds with the bytes actually obtained; callers that
    /// need the whole region should use [`RegionReader::read_exact`].
    pub fn read<T: MemoryTarget + ?Sized>(&mut self, target: &T, region: &Region) -> Result<&[u8]> {
        if self.scratch.len() < region.size {
            self.scratch.resize(region.size, 0);
        }

        let buf = &mut self.scratch[..region.size];
        match target.read_memory(region.mapped_base, buf) {
            Ok(n) => {
                if n < region.size {
                    debug!(
                        "Partial read at {:#x}: {} of {} bytes",
                        region.mapped_base, n, region.size
                    );
                }
                Ok(&self.scratch[..n])
            }
            Err(e) => Err(Error::ReadDenied {
                address: region.mapped_base,
                message: e.to_string(),
            }),
        }
    }

    /// Read the whole region or fail with [`Error::PartialRead`]
    pub fn read_exact<T: MemoryTarget + ?Sized>(
        &mut self,
        target: &T,
        region: &Region,
    ) -> Result<&[u8]> {
        let bytes = self.read(target, region)?;
        if bytes.len() < region.size {
            return Err(Error::PartialRead {
                address: region.mapped_base,
                requested: region.size,
                actual: bytes.len(),
            });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockTarget, RegionIterator};

    fn regions(target: &MockTarget) -> Vec<Region> {
        RegionIterator::new(target).collect()
    }

    #[test]
    fn test_read_full_region() {
        let target = MockTarget::builder().region(0x1000, vec![1, 2, 3, 4]).build();
        let region = regions(&target)[0];

        let mut reader = RegionReader::new();
        assert_eq!(reader.read(&target, &region).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_scratch_grows_but_never_shrinks() {
        let target = MockTarget::builder()
            .region(0x1000, vec![0; 64])
            .region(0x2000, vec![0; 16])
            .build();
        let all = regions(&target);

        let mut reader = RegionReader::new();
        reader.read(&target, &all[0]).unwrap();
        assert_eq!(reader.capacity(), 64);

        let small = reader.read(&target, &all[1]).unwrap();
        assert_eq!(small.len(), 16);
        assert_eq!(reader.capacity(), 64);
    }

    #[test]
    fn test_partial_read_is_truncated() {
        let target = MockTarget::builder()
            .partial(0x1000, vec![9; 32], 10)
            .build();
        let region = regions(&target)[0];

        let mut reader = RegionReader::new();
        assert_eq!(reader.read(&target, &region).unwrap().len(), 10);

        match reader.read_exact(&target, &region) {
            Err(Error::PartialRead {
                requested, actual, ..
            }) => {
                assert_eq!(requested, 32);
                assert_eq!(actual, 10);
            }
            other => panic!("expected PartialRead, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_denied_read() {
        let target = MockTarget::builder().denied(0x1000, 32).build();
        let region = regions(&target)[0];

        let mut reader = RegionReader::new();
        let err = reader.read(&target, &region).unwrap_err();
        assert!(matches!(err, Error::ReadDenied { address: 0x1000, .. }));
    }
}
