use std::io;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::memory::RegionQuery;
use crate::value::TypedValue;

/// A process (or fake process) whose memory can be introspected.
///
/// `read_memory` may return fewer bytes than requested when only a prefix of
/// the range is readable; it returns an error only when nothing was read.
pub trait MemoryTarget: Send + Sync {
    /// Describe the address range containing or following `address`.
    ///
    /// Returns `None` when the layout query fails, which ends enumeration.
    fn query_region(&self, address: u64) -> Option<RegionQuery>;

    fn read_memory(&self, address: u64, buf: &mut [u8]) -> io::Result<usize>;

    fn write_memory(&self, address: u64, data: &[u8]) -> io::Result<usize>;

    /// Whether the handle still refers to a live target
    fn is_alive(&self) -> bool {
        true
    }

    /// Write all of `data` or fail
    fn write_exact(&self, address: u64, data: &[u8]) -> Result<()> {
        match self.write_memory(address, data) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(n) => Err(Error::WriteFailed {
                address,
                message: format!("wrote {} of {} bytes", n, data.len()),
            }),
            Err(e) => Err(Error::WriteFailed {
                address,
                message: e.to_string(),
            }),
        }
    }

    /// Write a typed value in its little-endian representation
    fn write_value(&self, address: u64, value: &TypedValue) -> Result<()> {
        self.write_exact(address, &value.to_le_bytes())
    }
}

impl<T: MemoryTarget + ?Sized> MemoryTarget for Arc<T> {
    fn query_region(&self, address: u64) -> Option<RegionQuery> {
        (**self).query_region(address)
    }

    fn read_memory(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_memory(address, buf)
    }

    fn write_memory(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        (**self).write_memory(address, data)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}
