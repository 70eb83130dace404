use std::io;

use crate::error::{Error, Result};
use crate::memory::{MemoryTarget, RegionQuery};
use crate::process::ProcessEntry;

const UNSUPPORTED: &str = "process access is not available on this platform";

#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    pub fn open(_pid: u32) -> Result<Self> {
        Err(Error::Unsupported(UNSUPPORTED))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl MemoryTarget for ProcessHandle {
    fn query_region(&self, _address: u64) -> Option<RegionQuery> {
        None
    }

    fn read_memory(&self, _address: u64, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, UNSUPPORTED))
    }

    fn write_memory(&self, _address: u64, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, UNSUPPORTED))
    }

    fn is_alive(&self) -> bool {
        false
    }
}

pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    Err(Error::Unsupported(UNSUPPORTED))
}
