//! Linux backend over `/proc/<pid>/maps` and `/proc/<pid>/mem`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::memory::layout::timing;
use crate::memory::{MemoryTarget, Protection, RegionQuery, RegionState};
use crate::process::ProcessEntry;

/// One line of `/proc/<pid>/maps`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    start: u64,
    end: u64,
    protection: Protection,
}

fn parse_maps(content: &str) -> Vec<Mapping> {
    content.lines().filter_map(parse_map_line).collect()
}

// 00400000-00452000 r-xp 00000000 08:02 173521  /usr/bin/ls
fn parse_map_line(line: &str) -> Option<Mapping> {
    let mut parts = line.split_whitespace();
    let (start, end) = parts.next()?.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    let perms = parts.next()?.as_bytes();

    (end > start).then_some(Mapping {
        start,
        end,
        protection: Protection::new(
            perms.first() == Some(&b'r'),
            perms.get(1) == Some(&b'w'),
            perms.get(2) == Some(&b'x'),
        ),
    })
}

/// Layout answer for `address` given mappings sorted by start
fn query_mappings(mappings: &[Mapping], address: u64) -> Option<RegionQuery> {
    let mapping = mappings.get(mappings.partition_point(|m| m.end <= address))?;

    if address < mapping.start {
        return Some(RegionQuery {
            allocation_base: address,
            base: address,
            size: usize::try_from(mapping.start - address).ok()?,
            state: RegionState::Free,
            protection: Protection::NONE,
        });
    }

    Some(RegionQuery {
        allocation_base: mapping.start,
        base: mapping.start,
        size: usize::try_from(mapping.end - mapping.start).ok()?,
        state: RegionState::Committed,
        protection: mapping.protection,
    })
}

/// Parsed `/proc/<pid>/maps`, reused across the queries of one walk
#[derive(Debug, Default)]
struct MapsCache {
    loaded: Option<Instant>,
    mappings: Vec<Mapping>,
}

impl MapsCache {
    /// A walk restarts at address 0, so that query always rereads the maps
    fn is_fresh(&self, address: u64, ttl: Duration) -> bool {
        address != 0 && self.loaded.is_some_and(|loaded| loaded.elapsed() < ttl)
    }
}

/// An open handle on another process's memory
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    mem: File,
    writable: bool,
    maps: Mutex<MapsCache>,
}

impl ProcessHandle {
    pub fn open(pid: u32) -> Result<Self> {
        let path = format!("/proc/{}/mem", pid);
        let open_failed = |e: io::Error| Error::ProcessOpenFailed {
            pid,
            message: e.to_string(),
        };

        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(mem) => Ok(Self {
                pid,
                mem,
                writable: true,
                maps: Mutex::default(),
            }),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!("Process {} opened read-only: {}", pid, e);
                let mem = File::open(&path).map_err(open_failed)?;
                Ok(Self {
                    pid,
                    mem,
                    writable: false,
                    maps: Mutex::default(),
                })
            }
            Err(e) => Err(open_failed(e)),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn proc_path(&self) -> PathBuf {
        PathBuf::from(format!("/proc/{}", self.pid))
    }
}

impl MemoryTarget for ProcessHandle {
    fn query_region(&self, address: u64) -> Option<RegionQuery> {
        let mut cache = self.maps.lock().unwrap_or_else(PoisonError::into_inner);

        if !cache.is_fresh(address, Duration::from_millis(timing::MAPS_CACHE_MS)) {
            let content = match fs::read_to_string(self.proc_path().join("maps")) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Process {} maps unavailable: {}", self.pid, e);
                    *cache = MapsCache::default();
                    return None;
                }
            };
            cache.mappings = parse_maps(&content);
            cache.loaded = Some(Instant::now());
        }

        query_mappings(&cache.mappings, address)
    }

    fn read_memory(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.mem.read_at(&mut buf[total..], address + total as u64) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if total == 0 => return Err(e),
                Err(_) => break,
            }
        }
        if total == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("nothing readable at {:#x}", address),
            ));
        }
        Ok(total)
    }

    fn write_memory(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "process memory opened read-only",
            ));
        }
        let mut total = 0;
        while total < data.len() {
            match self.mem.write_at(&data[total..], address + total as u64) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if total == 0 => return Err(e),
                Err(_) => break,
            }
        }
        Ok(total)
    }

    fn is_alive(&self) -> bool {
        // a zombie keeps its /proc entry but loses its address space
        fs::read_to_string(self.proc_path().join("stat"))
            .map(|stat| {
                stat.rsplit_once(") ")
                    .and_then(|(_, rest)| rest.chars().next())
                    .is_some_and(|state| state != 'Z' && state != 'X')
            })
            .unwrap_or(false)
    }
}

pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    let mut processes = Vec::new();
    for entry in fs::read_dir("/proc")? {
        let entry = entry?;
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        // processes can exit between listing and reading
        let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        processes.push(ProcessEntry {
            pid,
            name: comm.trim_end().to_string(),
        });
    }
    Ok(processes)
}
