//! Process discovery and live process handles.

#[cfg(target_os = "linux")]
mod procfs;
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
mod unsupported;
#[cfg(target_os = "windows")]
mod win32;

#[cfg(target_os = "linux")]
use procfs as platform;
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
use unsupported as platform;
#[cfg(target_os = "windows")]
use win32 as platform;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};

pub use platform::ProcessHandle;

/// A running process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Every process visible to the current user
pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    let mut processes = platform::list_processes()?;
    processes.sort_by_key(|p| p.pid);
    Ok(processes)
}

/// Resolve a process pattern.
///
/// `:1234` selects by pid. Anything else is matched case-insensitively
/// against process names: an exact name wins, otherwise the pattern must be
/// a substring of exactly one name.
pub fn find_process(pattern: &str) -> Result<ProcessEntry> {
    select_process(list_processes()?, pattern)
}

/// Resolve `pattern` and open the process for reading and writing
pub fn open_process(pattern: &str) -> Result<ProcessHandle> {
    let entry = find_process(pattern)?;
    let handle = ProcessHandle::open(entry.pid)?;
    info!("Opened process {} ({})", entry.name, entry.pid);
    Ok(handle)
}

fn select_process(processes: Vec<ProcessEntry>, pattern: &str) -> Result<ProcessEntry> {
    let not_found = || Error::ProcessNotFound(pattern.to_string());

    if let Some(pid) = pattern.strip_prefix(':') {
        let pid: u32 = pid.parse().map_err(|_| not_found())?;
        return processes
            .into_iter()
            .find(|p| p.pid == pid)
            .ok_or_else(not_found);
    }

    let needle = pattern.to_lowercase();
    let (exact, partial): (Vec<ProcessEntry>, Vec<ProcessEntry>) = processes
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .partition(|p| p.name.to_lowercase() == needle);

    let candidates = if exact.is_empty() { partial } else { exact };
    match candidates.len() {
        0 => Err(not_found()),
        1 => Ok(candidates.into_iter().next().ok_or_else(not_found)?),
        count => Err(Error::AmbiguousProcess {
            pattern: pattern.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processes() -> Vec<ProcessEntry> {
        [(4, "System"), (100, "game.exe"), (200, "game.exe"), (300, "gamepad-helper"), (400, "Editor")]
            .into_iter()
            .map(|(pid, name)| ProcessEntry {
                pid,
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_select_by_pid() {
        assert_eq!(select_process(processes(), ":200").unwrap().pid, 200);
        assert!(matches!(
            select_process(processes(), ":999"),
            Err(Error::ProcessNotFound(_))
        ));
        assert!(matches!(
            select_process(processes(), ":abc"),
            Err(Error::ProcessNotFound(_))
        ));
    }

    #[test]
    fn test_select_by_unique_substring() {
        assert_eq!(select_process(processes(), "edit").unwrap().pid, 400);
        assert_eq!(select_process(processes(), "PAD").unwrap().pid, 300);
    }

    #[test]
    fn test_exact_name_beats_substring() {
        let mut list = processes();
        list.retain(|p| p.pid != 200);
        // "game" alone matches game.exe and gamepad-helper
        assert_eq!(select_process(list.clone(), "game.exe").unwrap().pid, 100);
        assert!(matches!(
            select_process(list, "game"),
            Err(Error::AmbiguousProcess { count: 2, .. })
        ));
    }

    #[test]
    fn test_duplicate_exact_names_are_ambiguous() {
        assert!(matches!(
            select_process(processes(), "game.exe"),
            Err(Error::AmbiguousProcess { count: 2, .. })
        ));
    }

    #[test]
    fn test_no_match() {
        assert!(matches!(
            select_process(processes(), "nothing"),
            Err(Error::ProcessNotFound(_))
        ));
    }
}
