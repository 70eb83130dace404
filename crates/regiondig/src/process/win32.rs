//! Windows backend over the Win32 debugging APIs.

use std::ffi::c_void;
use std::io;
use std::mem;

use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RESERVE, MEMORY_BASIC_INFORMATION, PAGE_EXECUTE, PAGE_EXECUTE_READ,
    PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_PROTECTION_FLAGS, PAGE_READONLY,
    PAGE_READWRITE, PAGE_WRITECOPY, VirtualQueryEx,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION,
    PROCESS_VM_READ, PROCESS_VM_WRITE,
};

use crate::error::{Error, Result};
use crate::memory::{MemoryTarget, Protection, RegionQuery, RegionState};
use crate::process::ProcessEntry;

fn protection(flags: PAGE_PROTECTION_FLAGS) -> Protection {
    match flags {
        PAGE_EXECUTE => Protection::new(false, false, true),
        PAGE_EXECUTE_READ => Protection::READ_EXECUTE,
        PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY => Protection::ALL,
        PAGE_READWRITE | PAGE_WRITECOPY => Protection::READ_WRITE,
        PAGE_READONLY => Protection::READ_ONLY,
        _ => Protection::NONE,
    }
}

/// An open handle on another process's memory
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    handle: HANDLE,
}

// SAFETY: a process HANDLE is a kernel object reference usable from any thread.
unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

impl ProcessHandle {
    pub fn open(pid: u32) -> Result<Self> {
        let access = PROCESS_QUERY_INFORMATION
            | PROCESS_VM_READ
            | PROCESS_VM_WRITE
            | PROCESS_VM_OPERATION;

        // SAFETY: OpenProcess has no memory-safety preconditions.
        let handle = unsafe { OpenProcess(access, false, pid) }.map_err(|e| {
            Error::ProcessOpenFailed {
                pid,
                message: e.to_string(),
            }
        })?;

        Ok(Self { pid, handle })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by OpenProcess and is closed once.
        let _ = unsafe { CloseHandle(self.handle) };
    }
}

impl MemoryTarget for ProcessHandle {
    fn query_region(&self, address: u64) -> Option<RegionQuery> {
        let mut info = MEMORY_BASIC_INFORMATION::default();

        // SAFETY: info is a properly sized out-parameter.
        let written = unsafe {
            VirtualQueryEx(
                self.handle,
                Some(address as usize as *const c_void),
                &mut info,
                mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            return None;
        }

        let state = if info.State == MEM_COMMIT {
            RegionState::Committed
        } else if info.State == MEM_RESERVE {
            RegionState::Reserved
        } else {
            RegionState::Free
        };

        Some(RegionQuery {
            allocation_base: info.AllocationBase as u64,
            base: info.BaseAddress as u64,
            size: info.RegionSize,
            state,
            protection: protection(info.AllocationProtect),
        })
    }

    fn read_memory(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut read = 0usize;

        // SAFETY: buf is valid for buf.len() bytes; read receives the count.
        let result = unsafe {
            ReadProcessMemory(
                self.handle,
                address as usize as *const c_void,
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                Some(&mut read),
            )
        };

        // a partial copy still reports how far it got
        match result {
            Ok(()) => Ok(read),
            Err(_) if read > 0 => Ok(read),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }

    fn write_memory(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        let mut written = 0usize;

        // SAFETY: data is valid for data.len() bytes; written receives the count.
        let result = unsafe {
            WriteProcessMemory(
                self.handle,
                address as usize as *const c_void,
                data.as_ptr() as *const c_void,
                data.len(),
                Some(&mut written),
            )
        };

        match result {
            Ok(()) => Ok(written),
            Err(_) if written > 0 => Ok(written),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }

    fn is_alive(&self) -> bool {
        let mut code = 0u32;
        // SAFETY: code is a valid out-parameter.
        let ok = unsafe { GetExitCodeProcess(self.handle, &mut code) }.is_ok();
        ok && code == STILL_ACTIVE.0 as u32
    }
}

pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    // SAFETY: snapshot creation has no memory-safety preconditions.
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map_err(|e| Error::Io(io::Error::other(e.to_string())))?;

    let mut entry = PROCESSENTRY32W {
        dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    let mut processes = Vec::new();

    // SAFETY: entry has dwSize set and lives across the walk.
    let mut more = unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok();
    while more {
        let len = entry
            .szExeFile
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(entry.szExeFile.len());
        processes.push(ProcessEntry {
            pid: entry.th32ProcessID,
            name: String::from_utf16_lossy(&entry.szExeFile[..len]),
        });
        // SAFETY: same snapshot and entry as above.
        more = unsafe { Process32NextW(snapshot, &mut entry) }.is_ok();
    }

    // SAFETY: the snapshot handle is closed once.
    let _ = unsafe { CloseHandle(snapshot) };
    Ok(processes)
}
