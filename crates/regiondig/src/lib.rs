//! Live memory inspection of another process.
//!
//! `regiondig` attaches to a running process, walks its committed regions,
//! and offers two workflows on top of that:
//!
//! - **Value scanning**: find every aligned address holding a typed value,
//!   narrow the candidates as the value changes, then write or lock the
//!   survivors ([`scan::Engine`]).
//! - **Snapshot matching**: capture the readable regions into dump files,
//!   load dumps back as an image stack, and rank approximate matches of a
//!   byte sequence within regions or within the differences between two
//!   snapshots ([`image::ImageStack`], [`matcher::SequenceMatcher`]).
//!
//! Everything that touches the target goes through [`memory::MemoryTarget`],
//! so the engine runs the same against a live process
//! ([`process::ProcessHandle`]) or an in-memory fake.

pub mod config;
pub mod dump;
pub mod error;
pub mod image;
pub mod matcher;
pub mod memory;
pub mod prelude;
pub mod process;
pub mod scan;
pub mod shutdown;
pub mod value;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{Error, Result};
pub use process::{ProcessEntry, ProcessHandle};
pub use scan::{Engine, ScanOp};
pub use value::{TypedValue, ValueKind};
