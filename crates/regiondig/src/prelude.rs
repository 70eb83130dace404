//! Prelude module for convenient imports
//!
//! ```ignore
//! use regiondig::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Engine: `Engine`, `EngineConfig`, `ScanOp`, `EngineState`
//! - Values: `TypedValue`, `ValueKind`
//! - Memory access: `MemoryTarget`, `Region`, `ProcessHandle`
//! - Snapshots: `DumpFormat`, `DumpRegion`, `ImageStack`, `SequenceMatcher`
//! - Error handling: `Error`, `Result`

// Scanning
pub use crate::config::{EngineConfig, EngineConfigBuilder};
pub use crate::scan::{Engine, EngineState, ScanOp, WriteReport};

// Error handling
pub use crate::error::{Error, Result};

// Values
pub use crate::value::{TypedValue, ValueKind};

// Memory access
pub use crate::memory::{MemoryTarget, Protection, Region, RegionIterator};
pub use crate::process::{ProcessEntry, ProcessHandle, open_process};

// Snapshots and matching
pub use crate::dump::{DumpFormat, DumpRegion};
pub use crate::image::ImageStack;
pub use crate::matcher::{MatchReport, MyersAligner, SequenceMatcher, parse_query};
