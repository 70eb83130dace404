//! Layout, timing and sizing constants
//!
//! Constants are grouped by the component that owns them.

/// Segmented dump record header
pub mod dump {
    /// Signed, reference-relative region base (i32 LE)
    pub const BASE_LEN: usize = 4;
    /// Region byte length (u32 LE)
    pub const LENGTH_LEN: usize = 4;
    /// Full header size preceding each region's bytes
    pub const HEADER_LEN: usize = BASE_LEN + LENGTH_LEN;
    /// Largest region one record can hold (bytes)
    pub const MAX_REGION_LEN: u64 = u32::MAX as u64;
}

/// Timing constants for background work
pub mod timing {
    /// Interval between two lock-rewrite passes (ms)
    pub const LOCK_INTERVAL_MS: u64 = 100;

    /// How long a parsed memory map answers layout queries (ms)
    pub const MAPS_CACHE_MS: u64 = 250;

    /// Budget for one region alignment before falling back to a coarse diff (s)
    pub const DIFF_TIMEOUT_SECS: u64 = 30;
}

/// Sizing limits for scanning and matching
pub mod limits {
    /// Candidates allowed at the admission floor before the floor is raised
    pub const MATCH_FAN_OUT: usize = 25;

    /// Regions larger than this are not diffed (bytes)
    pub const MAX_DIFF_REGION_BYTES: usize = 3_000_000;

    /// Initial watchlist allocation (entries)
    pub const WATCHLIST_INITIAL_CAPACITY: usize = 4096;
}
