//! Live scanning: candidate search, narrowing and value locking.

mod engine;
mod locker;
mod watchlist;

use std::cmp::Ordering;

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

pub use engine::{Engine, EngineState, WriteReport};
pub use locker::{LockStats, LockedEntry, Locker};
pub use watchlist::{WatchEntry, Watchlist};

/// Comparison applied between an observed value and the searched one
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, IntoStaticStr, Serialize)]
pub enum ScanOp {
    #[strum(to_string = "=", serialize = "==")]
    Eq,
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = "<=")]
    Le,
    #[strum(to_string = ">=")]
    Ge,
}

impl ScanOp {
    pub fn parse(text: &str) -> Result<Self> {
        text.parse()
            .map_err(|_| Error::InvalidScanOp(text.to_string()))
    }

    /// Whether `observed.compare(searched)` satisfies this operator
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
            Self::Le => ordering != Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}
