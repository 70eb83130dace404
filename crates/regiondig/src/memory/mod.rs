pub mod layout;
mod iterator;
mod reader;
mod region;
mod target;

#[cfg(test)]
pub mod mock;

pub use iterator::RegionIterator;
pub use reader::RegionReader;
pub use region::{Protection, Region, RegionQuery, RegionState};
pub use target::MemoryTarget;

#[cfg(test)]
pub use mock::{MockTarget, MockTargetBuilder};
