use tracing::trace;

use crate::memory::{MemoryTarget, Region, RegionState};

/// Lazy walk over the committed regions of a target, in ascending order.
///
/// Each call to `next` issues layout queries until a committed range is
/// found. A failed query ends the walk.
pub struct RegionIterator<'a, T: MemoryTarget + ?Sized> {
    target: &'a T,
    cursor: Option<u64>,
}

impl<'a, T: MemoryTarget + ?Sized> RegionIterator<'a, T> {
    pub fn new(target: &'a T) -> Self {
        Self::starting_at(target, 0)
    }

    pub fn starting_at(target: &'a T, address: u64) -> Self {
        Self {
            target,
            cursor: Some(address),
        }
    }
}

impl<T: MemoryTarget + ?Sized> Iterator for RegionIterator<'_, T> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        loop {
            let address = self.cursor?;

            let Some(query) = self.target.query_region(address) else {
                trace!("Layout query ended at {:#x}", address);
                self.cursor = None;
                return None;
            };

            if query.size == 0 {
                self.cursor = None;
                return None;
            }

            // Ranges that do not move the cursor forward would loop forever
            self.cursor = query
                .base
                .checked_add(query.size as u64)
                .filter(|&next| next > address);

            if query.state == RegionState::Committed {
                return Some(Region::from(query));
            }
        }
    }
}

impl<T: MemoryTarget + ?Sized> std::iter::FusedIterator for RegionIterator<'_, T> {}
