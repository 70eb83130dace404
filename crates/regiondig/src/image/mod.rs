//! A stack of loaded dump images for offline searching.
//!
//! Searches run against the top image; difference searches compare the top
//! image (newer) with the one below it (older), matching regions by base.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dump::{self, DumpFormat, DumpRegion};
use crate::error::{Error, Result};
use crate::matcher::{Aligner, DiffBuffer, Hunk, MatchCandidate, SequenceMatcher};

/// The regions of one or more loaded dump files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub regions: Vec<DumpRegion>,
}

impl Image {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, base: i32) -> Option<&DumpRegion> {
        self.regions.iter().find(|r| r.base == base)
    }

    pub fn total_bytes(&self) -> usize {
        self.regions.iter().map(|r| r.bytes.len()).sum()
    }
}

/// How one region differs between the two top images
#[derive(Debug)]
pub enum RegionDiff<'a> {
    /// Present in both; `diff` holds the changed bytes
    Changed {
        source: &'a DumpRegion,
        diff: DiffBuffer,
    },
    /// Present (with data) in the older image only
    OnlyOld(&'a DumpRegion),
    /// Present (with data) in the newer image only
    OnlyNew(&'a DumpRegion),
}

/// Byte-level hunks of one region between the two top images
#[derive(Debug)]
pub struct RegionHunks<'a> {
    pub source: &'a DumpRegion,
    pub target: &'a DumpRegion,
    pub hunks: Vec<Hunk>,
}

/// Regions whose base appears in only one of the two top images
#[derive(Debug, Default)]
pub struct RegionDifferences<'a> {
    pub only_old: Vec<&'a DumpRegion>,
    pub only_new: Vec<&'a DumpRegion>,
}

#[derive(Debug)]
pub struct ImageStack {
    images: Vec<Image>,
    selected: Option<i32>,
    fan_out: usize,
    max_diff_region: usize,
}

impl ImageStack {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            images: Vec::new(),
            selected: None,
            fan_out: config.fan_out,
            max_diff_region: config.max_diff_region,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn top(&self) -> Option<&Image> {
        self.images.last()
    }

    /// Push an empty image unless the top one is already empty
    pub fn push_if_needed(&mut self) {
        if self.top().is_none_or(|top| !top.is_empty()) {
            self.images.push(Image::default());
        }
    }

    pub fn push(&mut self, image: Image) {
        self.images.push(image);
    }

    pub fn pop(&mut self) -> Option<Image> {
        self.images.pop()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.selected = None;
    }

    /// Load a dump file as a new top image, reusing the top image if it is
    /// still empty.
    ///
    /// Returns the number of regions loaded. A corrupt tail is logged and the
    /// regions before it are kept.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, format: DumpFormat) -> Result<usize> {
        let outcome = dump::read_dump(path, format)?;
        let count = outcome.regions.len();

        self.push_if_needed();
        if let Some(top) = self.images.last_mut() {
            top.regions.extend(outcome.regions);
        }
        Ok(count)
    }

    /// Restrict [`ImageStack::find`] to the region at `base`, or lift the
    /// restriction with `None`.
    ///
    /// Returns `false` (and leaves the selection alone) if the top image has
    /// no region at `base`.
    pub fn select_region(&mut self, base: Option<i32>) -> bool {
        match base {
            None => {
                self.selected = None;
                true
            }
            Some(base) => {
                if self.top().and_then(|top| top.region(base)).is_none() {
                    return false;
                }
                self.selected = Some(base);
                true
            }
        }
    }

    pub fn selected(&self) -> Option<i32> {
        self.selected
    }

    /// Best alignments of `query` in the top image, best first
    pub fn find(&self, query: &[u8]) -> Vec<MatchCandidate<'_>> {
        let mut matcher = SequenceMatcher::new(self.fan_out);
        if let Some(top) = self.top() {
            for region in &top.regions {
                if self.selected.is_some_and(|base| base != region.base) {
                    continue;
                }
                matcher.search(query, region);
            }
        }
        matcher.into_matches()
    }

    /// Diff every region of the two top images.
    ///
    /// Regions larger than the configured limit are skipped with a warning
    /// and identical regions are left out. `None` with fewer than two images.
    pub fn diff_regions(&self, aligner: &dyn Aligner) -> Option<Vec<RegionDiff<'_>>> {
        let (old, new) = self.top_two()?;
        let mut diffs = Vec::new();

        for source in &old.regions {
            match new.region(source.base) {
                Some(target) => {
                    if let Some(diff) = self.diff_pair(source, target, aligner) {
                        diffs.push(diff);
                    }
                }
                None => {
                    if !source.is_empty() {
                        diffs.push(RegionDiff::OnlyOld(source));
                    }
                }
            }
        }

        for target in &new.regions {
            if old.region(target.base).is_none() && !target.is_empty() {
                diffs.push(RegionDiff::OnlyNew(target));
            }
        }

        Some(diffs)
    }

    fn diff_pair<'a>(
        &self,
        source: &'a DumpRegion,
        target: &'a DumpRegion,
        aligner: &dyn Aligner,
    ) -> Option<RegionDiff<'a>> {
        if source.is_empty() {
            return (!target.is_empty()).then_some(RegionDiff::OnlyNew(target));
        }
        if target.is_empty() {
            return Some(RegionDiff::OnlyOld(source));
        }

        for region in [source, target] {
            if region.len() > self.max_diff_region {
                warn!(
                    "Region at {} too large to diff ({} bytes)",
                    region.base,
                    region.len()
                );
                return None;
            }
        }

        let diff = DiffBuffer::from_ops(aligner.align(&source.bytes, &target.bytes));
        (!diff.is_empty()).then_some(RegionDiff::Changed { source, diff })
    }

    /// Hunks turning the older image's region at `base` into the newer one's.
    ///
    /// Both images must hold the region and neither side may exceed the
    /// configured diff limit.
    pub fn region_diff(&self, base: i32, aligner: &dyn Aligner) -> Result<RegionHunks<'_>> {
        let (old, new) = self.top_two().ok_or(Error::NeedTwoImages)?;
        let (Some(source), Some(target)) = (old.region(base), new.region(base)) else {
            return Err(Error::RegionMissing(base));
        };

        if let Some(region) = [source, target]
            .into_iter()
            .find(|r| r.len() > self.max_diff_region)
        {
            return Err(Error::RegionTooLarge {
                base,
                len: region.len(),
            });
        }

        let hunks = aligner.hunks(&source.bytes, &target.bytes);
        debug!(
            "Region at {}: {} hunks, {}/{} bytes",
            base,
            hunks.len(),
            source.len(),
            target.len()
        );
        Ok(RegionHunks {
            source,
            target,
            hunks,
        })
    }

    /// Best alignments of `query` across region differences, best first.
    ///
    /// Changed regions are searched in their flattened diff, one-sided
    /// regions are searched whole.
    pub fn find_in_diffs<'a>(
        &self,
        diffs: &'a [RegionDiff<'a>],
        query: &[u8],
    ) -> Vec<MatchCandidate<'a>> {
        let mut matcher = SequenceMatcher::new(self.fan_out);
        for entry in diffs {
            match entry {
                RegionDiff::Changed { source, diff } => matcher.search_diff(query, diff, source),
                RegionDiff::OnlyOld(region) | RegionDiff::OnlyNew(region) => {
                    matcher.search(query, region)
                }
            }
        }
        matcher.into_matches()
    }

    /// Regions present in only one of the two top images
    pub fn region_differences(&self) -> Option<RegionDifferences<'_>> {
        let (old, new) = self.top_two()?;
        let differences = RegionDifferences {
            only_old: old
                .regions
                .iter()
                .filter(|r| new.region(r.base).is_none())
                .collect(),
            only_new: new
                .regions
                .iter()
                .filter(|r| old.region(r.base).is_none())
                .collect(),
        };
        info!(
            "{} regions only in the older image, {} only in the newer",
            differences.only_old.len(),
            differences.only_new.len()
        );
        Some(differences)
    }

    fn top_two(&self) -> Option<(&Image, &Image)> {
        match self.images.as_slice() {
            [.., old, new] => Some((old, new)),
            _ => None,
        }
    }
}

impl Default for ImageStack {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{DiffOp, MyersAligner};
    use tempfile::tempdir;

    fn image(regions: &[(i32, &[u8])]) -> Image {
        Image {
            regions: regions
                .iter()
                .map(|&(base, bytes)| DumpRegion::new(base, bytes.to_vec()))
                .collect(),
        }
    }

    #[test]
    fn test_push_if_needed_reuses_empty_top() {
        let mut stack = ImageStack::default();
        stack.push_if_needed();
        stack.push_if_needed();
        assert_eq!(stack.len(), 1);

        stack.push(image(&[(0, b"x")]));
        stack.push_if_needed();
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_pop_and_clear() {
        let mut stack = ImageStack::default();
        assert!(stack.pop().is_none());
        stack.push(image(&[(0, b"x")]));
        stack.push(image(&[(1, b"y")]));
        assert_eq!(stack.pop().unwrap().regions[0].base, 1);
        stack.clear();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_each_load_is_a_new_image() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        dump::write_dump(&first, &image(&[(0, b"abc")]).regions, DumpFormat::Segmented).unwrap();
        std::fs::write(&second, b"raw bytes").unwrap();

        let mut stack = ImageStack::default();
        assert_eq!(stack.load(&first, DumpFormat::Segmented).unwrap(), 1);
        assert_eq!(stack.load(&second, DumpFormat::Raw).unwrap(), 1);

        assert_eq!(stack.len(), 2);
        let top = stack.top().unwrap();
        assert_eq!(top.regions.len(), 1);
        assert_eq!(top.total_bytes(), 9);
    }

    #[test]
    fn test_load_missing_file_leaves_stack_alone() {
        let dir = tempdir().unwrap();
        let mut stack = ImageStack::default();
        assert!(stack.load(dir.path().join("missing"), DumpFormat::Raw).is_err());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_find_respects_selection() {
        let mut stack = ImageStack::default();
        stack.push(image(&[(0x10, b"needle"), (0x20, b"needle")]));

        assert_eq!(stack.find(b"needle").iter().filter(|m| m.score == 6).count(), 2);

        assert!(stack.select_region(Some(0x20)));
        let matches = stack.find(b"needle");
        assert!(matches.iter().all(|m| m.region.unwrap().base == 0x20));

        assert!(!stack.select_region(Some(0x30)));
        assert_eq!(stack.selected(), Some(0x20));

        assert!(stack.select_region(None));
        assert_eq!(stack.selected(), None);
    }

    #[test]
    fn test_find_on_empty_stack() {
        let stack = ImageStack::default();
        assert!(stack.find(b"x").is_empty());
    }

    #[test]
    fn test_diffs_need_two_images() {
        let mut stack = ImageStack::default();
        stack.push(image(&[(0, b"a")]));
        assert!(stack.diff_regions(&MyersAligner::default()).is_none());
        assert!(stack.region_differences().is_none());
    }

    #[test]
    fn test_find_in_diffs() {
        let mut stack = ImageStack::default();
        stack.push(image(&[(0, b"gold: 100 ok"), (8, b"same"), (16, b"old only")]));
        stack.push(image(&[(0, b"gold: 250 ok"), (8, b"same"), (24, b"new only")]));

        let aligner = MyersAligner::new(4);
        let diffs = stack.diff_regions(&aligner).unwrap();
        // the identical region at 8 is left out
        assert_eq!(diffs.len(), 3);

        let matches = stack.find_in_diffs(&diffs, b"250");
        let best = matches[0];
        assert_eq!(best.score, 3);
        assert_eq!(best.region.unwrap().base, 0);
        assert_eq!(best.context(0).matched, b"250");

        let matches = stack.find_in_diffs(&diffs, b"new only");
        assert_eq!(matches[0].score, 8);
        assert_eq!(matches[0].region.unwrap().base, 24);
    }

    #[test]
    fn test_oversized_regions_are_not_diffed() {
        let config = EngineConfig::builder().max_diff_region(4).build();
        let mut stack = ImageStack::new(&config);
        stack.push(image(&[(0, b"aaaaaa")]));
        stack.push(image(&[(0, b"aaaaab")]));

        let diffs = stack.diff_regions(&MyersAligner::default()).unwrap();
        assert!(diffs.is_empty());
    }

    #[test]
    fn test_empty_side_is_searched_directly() {
        let mut stack = ImageStack::default();
        stack.push(image(&[(0, b"")]));
        stack.push(image(&[(0, b"data")]));

        let diffs = stack.diff_regions(&MyersAligner::default()).unwrap();
        assert!(matches!(diffs[..], [RegionDiff::OnlyNew(r)] if r.bytes == b"data"));
    }

    #[test]
    fn test_region_diff_hunks() {
        let mut stack = ImageStack::default();
        let mut old = vec![0u8; 200];
        let mut new = old.clone();
        old[20] = b'a';
        old[150] = b'd';
        new[20] = b'b';
        new[150] = b'c';
        stack.push(image(&[(-0x40, old.as_slice()), (0, b"x")]));
        stack.push(image(&[(-0x40, new.as_slice()), (8, b"y")]));

        let diff = stack.region_diff(-0x40, &MyersAligner::new(3)).unwrap();
        assert_eq!(diff.source.len(), 200);
        assert_eq!(diff.hunks.len(), 2);
        assert_eq!(diff.hunks[0].source, 17..24);
        assert_eq!(
            diff.hunks[0].ops[3..5],
            [DiffOp::Removed(b'a'), DiffOp::Added(b'b')]
        );
        assert_eq!(diff.hunks[1].changes(), 2);
    }

    #[test]
    fn test_region_diff_failures() {
        let mut stack = ImageStack::default();
        stack.push(image(&[(0, b"abc"), (4, b"only old")]));
        assert!(matches!(
            stack.region_diff(0, &MyersAligner::default()),
            Err(Error::NeedTwoImages)
        ));

        stack.push(image(&[(0, b"abd")]));
        assert!(matches!(
            stack.region_diff(4, &MyersAligner::default()),
            Err(Error::RegionMissing(4))
        ));

        let config = EngineConfig::builder().max_diff_region(2).build();
        let mut small = ImageStack::new(&config);
        small.push(image(&[(0, b"abc")]));
        small.push(image(&[(0, b"abd")]));
        assert!(matches!(
            small.region_diff(0, &MyersAligner::default()),
            Err(Error::RegionTooLarge { base: 0, len: 3 })
        ));

        // identical regions diff to nothing
        stack.push(image(&[(0, b"abd")]));
        assert!(stack.region_diff(0, &MyersAligner::default()).unwrap().hunks.is_empty());
    }

    #[test]
    fn test_region_differences() {
        let mut stack = ImageStack::default();
        stack.push(image(&[(0, b"a"), (4, b"b")]));
        stack.push(image(&[(4, b"c"), (8, b"d")]));

        let differences = stack.region_differences().unwrap();
        let old: Vec<i32> = differences.only_old.iter().map(|r| r.base).collect();
        let new: Vec<i32> = differences.only_new.iter().map(|r| r.base).collect();
        assert_eq!(old, vec![0]);
        assert_eq!(new, vec![8]);
    }
}
