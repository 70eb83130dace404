//! Memory dump files.
//!
//! A segmented dump is a sequence of records
//!
//! ```text
//! +-----------+-------------+------------------+
//! | base: i32 | length: u32 | length raw bytes |
//! +-----------+-------------+------------------+
//! ```
//!
//! with both header fields little-endian. `base` is the region's mapped
//! address minus a reference offset, so dumps taken from different runs of
//! the same program line up even when the loader moved things around.
//!
//! A raw dump is the region bytes concatenated with no framing.

mod capture;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::memory::layout::dump::{BASE_LEN, HEADER_LEN};

pub use capture::{capture, find_reference_offset};

/// A captured region: reference-relative base plus its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRegion {
    pub base: i32,
    pub bytes: Vec<u8>,
}

impl DumpRegion {
    pub fn new(base: i32, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    #[default]
    Segmented,
    Raw,
}

/// Where a segmented stream stopped making sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorruptHeader {
    /// Byte offset of the bad record header
    pub offset: usize,
    /// Bytes left in the stream at that point
    pub remaining: usize,
}

impl From<CorruptHeader> for Error {
    fn from(c: CorruptHeader) -> Self {
        Error::CorruptHeader {
            offset: c.offset,
            remaining: c.remaining,
        }
    }
}

/// Regions decoded from a stream, plus the corruption that ended decoding
/// early, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutcome {
    pub regions: Vec<DumpRegion>,
    pub corrupt: Option<CorruptHeader>,
}

impl DecodeOutcome {
    pub fn is_complete(&self) -> bool {
        self.corrupt.is_none()
    }

    /// All regions, or the corruption error if decoding stopped early
    pub fn into_result(self) -> Result<Vec<DumpRegion>> {
        match self.corrupt {
            Some(corrupt) => Err(corrupt.into()),
            None => Ok(self.regions),
        }
    }
}

fn record_length(base: i32, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::RegionTooLarge { base, len })
}

/// Fails without writing anything if a region does not fit in one record
pub fn encode_segmented(regions: &[DumpRegion]) -> Result<Vec<u8>> {
    let lengths = regions
        .iter()
        .map(|r| record_length(r.base, r.len()))
        .collect::<Result<Vec<u32>>>()?;

    let total = regions.iter().map(|r| HEADER_LEN + r.bytes.len()).sum();
    let mut out = Vec::with_capacity(total);
    for (region, length) in regions.iter().zip(lengths) {
        out.extend_from_slice(&region.base.to_le_bytes());
        out.extend_from_slice(&length.to_le_bytes());
        out.extend_from_slice(&region.bytes);
    }
    Ok(out)
}

pub fn encode_raw(regions: &[DumpRegion]) -> Vec<u8> {
    regions.iter().flat_map(|r| r.bytes.iter().copied()).collect()
}

pub fn encode(regions: &[DumpRegion], format: DumpFormat) -> Result<Vec<u8>> {
    match format {
        DumpFormat::Segmented => encode_segmented(regions),
        DumpFormat::Raw => Ok(encode_raw(regions)),
    }
}

/// Decode a segmented stream.
///
/// Stops at the first record whose header is truncated or whose length runs
/// past the end of the stream; regions before it are still returned.
pub fn decode_segmented(bytes: &[u8]) -> DecodeOutcome {
    let mut regions = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        let corrupt = CorruptHeader { offset, remaining };

        let Some(header) = bytes.get(offset..offset + HEADER_LEN) else {
            return DecodeOutcome {
                regions,
                corrupt: Some(corrupt),
            };
        };

        let (base, length) = header.split_at(BASE_LEN);
        let base = i32::from_le_bytes([base[0], base[1], base[2], base[3]]);
        let length = u32::from_le_bytes([length[0], length[1], length[2], length[3]]) as usize;

        let start = offset + HEADER_LEN;
        let Some(data) = start.checked_add(length).and_then(|end| bytes.get(start..end)) else {
            return DecodeOutcome {
                regions,
                corrupt: Some(corrupt),
            };
        };

        regions.push(DumpRegion::new(base, data.to_vec()));
        offset = start + length;
    }

    DecodeOutcome {
        regions,
        corrupt: None,
    }
}

/// A raw stream is a single region at base 0
pub fn decode_raw(bytes: &[u8]) -> Vec<DumpRegion> {
    vec![DumpRegion::new(0, bytes.to_vec())]
}

pub fn decode(bytes: &[u8], format: DumpFormat) -> DecodeOutcome {
    match format {
        DumpFormat::Segmented => decode_segmented(bytes),
        DumpFormat::Raw => DecodeOutcome {
            regions: decode_raw(bytes),
            corrupt: None,
        },
    }
}

pub fn write_dump<P: AsRef<Path>>(path: P, regions: &[DumpRegion], format: DumpFormat) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(regions, format)?;
    fs::write(path, &bytes)?;
    info!(
        "Wrote {} regions ({} bytes) to {}",
        regions.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Load a dump file; a corrupt tail is logged and the intact prefix kept
pub fn read_dump<P: AsRef<Path>>(path: P, format: DumpFormat) -> Result<DecodeOutcome> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let outcome = decode(&bytes, format);

    if let Some(corrupt) = outcome.corrupt {
        warn!("{}: {}", path.display(), Error::from(corrupt));
    }
    info!(
        "Loaded {} regions ({} bytes) from {}",
        outcome.regions.len(),
        bytes.len(),
        path.display()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<DumpRegion> {
        vec![
            DumpRegion::new(-0x1000, vec![1, 2, 3]),
            DumpRegion::new(0, Vec::new()),
            DumpRegion::new(0x7FFF_0000, vec![0xAA; 300]),
        ]
    }

    #[test]
    fn test_segmented_layout() {
        let bytes = encode_segmented(&[DumpRegion::new(-1, vec![9, 8])]).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF, 2, 0, 0, 0, 9, 8]);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let regions = sample();
        let outcome = decode_segmented(&encode_segmented(&regions).unwrap());
        assert!(outcome.is_complete());
        assert_eq!(outcome.regions, regions);
    }

    #[test]
    fn test_record_length_limit() {
        assert_eq!(record_length(0, 300).unwrap(), 300);
        assert_eq!(record_length(0, u32::MAX as usize).unwrap(), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_region_is_rejected() {
        let len = u32::MAX as usize + 1;
        let err = record_length(-16, len).unwrap_err();
        assert!(matches!(err, Error::RegionTooLarge { base: -16, len: l } if l == len));
        assert_eq!(err.to_string(), "Region at -16 is too large (4294967296 bytes)");
    }

    #[test]
    fn test_empty_stream() {
        let outcome = decode_segmented(&[]);
        assert!(outcome.is_complete());
        assert!(outcome.regions.is_empty());
    }

    #[test]
    fn test_short_stream_is_corrupt() {
        let outcome = decode_segmented(&[1, 2, 3, 4, 5, 6, 7]);
        assert!(outcome.regions.is_empty());
        assert_eq!(
            outcome.corrupt,
            Some(CorruptHeader {
                offset: 0,
                remaining: 7
            })
        );
        assert!(matches!(
            outcome.into_result(),
            Err(Error::CorruptHeader { .. })
        ));
    }

    #[test]
    fn test_truncated_tail_keeps_prefix() {
        let mut bytes = encode_segmented(&sample()[..1]).unwrap();
        // header claims 16 bytes but only 2 follow
        bytes.extend_from_slice(&5i32.to_le_bytes());
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0]);

        let outcome = decode_segmented(&bytes);
        assert_eq!(outcome.regions, sample()[..1].to_vec());
        assert_eq!(
            outcome.corrupt,
            Some(CorruptHeader {
                offset: 11,
                remaining: 10
            })
        );
    }

    #[test]
    fn test_raw_round_trip() {
        let bytes = encode_raw(&sample());
        assert_eq!(bytes.len(), 303);
        let regions = decode_raw(&bytes);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].base, 0);
        assert_eq!(regions[0].bytes, bytes);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("raw".parse::<DumpFormat>().unwrap(), DumpFormat::Raw);
        assert_eq!(DumpFormat::Segmented.to_string(), "segmented");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.bin");

        write_dump(&path, &sample(), DumpFormat::Segmented).unwrap();
        let outcome = read_dump(&path, DumpFormat::Segmented).unwrap();
        assert_eq!(outcome.regions, sample());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_dump(dir.path().join("nope.bin"), DumpFormat::Raw).unwrap_err();
        assert!(err.is_not_found());
    }
}
