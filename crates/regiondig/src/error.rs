use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Ambiguous process pattern '{pattern}' ({count} matches)")]
    AmbiguousProcess { pattern: String, count: usize },

    #[error("Failed to open process {pid}: {message}")]
    ProcessOpenFailed { pid: u32, message: String },

    #[error("No process attached")]
    NotAttached,

    #[error("Target process is no longer available")]
    TargetLost,

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    ReadDenied { address: u64, message: String },

    #[error("Partial read at address {address:#x}: {actual} of {requested} bytes")]
    PartialRead {
        address: u64,
        requested: usize,
        actual: usize,
    },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    WriteFailed { address: u64, message: String },

    #[error("Corrupt region header at byte {offset} ({remaining} bytes remaining)")]
    CorruptHeader { offset: usize, remaining: usize },

    #[error("Region at {base} is too large ({len} bytes)")]
    RegionTooLarge { base: i32, len: usize },

    #[error("No region at base {0} in both images")]
    RegionMissing(i32),

    #[error("Two images are needed to compare")]
    NeedTwoImages,

    #[error("Value out of range: '{0}'")]
    ValueParseOverflow(String),

    #[error("Invalid value: '{0}'")]
    ValueParseInvalid(String),

    #[error("Invalid scan operator: '{0}'")]
    InvalidScanOp(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Whether the error rejected a value literal before any state changed
    pub fn is_value_parse(&self) -> bool {
        matches!(
            self,
            Error::ValueParseOverflow(_) | Error::ValueParseInvalid(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_error_is_value_parse() {
        assert!(Error::ValueParseOverflow("256uo".into()).is_value_parse());
        assert!(Error::ValueParseInvalid("abc".into()).is_value_parse());
        assert!(!Error::NotAttached.is_value_parse());
    }

    #[test]
    fn test_corrupt_header_message() {
        let err = Error::CorruptHeader {
            offset: 16,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "Corrupt region header at byte 16 (3 bytes remaining)"
        );
    }
}
