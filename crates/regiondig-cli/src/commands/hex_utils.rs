//! Address and region base parsing and formatting.

use anyhow::{Result, bail};

/// Parse a hex address string (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

/// Format an address as a hex string with 0x prefix.
pub fn format_hex_address(addr: u64) -> String {
    format!("0x{:X}", addr)
}

/// Parse a dump region base: decimal, or hex with a 0x prefix, optionally
/// negative.
pub fn parse_region_base(s: &str) -> Result<i32> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = if digits.starts_with("0x") || digits.starts_with("0X") {
        i64::try_from(parse_hex_address(digits)?)?
    } else {
        digits
            .parse::<i64>()
            .map_err(|e| anyhow::anyhow!("Invalid region base: {}", e))?
    };
    let value = if negative { -magnitude } else { magnitude };
    match i32::try_from(value) {
        Ok(base) => Ok(base),
        Err(_) => bail!("Region base out of range: {}", s),
    }
}

/// Format a region base the way [`parse_region_base`] reads it back
pub fn format_region_base(base: i32) -> String {
    if base < 0 {
        format!("-0x{:X}", base.unsigned_abs())
    } else {
        format!("0x{:X}", base)
    }
}

/// Space-separated uppercase hex of `bytes`
pub fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Space-separated characters of `bytes`, with control bytes shown as `_`
pub fn ascii_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b < 32 { '_' } else { char::from(b) }.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
