//! Dump capture command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use regiondig::EngineConfig;
use regiondig::dump::{DumpFormat, capture, find_reference_offset, write_dump};
use regiondig::process::open_process;

use crate::commands::hex_utils::format_hex_address;

/// `dump-<pid>-<timestamp>.bin` in the working directory
fn default_output(pid: u32) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("dump-{}-{}.bin", pid, stamp))
}

/// Run the dump command
pub fn run(
    config: &EngineConfig,
    target: &str,
    output: Option<PathBuf>,
    raw: bool,
    magic: Option<&str>,
) -> Result<()> {
    let process = open_process(target)?;

    let reference = match magic {
        Some(magic) => {
            let address = find_reference_offset(&process, magic.as_bytes())
                .with_context(|| format!("Reference string {:?} not found", magic))?;
            println!("Reference offset: {}", format_hex_address(address));
            address
        }
        None => 0,
    };

    let regions = capture(&process, reference, config.dump_skip_executable);
    let format = if raw {
        DumpFormat::Raw
    } else {
        DumpFormat::Segmented
    };
    let path = output.unwrap_or_else(|| default_output(process.pid()));
    write_dump(&path, &regions, format)?;

    let total: usize = regions.iter().map(|r| r.len()).sum();
    println!(
        "Dumped {} regions ({} bytes, {}) to {}",
        regions.len(),
        total,
        format,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        let name = default_output(42).display().to_string();
        assert!(name.starts_with("dump-42-"));
        assert!(name.ends_with(".bin"));
    }
}
