//! Region listing command.

use anyhow::Result;
use owo_colors::OwoColorize;
use regiondig::memory::RegionIterator;
use regiondig::process::open_process;

use crate::commands::hex_utils::format_hex_address;

pub fn run(target: &str, json: bool) -> Result<()> {
    let process = open_process(target)?;
    let regions: Vec<_> = RegionIterator::new(&process).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }

    println!(
        "{:>18}  {:>18}  {:>12}  {}",
        "ALLOCATION".bold(),
        "BASE".bold(),
        "SIZE".bold(),
        "PROT".bold()
    );
    let mut total = 0usize;
    for region in &regions {
        total += region.size;
        println!(
            "{:>18}  {:>18}  {:>12}  {}",
            format_hex_address(region.base),
            format_hex_address(region.mapped_base),
            region.size,
            region.protection
        );
    }
    println!("{} regions, {} bytes committed", regions.len(), total);
    Ok(())
}
