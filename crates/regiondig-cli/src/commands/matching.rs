//! Offline search commands over dump files.

use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use regiondig::EngineConfig;
use regiondig::dump::{DumpFormat, DumpRegion};
use regiondig::image::ImageStack;
use regiondig::matcher::{DiffOp, Hunk, MatchCandidate, MatchReport, MyersAligner, parse_query};

use crate::commands::hex_utils::{ascii_bytes, format_region_base, hex_bytes};

/// Bytes per row of a region dump
const ROW_LEN: usize = 32;

/// How matches are printed
#[derive(Debug, Clone, Copy)]
pub struct MatchOutput {
    /// Context bytes on each side of a match
    pub wrap: usize,
    pub limit: usize,
    pub json: bool,
}

fn format_of(raw: bool) -> DumpFormat {
    if raw {
        DumpFormat::Raw
    } else {
        DumpFormat::Segmented
    }
}

fn location(report: &MatchReport) -> String {
    match report.region_base {
        Some(base) => format!("{}+0x{:X}", format_region_base(base), report.offset),
        None => format!("+0x{:X}", report.offset),
    }
}

fn print_matches(matches: &[MatchCandidate<'_>], output: MatchOutput) -> Result<()> {
    let reports: Vec<MatchReport> = matches
        .iter()
        .take(output.limit)
        .map(|m| m.report(output.wrap))
        .collect();

    if output.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No matches");
        return Ok(());
    }

    for report in &reports {
        println!(
            "{:>3}/{:<3} {}  {} {} {}",
            report.score.green(),
            report.query_len,
            location(report).cyan(),
            hex_bytes(&report.before).dimmed(),
            hex_bytes(&report.matched).bold(),
            hex_bytes(&report.after).dimmed()
        );
    }
    if matches.len() > reports.len() {
        println!("... {} more", matches.len() - reports.len());
    }
    Ok(())
}

/// Search one dump for `query`
pub fn find(
    config: &EngineConfig,
    path: &Path,
    query: &str,
    raw: bool,
    region: Option<i32>,
    output: MatchOutput,
) -> Result<()> {
    let query = parse_query(query)?;
    let mut stack = ImageStack::new(config);
    stack.load(path, format_of(raw))?;

    if let Some(base) = region {
        if !stack.select_region(Some(base)) {
            bail!("No region at base {}", format_region_base(base));
        }
    }

    print_matches(&stack.find(&query), output)
}

/// Search the differences between two dumps for `query`
pub fn find_in_diff(
    config: &EngineConfig,
    old: &Path,
    new: &Path,
    query: &str,
    raw: bool,
    output: MatchOutput,
) -> Result<()> {
    let query = parse_query(query)?;
    let mut stack = ImageStack::new(config);
    stack.load(old, format_of(raw))?;
    stack.load(new, format_of(raw))?;

    let aligner = MyersAligner::new(output.wrap);
    let diffs = stack
        .diff_regions(&aligner)
        .context("Two dumps are needed to search differences")?;
    if !output.json {
        println!("{} regions differ", diffs.len());
    }

    print_matches(&stack.find_in_diffs(&diffs, &query), output)
}

fn render(bytes: &[u8], ascii: bool) -> String {
    if ascii {
        ascii_bytes(bytes)
    } else {
        hex_bytes(bytes)
    }
}

/// Header line plus one line per run of same-kind ops
fn format_hunk(hunk: &Hunk, ascii: bool) -> Vec<String> {
    let mut lines = vec![format!(
        "@@ -{},{} +{},{} @@",
        hunk.source.start,
        hunk.source.len(),
        hunk.target.start,
        hunk.target.len()
    )];

    for run in hunk
        .ops
        .chunk_by(|a, b| std::mem::discriminant(a) == std::mem::discriminant(b))
    {
        let marker = match run[0] {
            DiffOp::Common(_) => ' ',
            DiffOp::Removed(_) => '-',
            DiffOp::Added(_) => '+',
        };
        let bytes: Vec<u8> = run.iter().map(|op| op.byte()).collect();
        lines.push(format!("{}{}", marker, render(&bytes, ascii)));
    }
    lines
}

/// Show the byte hunks of one region between two dumps
pub fn data_diff(
    config: &EngineConfig,
    old: &Path,
    new: &Path,
    raw: bool,
    base: i32,
    ascii: bool,
    context: usize,
) -> Result<()> {
    let mut stack = ImageStack::new(config);
    stack.load(old, format_of(raw))?;
    stack.load(new, format_of(raw))?;

    let diff = stack.region_diff(base, &MyersAligner::new(context))?;
    println!(
        "Region {}: {}/{} bytes, {} hunks",
        format_region_base(base).cyan(),
        diff.source.len(),
        diff.target.len(),
        diff.hunks.len()
    );

    for hunk in &diff.hunks {
        for line in format_hunk(hunk, ascii) {
            match line.chars().next() {
                Some('@') => println!("{}", line.bold()),
                Some('-') => println!("{}", line.red()),
                Some('+') => println!("{}", line.green()),
                _ => println!("{}", line),
            }
        }
    }
    Ok(())
}

/// Two lines per row of `region`: bytes as hex, then as characters
fn region_rows(region: &DumpRegion, max_rows: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for (row, chunk) in region.bytes.chunks(ROW_LEN).enumerate().take(max_rows) {
        let offset = row * ROW_LEN;
        // bases are 32-bit and wrap like captured addresses do
        let address = region.base.wrapping_add(offset as i32);
        let label = format!("  +0x{:04X} ({})", offset, format_region_base(address));
        lines.push(format!("{}  {}", label, hex_bytes(chunk)));
        lines.push(format!("{}  {}", label, ascii_bytes(chunk)));
    }
    lines
}

fn print_regions(label: &str, regions: &[&DumpRegion], rows: Option<usize>) {
    println!("{} ({})", label.bold(), regions.len());
    for region in regions {
        println!("  {:>12}  {} bytes", format_region_base(region.base), region.len());
        let Some(max_rows) = rows else {
            continue;
        };
        for line in region_rows(region, max_rows) {
            println!("{}", line.dimmed());
        }
        let total = region.len().div_ceil(ROW_LEN);
        if total > max_rows {
            println!("  ... {} more rows", total - max_rows);
        }
    }
}

/// List regions present in only one of two dumps, optionally with their bytes
pub fn region_diff(
    config: &EngineConfig,
    old: &Path,
    new: &Path,
    raw: bool,
    rows: Option<usize>,
) -> Result<()> {
    let mut stack = ImageStack::new(config);
    stack.load(old, format_of(raw))?;
    stack.load(new, format_of(raw))?;

    let differences = stack
        .region_differences()
        .context("Two dumps are needed to compare regions")?;
    print_regions(&format!("Only in {}", old.display()), &differences.only_old, rows);
    print_regions(&format!("Only in {}", new.display()), &differences.only_new, rows);
    Ok(())
}
