mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::hex_utils::parse_region_base;
use crate::commands::matching::MatchOutput;
use crate::commands::scan::ScanArgs;

#[derive(Parser)]
#[command(name = "regiondig")]
#[command(about = "Live memory scanner and dump matcher")]
#[command(version)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "REGIONDIG_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct MatchArgs {
    /// Dumps are raw byte streams rather than segmented records
    #[arg(long)]
    raw: bool,

    /// Context bytes shown on each side of a match
    #[arg(long, default_value_t = 8)]
    wrap: usize,

    /// Maximum matches to print
    #[arg(long, default_value_t = 20)]
    limit: usize,

    #[arg(long)]
    json: bool,
}

impl MatchArgs {
    fn output(&self) -> MatchOutput {
        MatchOutput {
            wrap: self.wrap,
            limit: self.limit,
            json: self.json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List running processes
    Ps {
        /// Only processes whose name contains this
        filter: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// List committed memory regions of a process
    Regions {
        /// Process name or `:pid`
        target: String,

        #[arg(long)]
        json: bool,
    },
    /// Scan a process for a value, narrow, set and lock
    Scan(ScanArgs),
    /// Capture readable memory of a process to a dump file
    Dump {
        /// Process name or `:pid`
        target: String,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write region bytes without record headers
        #[arg(long)]
        raw: bool,

        /// Store region bases relative to the first occurrence of this string
        #[arg(long)]
        magic: Option<String>,
    },
    /// Search a dump for a byte sequence
    Find {
        dump: PathBuf,

        /// Space-separated bytes and "strings"
        query: String,

        /// Only search the region at this base
        #[arg(long, value_parser = parse_region_base, allow_hyphen_values = true)]
        region: Option<i32>,

        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Search the differences between two dumps
    Findd {
        old: PathBuf,
        new: PathBuf,
        query: String,

        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Show how one region's bytes changed between two dumps
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// Base of the region to compare
        #[arg(long, value_parser = parse_region_base, allow_hyphen_values = true)]
        region: i32,

        /// Print bytes as characters, control bytes as `_`
        #[arg(long)]
        ascii: bool,

        /// Unchanged bytes kept around each change
        #[arg(long, default_value_t = 3)]
        context: usize,

        #[arg(long)]
        raw: bool,
    },
    /// List regions present in only one of two dumps
    Diffr {
        old: PathBuf,
        new: PathBuf,

        /// Also print each listed region's bytes
        #[arg(long)]
        bytes: bool,

        /// Rows of 32 bytes printed per region with --bytes
        #[arg(long, default_value_t = 8)]
        rows: usize,

        #[arg(long)]
        raw: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "regiondig=debug"
    } else {
        "regiondig=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let config = config::load(cli.config.as_deref())?;
    debug!("{:?}", config);

    match cli.command {
        Command::Ps { filter, json } => commands::ps::run(filter.as_deref(), json),
        Command::Regions { target, json } => commands::regions::run(&target, json),
        Command::Scan(args) => commands::scan::run(&config, &args),
        Command::Dump {
            target,
            output,
            raw,
            magic,
        } => commands::dump::run(&config, &target, output, raw, magic.as_deref()),
        Command::Find {
            dump,
            query,
            region,
            matching,
        } => commands::matching::find(
            &config,
            &dump,
            &query,
            matching.raw,
            region,
            matching.output(),
        ),
        Command::Findd {
            old,
            new,
            query,
            matching,
        } => commands::matching::find_in_diff(
            &config,
            &old,
            &new,
            &query,
            matching.raw,
            matching.output(),
        ),
        Command::Diff {
            old,
            new,
            region,
            ascii,
            context,
            raw,
        } => commands::matching::data_diff(&config, &old, &new, raw, region, ascii, context),
        Command::Diffr {
            old,
            new,
            bytes,
            rows,
            raw,
        } => commands::matching::region_diff(&config, &old, &new, raw, bytes.then_some(rows)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_arguments() {
        let cli = Cli::parse_from([
            "regiondig", "scan", ":42", "100", "--narrow", "> 90", "--narrow", "=95", "--lock",
        ]);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.target, ":42");
        assert_eq!(args.narrow, vec!["> 90", "=95"]);
        assert_eq!(args.lock, Some(None));
    }

    #[test]
    fn test_negative_region_base() {
        let cli = Cli::parse_from(["regiondig", "find", "a.bin", "1 2", "--region", "-0x1000"]);
        let Command::Find { region, .. } = cli.command else {
            panic!("expected find");
        };
        assert_eq!(region, Some(-0x1000));
    }

    #[test]
    fn test_diff_arguments() {
        let cli = Cli::parse_from([
            "regiondig", "diff", "a.bin", "b.bin", "--region", "-0x40", "--ascii",
        ]);
        let Command::Diff {
            region,
            ascii,
            context,
            ..
        } = cli.command
        else {
            panic!("expected diff");
        };
        assert_eq!(region, -0x40);
        assert!(ascii);
        assert_eq!(context, 3);

        // a region base is required
        assert!(Cli::try_parse_from(["regiondig", "diff", "a.bin", "b.bin"]).is_err());

        let cli = Cli::parse_from(["regiondig", "diffr", "a.bin", "b.bin", "--bytes"]);
        let Command::Diffr { bytes, rows, .. } = cli.command else {
            panic!("expected diffr");
        };
        assert!(bytes);
        assert_eq!(rows, 8);
    }
}
