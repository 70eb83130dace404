//! Live value scan command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use regiondig::process::open_process;
use regiondig::shutdown::ShutdownSignal;
use regiondig::{Engine, EngineConfig, ProcessHandle, ScanOp, TypedValue};
use tracing::info;

use crate::commands::hex_utils::format_hex_address;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Process name or `:pid`
    pub target: String,

    /// Value literal, e.g. `100`, `255uo`, `1.5f`
    #[arg(allow_hyphen_values = true)]
    pub value: String,

    /// Comparison for the initial scan
    #[arg(long, default_value = "=")]
    pub op: String,

    /// Narrow after each interval, e.g. `"> 100"` or `"=42h"`
    #[arg(long, allow_hyphen_values = true)]
    pub narrow: Vec<String>,

    /// Seconds to wait before each narrow
    #[arg(long, default_value_t = 5.0)]
    pub interval: f64,

    /// Write this value to every remaining address
    #[arg(long, allow_hyphen_values = true)]
    pub set: Option<String>,

    /// Lock remaining addresses (to VALUE if given) until Ctrl-C
    #[arg(long, num_args = 0..=1)]
    pub lock: Option<Option<String>>,

    /// Number of addresses to print
    #[arg(long, default_value_t = 20)]
    pub show: usize,
}

/// Split `"<= 100"` / `"<=100"` / `"100"` into an operator and a value
fn parse_narrow(text: &str) -> Result<(ScanOp, TypedValue)> {
    let text = text.trim();
    let split = text
        .find(|c: char| !matches!(c, '=' | '<' | '>'))
        .unwrap_or(text.len());
    let (op, value) = text.split_at(split);
    let op = if op.is_empty() {
        ScanOp::Eq
    } else {
        ScanOp::parse(op)?
    };
    let value = TypedValue::parse(value.trim())
        .with_context(|| format!("Invalid narrow step '{}'", text))?;
    Ok((op, value))
}

fn show(engine: &mut Engine<ProcessHandle>, limit: usize) -> Result<()> {
    let mut rows = Vec::new();
    engine.visit(|address, value| {
        if rows.len() < limit {
            rows.push((address, value));
        }
    })?;

    for (address, value) in rows {
        match value {
            Some(value) => println!("  {}  {}", format_hex_address(address), value),
            None => println!("  {}  {}", format_hex_address(address), "??".dimmed()),
        }
    }
    let total = engine.watchlist().len();
    if total > limit {
        println!("  ... {} more", total - limit);
    }
    Ok(())
}

/// Run the scan command
pub fn run(config: &EngineConfig, args: &ScanArgs) -> Result<()> {
    let op = ScanOp::parse(&args.op)?;
    let value = TypedValue::parse(&args.value)?;
    let narrows = args
        .narrow
        .iter()
        .map(|step| parse_narrow(step))
        .collect::<Result<Vec<_>>>()?;
    let set = args.set.as_deref().map(TypedValue::parse).transpose()?;
    let lock_value = match &args.lock {
        Some(Some(text)) => Some(TypedValue::parse(text)?),
        _ => None,
    };

    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let mut engine = Engine::new(config.clone());
    engine.attach(Arc::new(open_process(&args.target)?))?;

    let found = engine.scan(op, value)?;
    println!("{} {} addresses {} {}", "scan".bold(), found, op, value);

    let interval = Duration::from_secs_f64(args.interval.max(0.0));
    for (op, value) in narrows {
        if shutdown.wait(interval) {
            break;
        }
        let kept = engine.narrow(op, value)?;
        println!("{} {} addresses {} {}", "narrow".bold(), kept, op, value);
    }

    show(&mut engine, args.show)?;

    if let Some(value) = set {
        let report = engine.set(value)?;
        println!(
            "{} {}: {} written, {} failed",
            "set".bold(),
            value,
            report.written.green(),
            report.failed.red()
        );
    }

    if args.lock.is_some() && !shutdown.is_shutdown() {
        let locked = engine.lock_all(lock_value)?;
        println!("{} {} addresses, Ctrl-C to release", "locked".bold(), locked);
        shutdown.wait_forever();
        let stats = engine.locker()?.stats();
        engine.unlock_all()?;
        println!(
            "Released after {} passes ({} writes, {} failures)",
            stats.passes, stats.writes, stats.failures
        );
    }

    engine.detach();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_narrow_forms() {
        let (op, value) = parse_narrow("> 100").unwrap();
        assert_eq!(op, ScanOp::Gt);
        assert_eq!(value, TypedValue::I32(100));

        let (op, value) = parse_narrow("<=42h").unwrap();
        assert_eq!(op, ScanOp::Le);
        assert_eq!(value, TypedValue::I16(42));

        let (op, _) = parse_narrow("7").unwrap();
        assert_eq!(op, ScanOp::Eq);
    }

    #[test]
    fn test_parse_narrow_rejects_garbage() {
        assert!(parse_narrow("=>").is_err());
        assert!(parse_narrow("<< 5").is_err());
        assert!(parse_narrow("> abc").is_err());
    }
}
