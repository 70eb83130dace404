//! Process listing command.

use anyhow::Result;
use owo_colors::OwoColorize;
use regiondig::ProcessEntry;
use regiondig::process::list_processes;

/// Processes whose name contains `filter`, case-insensitively
fn filter_processes(processes: Vec<ProcessEntry>, filter: Option<&str>) -> Vec<ProcessEntry> {
    match filter {
        Some(filter) => {
            let needle = filter.to_lowercase();
            processes
                .into_iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .collect()
        }
        None => processes,
    }
}

pub fn run(filter: Option<&str>, json: bool) -> Result<()> {
    let processes = filter_processes(list_processes()?, filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&processes)?);
        return Ok(());
    }

    println!("{:>8}  {}", "PID".bold(), "NAME".bold());
    for process in &processes {
        println!("{:>8}  {}", process.pid, process.name);
    }
    println!("{} processes", processes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_is_case_insensitive() {
        let processes = vec![
            ProcessEntry {
                pid: 1,
                name: "Game.exe".to_string(),
            },
            ProcessEntry {
                pid: 2,
                name: "shell".to_string(),
            },
        ];
        let filtered = filter_processes(processes.clone(), Some("GAME"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].pid, 1);
        assert_eq!(filter_processes(processes, None).len(), 2);
    }
}
