use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "rollover",
    version,
    about = "Daily live-results rollover with quarter-partitioned archive and retention"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Roll the live slot over if today's rollover is still pending.
    Run {
        /// Evaluate as of this RFC 3339 instant instead of the system clock.
        #[arg(long)]
        at: Option<String>,
        /// Report what would happen without touching the store or files.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show configuration, remote flag state and local quarter files.
    Status,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "{}: {}",
        report.command,
        if report.ok { "ok" } else { "issues found" }
    );
    for detail in &report.details {
        println!("  - {detail}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match &cli.command {
        Command::Run { at, dry_run } => commands::run::run(&commands::run::RunCommandOptions {
            at: at.clone(),
            dry_run: *dry_run,
        })?,
        Command::Status => commands::status::run()?,
    };

    render(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} reported {} issue(s)", report.command, report.issues.len());
    }
    Ok(())
}
