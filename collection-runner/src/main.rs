//! Run scripted API collections through the `workflows` step helpers.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use collection_runner::collection::{load_collection, load_with_poll_config};
use collection_runner::exit_codes;
use collection_runner::report::{RunReport, exit_code, render_invocation, render_summary, write_report};
use collection_runner::sequencer::{RunOptions, Sequencer};

#[derive(Parser)]
#[command(
    name = "collection-runner",
    version,
    about = "Step-at-a-time runner for scripted API collections"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a collection and print each invocation's test results.
    Run {
        /// Collection file (TOML).
        file: PathBuf,
        /// Also write a JSON report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Poll config file (TOML) replacing the collection's poll settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Check a collection against the schema, operators and step references.
    Validate {
        /// Collection file (TOML).
        file: PathBuf,
    },
    /// Run a collection and print each invocation's reference state.
    State {
        /// Collection file (TOML).
        file: PathBuf,
        /// Poll config file (TOML) replacing the collection's poll settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    workflows::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            report,
            config,
        } => cmd_run(&file, report.as_deref(), config.as_deref()),
        Command::Validate { file } => cmd_validate(&file),
        Command::State { file, config } => cmd_state(&file, config.as_deref()),
    }
}

fn cmd_run(file: &Path, report_path: Option<&Path>, config: Option<&Path>) -> Result<i32> {
    let collection = load_with_poll_config(file, config)?;
    let started_at = Utc::now();
    let outcome = Sequencer::new(&collection, RunOptions::default())
        .run(|invocation| print!("{}", render_invocation(invocation)));
    println!("{}", render_summary(&outcome));

    let report = RunReport::new(file, started_at, outcome);
    if let Some(path) = report_path {
        write_report(path, &report)?;
    }
    Ok(report.exit_code)
}

fn cmd_validate(file: &Path) -> Result<i32> {
    let collection = load_collection(file)?;
    println!(
        "{}: ok ({} steps)",
        file.display(),
        collection.steps.len()
    );
    Ok(exit_codes::OK)
}

fn cmd_state(file: &Path, config: Option<&Path>) -> Result<i32> {
    let collection = load_with_poll_config(file, config)?;
    let options = RunOptions {
        generate_state: true,
    };
    let outcome = Sequencer::new(&collection, options).run(|invocation| {
        println!("# {} #{}", invocation.step, invocation.attempt);
        if let Some(state) = &invocation.state {
            print!("{state}");
        }
    });
    Ok(exit_code(&outcome))
}
