//! shellspec CLI
//!
//! Run a spec file of CLI test cases.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use shellspec::{parse_spec, Engine, EngineConfig, Reporter};

#[derive(Parser, Debug)]
#[command(name = "shellspec")]
#[command(version)]
#[command(about = "Run CLI test cases from a spec file")]
struct Cli {
    /// Spec file to run
    spec_file: PathBuf,

    /// Print the output of each command and per-assertion detail
    #[arg(long)]
    verbose: bool,

    /// Run only tests matching this number or substring of the test name
    #[arg(long)]
    test: Option<String>,

    /// Per-command timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Scratch root for per-test working directories (wiped at run start)
    #[arg(long = "workdir", default_value = "shellspec-tmp")]
    workdir: PathBuf,

    /// Command aliases (NAME=PATH), repeatable
    #[arg(long = "alias")]
    aliases: Vec<String>,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let content = std::fs::read_to_string(&cli.spec_file)
        .with_context(|| format!("failed to read spec file: {}", cli.spec_file.display()))?;
    let suite = parse_spec(&content)
        .with_context(|| format!("failed to parse {}", cli.spec_file.display()))?;

    let mut aliases = HashMap::new();
    for entry in &cli.aliases {
        match entry.split_once('=') {
            Some((name, target)) if !name.is_empty() && !target.is_empty() => {
                aliases.insert(name.to_string(), target.to_string());
            }
            _ => bail!("invalid alias (expected NAME=PATH): {}", entry),
        }
    }

    let config = EngineConfig {
        aliases,
        timeout: Duration::from_secs(cli.timeout),
        scratch_root: cli.workdir,
        spec_path: std::fs::canonicalize(&cli.spec_file).ok().or(Some(cli.spec_file)),
        ..Default::default()
    };

    let engine = Engine::new(config, Reporter::new(cli.verbose));
    let summary = engine.run_all(&suite, cli.test.as_deref())?;
    Ok(summary.all_passed())
}
