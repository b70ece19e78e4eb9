//! Build a cross-reference index for a set of SystemVerilog files and
//! emit it as JSON.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sv_syntax::SourceManager;

#[derive(Parser)]
#[command(name = "indexer", version, about = "Index SystemVerilog files and dump the result as JSON")]
struct Args {
    /// Output file; stdout when omitted
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Informational logging
    #[arg(long)]
    verbose: bool,

    /// Trace-level logging
    #[arg(long)]
    trace: bool,

    /// Dump the CST of one file instead of indexing
    #[arg(long)]
    cst: Option<PathBuf>,

    /// Files to index
    files: Vec<PathBuf>,
}

/// Parse or compile failures exit with this code; option errors exit 2
/// through the argument parser.
const COMPILE_FAILURE: u8 = 3;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.trace {
        "trace"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("indexer: {err:#}");
            ExitCode::from(COMPILE_FAILURE)
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut sm = SourceManager::new();

    if let Some(path) = &args.cst {
        let (file, parsed) = sv_syntax::parse_file(&mut sm, path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let unit = match parsed {
            Ok(unit) => unit,
            Err(err) => {
                let location = sm.location_of(file, err.offset);
                anyhow::bail!("parse failure at {location}: {err}");
            }
        };
        println!("{}", sv_syntax::print::render_tree(&unit));
        return Ok(());
    }

    if args.files.is_empty() {
        anyhow::bail!("no input files");
    }

    let mut files = Vec::new();
    for path in &args.files {
        let (file, parsed) = sv_syntax::parse_file(&mut sm, path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        match parsed {
            Ok(unit) => files.push((file, unit)),
            Err(err) => {
                let location = sm.location_of(file, err.offset);
                anyhow::bail!("parse failure at {location}: {err}");
            }
        }
    }

    let design = sv_elab::elaborate(&sm, &files, None)?;
    let output = sv_index::index_design(&sm, &design, &files)?;

    for (path, file) in output.core.files() {
        if file.unresolved_count() > 0 {
            tracing::info!(
                file = %path.display(),
                unresolved = file.unresolved_count(),
                "unresolved references"
            );
        }
    }

    let dump = sv_index::dump(&output.core);
    let rendered = serde_json::to_string_pretty(&dump)?;
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
