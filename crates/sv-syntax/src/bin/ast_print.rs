//! Dump the CST of a SystemVerilog file.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sv_syntax::SourceManager;

#[derive(Parser)]
#[command(name = "ast-print", version, about = "Dump the syntax tree of a SystemVerilog file")]
struct Args {
    /// File path
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut sm = SourceManager::new();
    let (file, parsed) = sv_syntax::parse_file(&mut sm, &args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    match parsed {
        Ok(unit) => {
            print!("{}", sv_syntax::print::render_tree(&unit));
            Ok(())
        }
        Err(err) => {
            let location = sm.location_of(file, err.offset);
            anyhow::bail!("parse failure at {location}: {err}");
        }
    }
}
