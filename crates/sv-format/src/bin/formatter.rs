//! Format a SystemVerilog file to stdout.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use sv_format::FormatOptions;
use sv_syntax::SourceManager;

#[derive(Parser)]
#[command(name = "formatter", version, about = "SystemVerilog alignment formatter")]
struct Args {
    /// File path
    file: PathBuf,

    /// Use tabs instead of spaces for indentation
    #[arg(short = 't', long = "use-tabs")]
    use_tabs: bool,

    /// Number of spaces for one level of indent
    #[arg(short = 's', long, default_value_t = 4)]
    spacing: u32,

    /// Print the syntax tree before and after formatting
    #[arg(short = 'd', long)]
    debug: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("formatter: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut sm = SourceManager::new();
    let (file, parsed) = sv_syntax::parse_file(&mut sm, &args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let unit = match parsed {
        Ok(unit) => unit,
        Err(err) => {
            let location = sm.location_of(file, err.offset);
            anyhow::bail!("parse failure at {location}: {err}");
        }
    };

    if args.debug {
        eprintln!("{}", sv_syntax::print::render_tree(&unit));
    }

    let options = FormatOptions { spacing: args.spacing, use_tabs: args.use_tabs };
    let mut work = unit.clone();
    sv_format::format_in_place(&mut work, options);

    if args.debug {
        eprintln!("POST-FORMAT AST ################");
        eprintln!("{}", sv_syntax::print::render_tree(&work));
    }

    print!("{}", work.source_text());
    Ok(())
}
