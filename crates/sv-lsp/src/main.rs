//! diplomat LSP server binary: stdio by default, TCP on request.

use clap::Parser;
use std::io::BufReader;
use std::net::TcpListener;
use sv_lsp::{DiplomatLsp, RpcTransport};

#[derive(Parser)]
#[command(name = "lsp-server", version, about = "SystemVerilog language server")]
struct Args {
    /// Listen on a TCP socket instead of stdio
    #[arg(long)]
    tcp: bool,

    /// Port for TCP mode
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Informational logging to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.tcp {
        let listener = TcpListener::bind(("127.0.0.1", args.port))?;
        tracing::info!(port = args.port, "waiting for a client connection");
        let (stream, peer) = listener.accept()?;
        tracing::info!(%peer, "client connected");
        let reader = BufReader::new(stream.try_clone()?);
        let transport = RpcTransport::new(reader, stream);
        DiplomatLsp::new(transport).run();
    } else {
        let transport = RpcTransport::new(BufReader::new(std::io::stdin()), std::io::stdout());
        DiplomatLsp::new(transport).run();
    }
    Ok(())
}
