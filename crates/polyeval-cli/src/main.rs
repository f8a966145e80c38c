//! # Polyeval CLI Entry Point
//!
//! Starts the evaluation server.
//!
//! ## Usage
//!
//! ```bash
//! # Serve on localhost:8080
//! polyeval 127.0.0.1 8080
//!
//! # Custom interpreters and a smaller body cap
//! polyeval 0.0.0.0 9000 --r-command /opt/R/bin/Rscript --max-body-bytes 65536
//! ```
//!
//! ## Requests
//!
//! ```bash
//! curl http://127.0.0.1:8080/ping
//! curl -F mimetype=application/javascript -F code='1+1' -F echo=TRUE http://127.0.0.1:8080/
//! curl http://127.0.0.1:8080/stop
//! ```

use anyhow::{Context, Result};
use argh::FromArgs;
use std::net::{SocketAddr, ToSocketAddrs};

use polyeval_server::{Dispatcher, GuestCommands, HttpServer, ServerLimits};

#[derive(FromArgs)]
/// evaluate JavaScript, R and Ruby over HTTP
struct Cli {
    /// host name or address to bind
    #[argh(positional)]
    host: String,

    /// port to bind
    #[argh(positional)]
    port: u16,

    /// largest accepted request body in bytes
    ///
    /// Larger bodies are answered with 413 and the connection is closed.
    #[argh(option, long = "max-body-bytes", default = "polyeval_server::limits::DEFAULT_MAX_BODY_BYTES")]
    max_body_bytes: usize,

    /// command used to run the R guest (default: Rscript)
    #[argh(option, long = "r-command", default = "GuestCommands::default().r_command")]
    r_command: String,

    /// command used to run the Ruby guest (default: ruby)
    #[argh(option, long = "ruby-command", default = "GuestCommands::default().ruby_command")]
    ruby_command: String,
}

/// Resolves `host` and `port` to the first matching socket address.
fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for {}:{}", host, port))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let addr = resolve(&cli.host, cli.port)?;

    let limits = ServerLimits::new().with_max_body_bytes(cli.max_body_bytes);
    limits.validate()?;

    let commands = GuestCommands {
        r_command: cli.r_command,
        ruby_command: cli.ruby_command,
    };
    tracing::info!("R guest: {}, Ruby guest: {}", commands.r_command, commands.ruby_command);

    let dispatcher = Dispatcher::with_default_adapters(&commands)?;
    tracing::info!("Serving content-kinds: {}", dispatcher.content_kinds().join(", "));

    let server = HttpServer::new(dispatcher).with_limits(limits);

    // A listener that cannot be bound is reported, not fatal.
    if let Err(e) = server.run(addr).await {
        tracing::error!("Server error: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ip() {
        let addr = resolve("127.0.0.1", 8080).unwrap();
        assert_eq!(addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_resolve_localhost() {
        let addr = resolve("localhost", 9000).unwrap();
        assert_eq!(addr.port(), 9000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_resolve_invalid_host() {
        assert!(resolve("not a host name", 80).is_err());
    }

    #[test]
    fn test_cli_parses_positionals_and_defaults() {
        let cli = Cli::from_args(&["polyeval"], &["0.0.0.0", "8080"]).unwrap();
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.max_body_bytes, 1_000_000);
        assert_eq!(cli.r_command, "Rscript");
        assert_eq!(cli.ruby_command, "ruby");
    }

    #[test]
    fn test_cli_rejects_non_numeric_port() {
        assert!(Cli::from_args(&["polyeval"], &["0.0.0.0", "http"]).is_err());
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::from_args(
            &["polyeval"],
            &["localhost", "1", "--max-body-bytes", "10", "--ruby-command", "/usr/bin/ruby3"],
        )
        .unwrap();
        assert_eq!(cli.max_body_bytes, 10);
        assert_eq!(cli.ruby_command, "/usr/bin/ruby3");
    }
}
