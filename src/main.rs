//! mazewire - Command-line client for the mazewire admin API
//!
//! Provides one-shot requests, an interactive REPL, and the query-string
//! encoders used for read-style requests.

mod commands;
mod repl;
mod terminal;

use clap::{Parser, Subcommand};
use colored::Colorize;
use mazewire_client::{ActiveSite, ClientConfig, Dispatcher, HttpTransport, SessionContext};
use mazewire_wire::QueryEncoding;
use std::path::PathBuf;
use std::sync::Arc;
use terminal::{TerminalLoader, TerminalNotifier, TerminalPrompt};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mazewire")]
#[command(about = "Command-line client for the mazewire admin API")]
#[command(version)]
pub(crate) struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "MAZEWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// API base URL (e.g. https://example.com/api/)
    #[arg(short = 'u', long)]
    api_url: Option<String>,

    /// Site id to act on (0 = the site served by the API host)
    #[arg(short, long)]
    site: Option<i64>,

    /// Encoding of GET payloads in the query string
    #[arg(short, long)]
    encoding: Option<QueryEncoding>,

    /// Path to CA certificate for server verification
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Skip server certificate verification (INSECURE)
    #[arg(long, short = 'k')]
    insecure: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start interactive REPL
    Repl,

    /// Send a GET request; the payload travels in the query string
    Get {
        /// Endpoint relative to the API base URL
        endpoint: String,

        /// Payload JSON (or @file.json to read from file)
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Send a POST request
    Post {
        endpoint: String,
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Send a PUT request
    Put {
        endpoint: String,
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Send a PATCH request
    Patch {
        endpoint: String,
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Send a DELETE request
    Delete {
        endpoint: String,
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Log in and verify the credentials
    Login {
        /// Username or email (prompted for if omitted)
        #[arg(short = 'U', long)]
        user: Option<String>,
    },

    /// Encode text (or @file) the way GET payloads are encoded
    Encode {
        /// hex or base32
        encoding: QueryEncoding,

        /// Input text, or @file to read raw bytes from a file
        input: String,

        /// Treat the input as a JSON payload and encode its MessagePack form
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Encoding needs neither config nor server
    if let Some(Commands::Encode {
        encoding,
        input,
        json,
    }) = &cli.command
    {
        match commands::encode(*encoding, input, *json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    if let Some(Commands::Config) = &cli.command {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let transport = HttpTransport::new(&config).map_err(|e| {
        eprintln!("{}: {}", "Transport setup failed".red(), e);
        e
    })?;

    let session = Arc::new(SessionContext::with_site(
        ActiveSite::default().with_id(config.site.id),
    ));
    let dispatcher = Dispatcher::new(&config.api, Arc::new(transport))
        .with_session(session)
        .with_notifier(Arc::new(TerminalNotifier))
        .with_loader(Arc::new(TerminalLoader::new()))
        .with_prompt(Arc::new(TerminalPrompt));

    tracing::info!(base_url = %config.api.base_url, site = config.site.id, "client ready");

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(&dispatcher, &config).await?;
        }
        Some(Commands::Encode { .. }) | Some(Commands::Config) => unreachable!(), // Already handled above
        Some(cmd) => match commands::execute(&dispatcher, cmd).await {
            Ok(output) => println!("{}", output),
            Err(e) => {
                commands::report(e.as_ref());
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Loads config from file and environment, then applies command-line flags.
fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::load_from(cli.config.as_deref())?;
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    if let Some(ref url) = cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(site) = cli.site {
        config.site.id = site;
    }
    if let Some(encoding) = cli.encoding {
        config.api.query_encoding = encoding;
    }
    if let Some(ref path) = cli.ca_cert {
        config.tls.ca_cert_path = Some(path.clone());
    }
    if cli.insecure {
        config.tls.insecure = true;
    }

    config.validate()?;
    Ok(config)
}
