use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod analysis;
mod api;
mod commands;
mod config;
mod ingest;
mod llm;
mod storage;
#[cfg(test)]
mod test_support;

use config::Config;

#[derive(Parser)]
#[command(name = "doc-insights")]
#[command(about = "Upload PDFs, get an AI summary or a keyword analysis, browse the history")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default)
    Serve {
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// List analyzed documents, newest first
    History {
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Analyze a local PDF and store the result
    Analyze {
        /// Path to the PDF
        path: PathBuf,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Default)]
struct ServerArgs {
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,
}

#[derive(Args, Default)]
struct StorageArgs {
    /// Directory holding the database and uploaded files
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl ServerArgs {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
    }
}

impl StorageArgs {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,doc_insights=info")),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    init_tracing();
    let mut config = Config::load()?;

    match cli.command {
        Some(Commands::Serve { server, storage }) => {
            server.apply(&mut config);
            storage.apply(&mut config);
            commands::serve::run(&config).await?;
        }
        None => {
            commands::serve::run(&config).await?;
        }
        Some(Commands::History { storage }) => {
            storage.apply(&mut config);
            commands::history::list(&config).await?;
        }
        Some(Commands::Analyze { path, storage }) => {
            storage.apply(&mut config);
            commands::analyze::run(&config, &path).await?;
        }
        Some(Commands::Config { save }) => {
            commands::config::show(&config, save)?;
        }
        Some(Commands::Completions { .. }) => unreachable!("handled above"),
    }

    Ok(())
}
