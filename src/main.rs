use clap::{Parser, Subcommand};
use console::style;
use docs_rag::Result;
use docs_rag::config::{Config, run_interactive_config, show_config};
use docs_rag::ingest::run_ingestion;
use docs_rag::server::run_server;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Question answering over local PDF documents with Ollama")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Load, chunk and embed every PDF in the documents directory
    Ingest,
    /// Start the HTTP query service
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest => {
            let config = Config::load()?;
            let stats = run_ingestion(&config).await?;
            if stats.files == 0 {
                eprintln!(
                    "{} No PDF documents found in {}",
                    style("⚠").yellow(),
                    config.documents_path().display()
                );
            } else {
                eprintln!(
                    "{} Ingested {} files, {} pages, {} chunks",
                    style("✓").green(),
                    stats.files,
                    stats.pages,
                    stats.chunks
                );
            }
        }
        Commands::Serve => {
            run_server(&Config::load()?).await?;
        }
    }

    Ok(())
}
