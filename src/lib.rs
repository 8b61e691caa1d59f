pub mod clean;
pub mod config;
pub mod contract;
pub mod curate;
pub mod embed;
pub mod export;
pub mod images;
pub mod load_config;
pub mod mapping;
pub mod publish;
pub mod syndicate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use export::NotionExporter;
use load_config::load_config;
use publish::GraphPublisher;
use syndicate::syndicate;

#[derive(Parser)]
#[clap(
    name = "notion-syndicate",
    version,
    about = "Export a Notion workspace and syndicate publication-ready pages to a Facebook page feed"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full export-filter-clean-publish pipeline with the given config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            let notion_token = config
                .export
                .token
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Notion token missing after config load"))?;
            let page_token = config
                .publish
                .page_token
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Page token missing after config load"))?;

            let exporter = NotionExporter::new(notion_token);
            if !exporter.can_connect().await {
                anyhow::bail!("Notion rejected the session token; check NOTION_TOKEN_V2");
            }
            let publisher = GraphPublisher::new(config.publish.page_id.clone(), page_token);

            println!("Syndicate starting...");
            match syndicate(&config, &exporter, &publisher).await {
                Ok(report) => {
                    println!("Syndicate complete.\nReport:");
                    println!("{report:#?}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Syndication failed: {e}");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
