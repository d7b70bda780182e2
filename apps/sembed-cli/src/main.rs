use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sembed_client::EmbeddingClient;
use sembed_config::Config;

#[derive(Parser, Debug)]
#[command(name = "sembed", version)]
#[command(about = "Embed short text with a sembed server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Path to a config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Server base URL (overrides client.base_url)")]
    url: Option<String>,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Embed TEXT and print the vector")]
    Embed { text: String },

    #[command(about = "Print the effective configuration (API key redacted)")]
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        config.client.base_url = url;
    }

    match cli.command {
        Command::Embed { text } => embed(&config, &text, cli.json).await,
        Command::Config => {
            if config.api_key.is_some() {
                config.api_key = Some("<redacted>".to_string());
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

async fn embed(config: &Config, text: &str, json: bool) -> Result<()> {
    let client = EmbeddingClient::from_config(config)?;

    if json {
        let output = client.embed_output(text).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        if !output.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    match client.embed(text).await {
        Ok(vector) => {
            print_vector(&vector);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

fn print_vector(vector: &[f32]) {
    println!("Dimensions: {}", vector.len());
    let values: Vec<String> = vector.iter().map(|v| format!("{v:.6}")).collect();
    println!("[{}]", values.join(", "));
}
