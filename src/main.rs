// booksum command line
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use booksum::pdf_extraction::PdfExtractor;
use booksum::report::{render_json, render_outline, render_text};
use booksum::storage::DigestStore;
use booksum::{Config, Pipeline, ProcessOptions, TextAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "booksum", author, version)]
#[command(about = "Summarize textbook PDFs chapter by chapter and topic by topic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the extracted text of a PDF
    Extract {
        pdf: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show detected chapters and topics
    Outline {
        pdf: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Summarize chapters and topics and collect examples
    Summarize {
        pdf: PathBuf,
        /// Only this chapter (1-based)
        #[arg(long)]
        chapter: Option<usize>,
        /// Process at most this many topics per chapter
        #[arg(long)]
        max_topics: Option<usize>,
        /// Examples per topic (default from config)
        #[arg(long)]
        examples: Option<usize>,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Store the digest in the history database
        #[arg(long)]
        save: bool,
    },
    /// List stored digests
    History,
    /// Print a stored digest
    Show {
        id: i64,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Extract { pdf, format } => {
            let document = PdfExtractor::extract_file(&pdf)
                .with_context(|| format!("Failed to extract {}", pdf.display()))?;
            match format {
                Format::Text => println!("{}", document.full_text()),
                Format::Json => println!("{}", render_json(&document)?),
            }
        }
        Commands::Outline { pdf, format } => {
            let document = PdfExtractor::extract_file(&pdf)
                .with_context(|| format!("Failed to extract {}", pdf.display()))?;
            let structure = TextAnalyzer::new().analyze(&document);
            match format {
                Format::Text => print!("{}", render_outline(&structure)),
                Format::Json => println!("{}", render_json(&structure)?),
            }
        }
        Commands::Summarize { pdf, chapter, max_topics, examples, format, save } => {
            let options = ProcessOptions {
                chapter,
                max_topics_per_chapter: max_topics,
                num_examples: examples.unwrap_or(config.examples.per_topic),
            };
            let mut pipeline = Pipeline::from_config(&config);
            let (summary_model, generator) = pipeline.model_names();
            info!("Summarizer: {}, example generator: {}", summary_model, generator);

            let digest = pipeline.process(&pdf, &options).await?;

            if save {
                let store = DigestStore::open(&config.storage.database)?;
                let file_size = std::fs::metadata(&pdf).map(|m| m.len()).unwrap_or(0);
                let id = store.save_digest(&digest, file_size)?;
                info!("Saved digest {} to {}", id, config.storage.database.display());
            }

            match format {
                Format::Text => print!("{}", render_text(&digest)),
                Format::Json => println!("{}", render_json(&digest)?),
            }
        }
        Commands::History => {
            let store = DigestStore::open(&config.storage.database)?;
            let digests = store.list_digests()?;
            if digests.is_empty() {
                println!("No stored digests");
                return Ok(());
            }
            for entry in digests {
                println!(
                    "{:>5}  {}  {}  {} chapters, {} topics  {}",
                    entry.id,
                    entry.created_at,
                    entry.title.as_deref().unwrap_or(&entry.filename),
                    entry.chapter_count,
                    entry.topic_count,
                    entry.path
                );
            }
            let stats = store.stats()?;
            println!(
                "{} digests of {} documents, {} topics",
                stats.digest_count, stats.document_count, stats.topic_count
            );
        }
        Commands::Show { id, format } => {
            let store = DigestStore::open(&config.storage.database)?;
            let digest = store.load_digest(id)?;
            match format {
                Format::Text => print!("{}", render_text(&digest)),
                Format::Json => println!("{}", render_json(&digest)?),
            }
        }
    }

    Ok(())
}
