use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gleaner_client::StaticHtmlProvider;
use gleaner_core::models::{Cardinality, WaitPolicy};
use gleaner_core::traits::DocumentProvider;
use gleaner_core::{ExtractionConfig, ExtractionService, FieldSchema, JsonFileSink};

#[derive(Parser)]
#[command(name = "gleaner", version, about = "Assemble a record of fields from one web page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a record from a web page and save it as JSON
    Scrape {
        /// Page to extract from (http, https, or file URL)
        #[arg(short, long)]
        url: String,

        /// Path to the field schema
        #[arg(short, long, default_value = "schemas/doctor_profile.json")]
        schema: PathBuf,

        /// Where to write the record
        #[arg(short, long, default_value = "doctor_details.json")]
        output: PathBuf,

        /// Seconds to wait for a bounded-wait field before using its default
        #[arg(long, env = "GLEANER_WAIT_TIMEOUT", default_value_t = 20)]
        wait_timeout: u64,

        /// Milliseconds between lookups while waiting for a field
        #[arg(long, env = "GLEANER_POLL_INTERVAL_MS", default_value_t = 500)]
        poll_interval_ms: u64,

        /// Render the page in headless Chromium (requires the `browser` feature)
        #[arg(long, default_value_t = false)]
        browser: bool,

        /// Don't print the record to stdout
        #[arg(long, default_value_t = false)]
        no_echo: bool,
    },

    /// Validate a field schema and list its fields
    Schema {
        /// Path to the field schema
        #[arg(short, long, default_value = "schemas/doctor_profile.json")]
        schema: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gleaner=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            url,
            schema,
            output,
            wait_timeout,
            poll_interval_ms,
            browser,
            no_echo,
        } => {
            let schema = load_schema(&schema)?;
            let config = ExtractionConfig::new(Duration::from_secs(wait_timeout))
                .with_poll_interval(Duration::from_millis(poll_interval_ms));
            let mut sink = JsonFileSink::new(output);
            if no_echo {
                sink = sink.quiet();
            }

            if browser {
                cmd_scrape_browser(&url, &schema, sink, config).await?;
            } else {
                ensure_static_locators(&schema)?;
                let provider = StaticHtmlProvider::new().context("Failed to create HTTP client")?;
                cmd_scrape(provider, &url, &schema, sink, config).await?;
            }
        }
        Commands::Schema { schema } => {
            let schema = load_schema(&schema)?;
            cmd_schema(&schema);
        }
    }

    Ok(())
}

fn load_schema(path: &Path) -> Result<FieldSchema> {
    FieldSchema::from_file(path)
        .with_context(|| format!("Failed to load schema: {}", path.display()))
}

/// The static provider only answers CSS; reject XPath fields before fetching.
fn ensure_static_locators(schema: &FieldSchema) -> Result<()> {
    let xpath_fields = schema.xpath_fields();
    if !xpath_fields.is_empty() {
        anyhow::bail!(
            "Schema {} uses XPath locators ({}); rerun with --browser",
            schema.name,
            xpath_fields.join(", ")
        );
    }
    Ok(())
}

#[cfg(feature = "browser")]
async fn cmd_scrape_browser(
    url: &str,
    schema: &FieldSchema,
    sink: JsonFileSink,
    config: ExtractionConfig,
) -> Result<()> {
    let provider = gleaner_client::BrowserProvider::new()
        .await
        .context("Failed to launch headless browser")?;
    cmd_scrape(provider, url, schema, sink, config).await
}

#[cfg(not(feature = "browser"))]
async fn cmd_scrape_browser(
    _url: &str,
    _schema: &FieldSchema,
    _sink: JsonFileSink,
    _config: ExtractionConfig,
) -> Result<()> {
    anyhow::bail!("--browser needs a build with `--features browser`")
}

async fn cmd_scrape<P: DocumentProvider>(
    provider: P,
    url: &str,
    schema: &FieldSchema,
    sink: JsonFileSink,
    config: ExtractionConfig,
) -> Result<()> {
    let output = sink.path().to_path_buf();
    let service = ExtractionService::with_sink(provider, sink, config);

    let report = service
        .run(url, schema)
        .await
        .with_context(|| format!("Extraction from {url} failed"))?;

    if report.defaulted.is_empty() {
        tracing::info!(
            "All {} fields extracted; saved to {}",
            report.record.len(),
            output.display()
        );
    } else {
        tracing::warn!(
            "{}/{} fields defaulted ({}); saved to {}",
            report.defaulted.len(),
            report.record.len(),
            report.defaulted.join(", "),
            output.display()
        );
    }

    Ok(())
}

fn cmd_schema(schema: &FieldSchema) {
    println!("Schema {} ({} fields):\n", schema.name, schema.len());

    for field in schema.fields() {
        let cardinality = match field.cardinality {
            Cardinality::One => "one",
            Cardinality::Many => "many",
        };
        let wait = match field.wait {
            WaitPolicy::Bounded => "bounded",
            WaitPolicy::None => "none",
        };
        let default = serde_json::to_string(&field.default).unwrap_or_default();
        let postprocess = field
            .postprocess
            .as_ref()
            .map(|p| format!(" postprocess={p:?}"))
            .unwrap_or_default();

        println!(
            "  {:<20} {:<5} wait={:<8} default={}{}",
            field.name, cardinality, wait, default, postprocess
        );
        println!("    locator: {}", field.locator);
    }
}
