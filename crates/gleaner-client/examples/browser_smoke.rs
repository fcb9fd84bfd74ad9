/// Smoke-test for `BrowserProvider`.
///
/// Launches a headless Chromium, opens <https://example.com>, and extracts
/// its heading and paragraphs through the record assembler.
///
/// Run with:
///   cargo run --example browser_smoke --features browser
use std::time::Duration;

use gleaner_client::BrowserProvider;
use gleaner_core::{ExtractionConfig, FieldSchema, FieldSpec, FieldValue, Locator, RecordAssembler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("Launching headless browser…");
    let provider = BrowserProvider::new().await?;

    let schema = FieldSchema::new(
        "example",
        vec![
            FieldSpec::one("heading", Locator::xpath("//h1")),
            FieldSpec::many("paragraphs", Locator::css("p")).immediate(),
            FieldSpec::one("missing", Locator::css("#does-not-exist")),
        ],
    )?;

    let url = "https://example.com";
    println!("Extracting from {url} …");
    let record = RecordAssembler::new(ExtractionConfig::new(Duration::from_secs(5)))
        .run(&provider, url, &schema)
        .await?;

    // Basic sanity checks
    assert_eq!(
        record.get("heading"),
        Some(&FieldValue::from("Example Domain")),
        "Expected <h1> not extracted"
    );
    assert!(
        record
            .get("paragraphs")
            .and_then(FieldValue::as_list)
            .is_some_and(|p| !p.is_empty()),
        "Expected at least one paragraph"
    );
    assert_eq!(record.defaulted(), vec!["missing"]);

    println!("OK — {} fields, {} defaulted", record.len(), record.defaulted().len());
    Ok(())
}
