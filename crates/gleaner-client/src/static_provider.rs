use std::time::Duration;

use gleaner_core::error::AppError;
use gleaner_core::models::Locator;
use gleaner_core::traits::{Document, DocumentProvider};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Document provider for pages that need no JavaScript.
///
/// Downloads raw HTML with reqwest (or reads it from a `file://` URL) and
/// answers CSS locators with `scraper`. XPath locators need a rendering
/// provider and are rejected as invalid locators here.
#[derive(Clone)]
pub struct StaticHtmlProvider {
    client: Client,
    timeout: Duration,
}

impl StaticHtmlProvider {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("Gleaner/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    async fn fetch(&self, url: &Url) -> Result<String, String> {
        let response = self.client.get(url.as_str()).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("request timed out after {:?}", self.timeout)
            } else if e.is_connect() {
                format!("connection failed: {e}")
            } else {
                e.to_string()
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {e}"))
    }
}

impl DocumentProvider for StaticHtmlProvider {
    type Document = StaticDocument;

    async fn open(&self, source: &str) -> Result<StaticDocument, AppError> {
        let acquisition_failed = |reason: String| AppError::AcquisitionFailed {
            source_id: source.to_string(),
            reason,
        };

        let url = Url::parse(source).map_err(|e| acquisition_failed(format!("invalid URL: {e}")))?;
        let html = match url.scheme() {
            "http" | "https" => self.fetch(&url).await.map_err(acquisition_failed)?,
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| acquisition_failed("not a local file path".into()))?;
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| acquisition_failed(format!("{}: {e}", path.display())))?
            }
            scheme => {
                return Err(acquisition_failed(format!(
                    "URL scheme '{scheme}' is not supported (only http/https/file)"
                )));
            }
        };

        tracing::info!("Loaded {} bytes of HTML", html.len());
        Ok(StaticDocument { html })
    }
}

/// A downloaded HTML page.
pub struct StaticDocument {
    html: String,
}

impl StaticDocument {
    pub fn from_html(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl Document for StaticDocument {
    async fn find(&self, locator: &Locator) -> Result<Vec<String>, AppError> {
        select(&self.html, locator)
    }

    async fn close(self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Text of every element in `html` matching a CSS `locator`.
fn select(html: &str, locator: &Locator) -> Result<Vec<String>, AppError> {
    let query = match locator {
        Locator::Css(q) => q,
        Locator::XPath(q) => {
            return Err(AppError::InvalidLocator(format!(
                "XPath locator {q:?} needs a rendering provider (use --browser)"
            )));
        }
    };
    let selector = parse_css(query)?;

    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect())
}

pub(crate) fn parse_css(query: &str) -> Result<Selector, AppError> {
    Selector::parse(query)
        .map_err(|e| AppError::InvalidLocator(format!("CSS selector {query:?}: {e}")))
}
