use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use gleaner_core::error::AppError;
use gleaner_core::models::Locator;
use gleaner_core::traits::{Document, DocumentProvider};

use crate::static_provider::parse_css;

/// Headless-browser document provider using Chromium via the Chrome DevTools Protocol.
///
/// Unlike [`super::StaticHtmlProvider`], pages are rendered with JavaScript
/// and stay live while fields are extracted, so bounded waits can observe
/// content that appears after the initial load. XPath and CSS locators are
/// both supported.
///
/// A single Chromium process is shared across all clones of this struct;
/// each [`DocumentProvider::open`] call opens a new tab, and
/// [`Document::close`] closes it.
///
/// # Example
///
/// ```rust,no_run
/// use gleaner_client::BrowserProvider;
/// use gleaner_core::{ExtractionConfig, FieldSchema, RecordAssembler};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = BrowserProvider::new().await?;
/// let schema = FieldSchema::from_file("schemas/doctor_profile.json".as_ref())?;
/// let record = RecordAssembler::new(ExtractionConfig::default())
///     .run(&provider, "https://example.com/doctor", &schema)
///     .await?;
/// println!("{:?}", record.get("name"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserProvider {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl BrowserProvider {
    /// Launches a headless Chromium browser with a **30 s** navigation timeout.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`).
    pub async fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30)).await
    }

    /// Launches a headless Chromium browser with a custom navigation timeout.
    pub async fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium ships a wrapper that rejects standard
        // Chrome CLI flags, so prefer the real binary when one exists.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::Generic(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Generic(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
        })
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// `CHROME_BIN` wins when it points at an existing file; otherwise the
    /// snap-internal binary and well-known system paths are tried. `None`
    /// leaves the lookup to `chromiumoxide`.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }
}

impl DocumentProvider for BrowserProvider {
    type Document = BrowserDocument;

    async fn open(&self, source: &str) -> Result<BrowserDocument, AppError> {
        let acquisition_failed = |reason: String| AppError::AcquisitionFailed {
            source_id: source.to_string(),
            reason,
        };

        let opened = tokio::time::timeout(self.timeout, async {
            let page = self
                .browser
                .new_page(source)
                .await
                .map_err(|e| acquisition_failed(format!("navigation failed: {e}")))?;

            // <body> is the minimal signal that the page has started rendering;
            // individual fields wait for their own elements.
            if let Err(e) = page.find_element("body").await {
                let _ = page.close().await;
                return Err(acquisition_failed(format!("page did not render body: {e}")));
            }

            Ok::<Page, AppError>(page)
        })
        .await;

        match opened {
            Ok(inner) => inner.map(|page| BrowserDocument { page }),
            Err(_) => Err(acquisition_failed(format!(
                "navigation timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// One open browser tab.
pub struct BrowserDocument {
    page: Page,
}

impl Document for BrowserDocument {
    async fn find(&self, locator: &Locator) -> Result<Vec<String>, AppError> {
        let elements = match locator {
            Locator::Css(q) => {
                parse_css(q)?;
                self.page.find_elements(q.as_str()).await
            }
            Locator::XPath(q) => self.page.find_xpaths(q.as_str()).await,
        }
        .map_err(|e| AppError::LookupError(format!("{locator}: {e}")))?;

        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            let text = element
                .inner_text()
                .await
                .map_err(|e| AppError::LookupError(format!("{locator}: {e}")))?;
            texts.push(text.unwrap_or_default());
        }
        Ok(texts)
    }

    async fn close(self) -> Result<(), AppError> {
        self.page
            .close()
            .await
            .map_err(|e| AppError::Generic(format!("Failed to close tab: {e}")))
    }
}
