pub mod static_provider;

#[cfg(feature = "browser")]
pub mod browser_provider;

pub use static_provider::{StaticDocument, StaticHtmlProvider};

#[cfg(feature = "browser")]
pub use browser_provider::{BrowserDocument, BrowserProvider};
