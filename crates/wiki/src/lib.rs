mod client;
pub mod error;
mod models;
mod source;

pub use crate::client::{ClientOptions, DEFAULT_API_URL, DEFAULT_USER_AGENT, MediaWikiClient};
pub use crate::models::SearchHit;
#[cfg(any(test, feature = "mock"))]
pub use crate::source::MockSource;
pub use crate::source::PageSource;
pub use reqwest::Url;
use std::sync::Arc;

pub type SourceHandle = Arc<dyn PageSource>;
