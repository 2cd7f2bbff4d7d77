use async_trait::async_trait;

use crate::error::Result;
use crate::models::SearchHit;

/// Somewhere to find and read wiki pages.
///
/// The scraper only ever needs two things from a wiki: the titles matching a
/// search, and the raw wikitext of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Every page title matching `prefix`, following continuation until the
    /// wiki has nothing more to give.
    async fn search(&self, prefix: &str) -> Result<Vec<SearchHit>>;

    /// The raw wikitext of the latest revision of `title`.
    async fn fetch(&self, title: &str) -> Result<String>;
}

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockSource;

#[cfg(any(test, feature = "mock"))]
mod mock {
    //! In-memory page source for testing.

    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::PageSource;
    use crate::error::{ErrorKind, Result};
    use crate::models::SearchHit;

    /// In-memory page source for testing.
    ///
    /// Search matches titles by substring, the same loose way a wiki's
    /// full-text search would for the prefixes the scraper uses. Every
    /// fetched title is recorded so tests can assert which pages were read.
    #[derive(Debug, Default)]
    pub struct MockSource {
        pages: BTreeMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl MockSource {
        /// Create a mock source pre-populated with `(title, wikitext)` pages.
        pub fn with_pages(pages: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
            Self {
                pages: pages.into_iter().map(|(title, text)| (title.into(), text.into())).collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        /// Titles passed to [`fetch`](PageSource::fetch) so far, in call order.
        pub async fn fetched(&self) -> Vec<String> {
            self.fetched.lock().await.clone()
        }
    }

    #[async_trait]
    impl PageSource for MockSource {
        async fn search(&self, prefix: &str) -> Result<Vec<SearchHit>> {
            Ok(self.pages.keys().filter(|title| title.contains(prefix)).map(SearchHit::new).collect())
        }

        async fn fetch(&self, title: &str) -> Result<String> {
            self.fetched.lock().await.push(title.to_string());
            match self.pages.get(title) {
                Some(text) => Ok(text.clone()),
                None => exn::bail!(ErrorKind::PageNotFound(title.to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_source() {
            let source = MockSource::with_pages([
                ("Beta Firmware/iPhone/14.x", "{| |}"),
                ("Beta Firmware/iPad/14.x", "{| |}"),
                ("Firmware/iPhone/14.x", "{| |}"),
            ]);
            let hits = source.search("Beta Firmware/").await.unwrap();
            assert_eq!(hits.len(), 2);

            assert_eq!(source.fetch("Beta Firmware/iPad/14.x").await.unwrap(), "{| |}");
            let err = source.fetch("Beta Firmware/iPod touch/9.x").await.unwrap_err();
            assert!(matches!(&*err, ErrorKind::PageNotFound(_)));
            assert_eq!(source.fetched().await, vec!["Beta Firmware/iPad/14.x", "Beta Firmware/iPod touch/9.x"]);
        }
    }
}
