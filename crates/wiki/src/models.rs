//! Response bodies of the MediaWiki action API (`formatversion=2`).

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};

/// One page title returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct SearchHit {
    pub title: String,
}
impl SearchHit {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub query: SearchQuery,
    #[serde(rename = "continue")]
    pub continuation: Option<SearchContinue>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchContinue {
    pub sroffset: u64,
    #[serde(rename = "continue", default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageResponse {
    #[serde(default)]
    pub query: PageQuery,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Revision {
    pub slots: Option<Slots>,
    /// Older wikis without multi-content revisions put the text here.
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Slots {
    pub main: Slot,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Slot {
    pub content: Option<String>,
}

impl PageResponse {
    /// The latest revision's wikitext, or [`PageNotFound`](ErrorKind::PageNotFound).
    pub fn into_content(self, title: &str) -> Result<String> {
        let page = self
            .query
            .pages
            .into_iter()
            .next()
            .filter(|page| !page.missing && !page.invalid)
            .ok_or_raise(|| ErrorKind::PageNotFound(title.to_string()))?;
        page.revisions
            .into_iter()
            .next()
            .and_then(|revision| revision.slots.and_then(|slots| slots.main.content).or(revision.content))
            .ok_or_raise(|| ErrorKind::PageNotFound(title.to_string()))
    }
}

/// Decodes a response body, turning an `error` payload into [`ErrorKind::Api`].
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value =
        serde_json::from_str(body).or_raise(|| ErrorKind::InvalidResponse("body is not JSON".to_string()))?;
    if let Some(error) = value.get("error") {
        let error: ApiError = serde_json::from_value(error.clone())
            .or_raise(|| ErrorKind::InvalidResponse("malformed error payload".to_string()))?;
        exn::bail!(ErrorKind::Api { code: error.code, info: error.info });
    }
    serde_json::from_value(value)
        .or_raise(|| ErrorKind::InvalidResponse(format!("unexpected {} body", std::any::type_name::<T>())))
}
