//! Paginated collection fetching.
//!
//! Walks a collection that the backend may return bare or as a chain of
//! `results`/`next` pages, sequentially and in arrival order. A walk always
//! terminates: on a falsy `next`, on the first failed page, on a link that was
//! already visited, or at the page cap.

use crate::error::FetchError;
use crate::types::{Envelope, Notice, Shape};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, warn};

/// Something pages can be requested from.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Rewrite a `next` link into a path `fetch_page` accepts.
    fn normalize_link(&self, link: &str) -> String;

    /// Fetch one page and decode it as JSON.
    async fn fetch_page(&self, path: &str) -> Result<Value, FetchError>;
}

/// Why a pagination walk stopped before the chain ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// Page `page` (1-based) was rejected as unauthorized.
    Unauthorized { page: usize, status: u16 },
    /// Page `page` (1-based) failed for another reason.
    Failed { page: usize, error: FetchError },
    /// A `next` link pointed back at an already visited page.
    Cycle { page: usize, link: String },
    /// The walk reached the configured page cap.
    PageLimit { limit: usize },
    /// Page `page` (2 or later) was not a collection, so the chain broke off.
    Unrecognized { page: usize },
}

/// Result of a pagination walk: everything accumulated plus how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    pub items: Vec<T>,
    /// Pages fetched successfully.
    pub pages: usize,
    /// Items dropped because they did not decode.
    pub skipped: usize,
    /// Shape of the first page, if any page arrived.
    pub shape: Option<Shape>,
    pub halt: Option<Halt>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pages: 0,
            skipped: 0,
            shape: None,
            halt: None,
        }
    }
}

impl<T> Collection<T> {
    /// Whether the walk followed the chain to its end.
    pub fn is_complete(&self) -> bool {
        self.halt.is_none()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One-line message describing an incomplete walk over `what`.
    pub fn notice(&self, what: &str) -> Option<Notice> {
        let loaded = self.items.len();
        match &self.halt {
            Some(Halt::Unauthorized { .. }) => Some(Notice::error(format!(
                "Not authorized to load {}; showing {} loaded so far",
                what, loaded
            ))),
            Some(Halt::Failed { error, .. }) => Some(Notice::error(format!(
                "Failed to load {}: {}",
                what, error
            ))),
            Some(Halt::Cycle { .. }) | Some(Halt::PageLimit { .. }) => Some(Notice::warning(
                format!("Stopped loading {} after {} pages", what, self.pages),
            )),
            Some(Halt::Unrecognized { page }) => Some(Notice::warning(format!(
                "Unexpected response on page {} of {}; showing {} loaded so far",
                page, what, loaded
            ))),
            None if self.shape == Some(Shape::Unrecognized) => Some(Notice::warning(format!(
                "Unexpected response while loading {}",
                what
            ))),
            None => None,
        }
    }
}

/// Walks paginated collections from a [`PageSource`].
pub struct Paginator<'a, S: ?Sized> {
    source: &'a S,
    max_pages: usize,
}

impl<'a, S: PageSource + ?Sized> Paginator<'a, S> {
    pub fn new(source: &'a S, max_pages: usize) -> Self {
        Self {
            source,
            max_pages: max_pages.max(1),
        }
    }

    /// Fetch every page of the collection at `path`.
    pub async fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Collection<T> {
        let mut collection = Collection::default();
        let mut visited = HashSet::new();
        let mut next = Some(path.to_string());

        while let Some(current) = next.take() {
            let page = collection.pages + 1;

            if collection.pages >= self.max_pages {
                warn!("Pagination of {} stopped at page limit {}", path, self.max_pages);
                collection.halt = Some(Halt::PageLimit {
                    limit: self.max_pages,
                });
                break;
            }

            if !visited.insert(current.clone()) {
                warn!("Pagination of {} revisited {}; stopping", path, current);
                collection.halt = Some(Halt::Cycle {
                    page,
                    link: current,
                });
                break;
            }

            let value = match self.source.fetch_page(&current).await {
                Ok(value) => value,
                Err(e) if e.is_auth() => {
                    warn!("Page {} of {} unauthorized; keeping {} items", page, path, collection.items.len());
                    let status = match e {
                        FetchError::Unauthorized(status) => status,
                        _ => 401,
                    };
                    collection.halt = Some(Halt::Unauthorized { page, status });
                    break;
                }
                Err(e) => {
                    error!("Page {} of {} failed: {}", page, path, e);
                    collection.halt = Some(Halt::Failed { page, error: e });
                    break;
                }
            };

            collection.pages += 1;
            let envelope = Envelope::from_value(value);
            let shape = envelope.shape();
            collection.shape.get_or_insert(shape);
            if shape == Shape::Unrecognized {
                warn!("Unrecognized response shape for {} (page {})", path, page);
                // A bad first page is an empty collection; a bad later page
                // cuts the chain short.
                if page > 1 {
                    collection.halt = Some(Halt::Unrecognized { page });
                    break;
                }
            }

            let (raw, link) = envelope.into_parts();
            debug!("Page {} of {}: {} items, next={:?}", page, path, raw.len(), link);

            for item in raw {
                match serde_json::from_value::<T>(item) {
                    Ok(decoded) => collection.items.push(decoded),
                    Err(e) => {
                        collection.skipped += 1;
                        warn!("Skipping malformed item from {}: {}", path, e);
                    }
                }
            }

            next = link.map(|l| self.source.normalize_link(&l));
        }

        collection
    }
}
