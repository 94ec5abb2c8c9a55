use crate::fetch::{DelayRange, Fetcher};
use crate::page::fetch::submit_pages;
use crate::page::{Bucket, SubmitContext};
use crate::Result;
use std::sync::Arc;

/// Maps a base URL and page index to that page's URL
///
/// `None` or an empty string means there are no more pages.
pub type UrlFn = Arc<dyn Fn(&str, usize) -> Option<String> + Send + Sync>;

/// Builds a [`UrlFn`] from a template with `{base}` and `{index}` placeholders
///
/// Indices are offset by `start_index`; `max_pages` bounds how many URLs the
/// template produces.
pub fn url_template(template: impl Into<String>, start_index: usize, max_pages: usize) -> UrlFn {
    let template = template.into();
    Arc::new(move |base: &str, idx: usize| {
        if idx >= max_pages {
            return None;
        }
        Some(
            template
                .replace("{base}", base)
                .replace("{index}", &(start_index + idx).to_string()),
        )
    })
}

/// Fetch node discovering its URLs one page index at a time
pub struct PaginatedFetchNode {
    base_url: String,
    url_fn: UrlFn,
    max_pages: Option<usize>,
    fetcher: Option<Arc<dyn Fetcher>>,
    delay: DelayRange,
}

impl PaginatedFetchNode {
    pub fn new<F>(base_url: impl Into<String>, url_fn: F) -> Self
    where
        F: Fn(&str, usize) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_url_fn(base_url, Arc::new(url_fn))
    }

    pub fn with_url_fn(base_url: impl Into<String>, url_fn: UrlFn) -> Self {
        Self {
            base_url: base_url.into(),
            url_fn,
            max_pages: None,
            fetcher: None,
            delay: DelayRange::default(),
        }
    }

    /// Stops discovery after `max_pages` URLs even if `url_fn` keeps going
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_delay(mut self, delay: DelayRange) -> Self {
        self.delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    /// Calls `url_fn` from index 0 until it reports exhaustion
    ///
    /// Each URL becomes its own single-item page-bucket. Without a
    /// `max_pages` ceiling this only ends when `url_fn` does.
    pub fn discover_urls(&self) -> Vec<Vec<String>> {
        let mut pages = Vec::new();
        for idx in 0.. {
            if self.max_pages.is_some_and(|max| idx >= max) {
                tracing::debug!("Stopped discovery of {} at {} pages", self.base_url, idx);
                break;
            }
            match (self.url_fn)(&self.base_url, idx) {
                Some(url) if !url.is_empty() => pages.push(vec![url]),
                _ => break,
            }
        }
        pages
    }

    pub(crate) fn parse(&self, ctx: &mut SubmitContext<'_>) -> Result<Vec<Bucket>> {
        let pages = self.discover_urls();
        tracing::debug!("Page '{}' discovered {} pages", ctx.page, pages.len());
        if let Some(fetcher) = &self.fetcher {
            ctx.fetcher = Arc::clone(fetcher);
        }
        submit_pages(&pages, self.delay, ctx)
    }
}
