use crate::fetch::{DelayRange, FetchRequest, Fetcher};
use crate::page::fetch::UrlSource;
use crate::page::naming::{sanitize_file_name, url_basename};
use crate::page::{Bucket, Item, SubmitContext};
use crate::pool::{AsyncResult, TaskPool, POLL_INTERVAL};
use crate::Result;
use futures::FutureExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Downloads every URL into a folder tree
///
/// Files land in `folder/<page>/<file>`, where `<page>` is the page-bucket's
/// configured folder name or its index and `<file>` the configured item name
/// or the URL's basename.
pub struct DownloadNode {
    urls: UrlSource,
    folder: PathBuf,
    page_folder_names: Option<Vec<String>>,
    item_file_names: Option<Vec<Vec<String>>>,
    skip_if_exists: bool,
    wait_all: bool,
    fetcher: Option<Arc<dyn Fetcher>>,
    delay: DelayRange,
}

impl DownloadNode {
    pub fn new(urls: impl Into<UrlSource>, folder: impl Into<PathBuf>) -> Self {
        Self {
            urls: urls.into(),
            folder: folder.into(),
            page_folder_names: None,
            item_file_names: None,
            skip_if_exists: true,
            wait_all: true,
            fetcher: None,
            delay: DelayRange::default(),
        }
    }

    /// Downloads the links found in the parent's result
    pub fn from_parent(folder: impl Into<PathBuf>) -> Self {
        Self::new(UrlSource::Parent, folder)
    }

    pub fn with_page_folder_names(mut self, names: Vec<String>) -> Self {
        self.page_folder_names = Some(names);
        self
    }

    pub fn with_item_file_names(mut self, names: Vec<Vec<String>>) -> Self {
        self.item_file_names = Some(names);
        self
    }

    pub fn skip_if_exists(mut self, skip: bool) -> Self {
        self.skip_if_exists = skip;
        self
    }

    /// Whether `parse` blocks until every download in the page's result is terminal
    ///
    /// Downloads left pending by earlier runs are waited on as well.
    pub fn wait_all(mut self, wait: bool) -> Self {
        self.wait_all = wait;
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

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn urls(&self) -> &UrlSource {
        &self.urls
    }

    /// Target path of item `item_idx` on page `page_idx`
    pub fn target_path(&self, page_idx: usize, item_idx: usize, url: &str) -> PathBuf {
        let page_folder = self
            .page_folder_names
            .as_ref()
            .and_then(|names| names.get(page_idx))
            .map(|name| sanitize_file_name(name))
            .unwrap_or_else(|| page_idx.to_string());

        let file_name = self
            .item_file_names
            .as_ref()
            .and_then(|names| names.get(page_idx))
            .and_then(|names| names.get(item_idx))
            .map(|name| sanitize_file_name(name))
            .unwrap_or_else(|| sanitize_file_name(&url_basename(url)));

        self.folder.join(page_folder).join(file_name)
    }

    pub(crate) fn parse(
        &self,
        input: Option<&[Bucket]>,
        ctx: &mut SubmitContext<'_>,
    ) -> Result<Vec<Bucket>> {
        let pages = self.urls.resolve(ctx.page, input)?;
        let fetcher = match &self.fetcher {
            Some(fetcher) => Arc::clone(fetcher),
            None => Arc::clone(&ctx.fetcher),
        };

        let mut buckets = Vec::with_capacity(pages.len());
        let mut skipped = 0usize;
        let mut targets = HashSet::new();
        for (page_idx, urls) in pages.iter().enumerate() {
            let mut bucket = Bucket::with_capacity(urls.len());
            for (item_idx, url) in urls.iter().enumerate() {
                let path = self.target_path(page_idx, item_idx, url);
                if !targets.insert(path.clone()) {
                    tracing::warn!(
                        "Page '{}' skipping {}: {} is already a target of this run",
                        ctx.page,
                        url,
                        path.display()
                    );
                    skipped += 1;
                    continue;
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                if self.skip_if_exists && path.exists() {
                    tracing::debug!("Page '{}' skipping existing {}", ctx.page, path.display());
                    skipped += 1;
                    continue;
                }

                let fetcher = Arc::clone(&fetcher);
                let request = FetchRequest::bytes(url.clone(), ctx.headers.clone());
                let task = async move { fetcher.download(request, path).await }.boxed();
                let id = ctx.env.pool.submit(None, task)?;

                bucket.push(Item::Pending(
                    AsyncResult::new(Arc::clone(&ctx.env.pool), id)
                        .with_timeout(ctx.env.result_timeout),
                ));
                self.delay.sleep();
            }
            buckets.push(bucket);
        }

        let submitted: usize = buckets.iter().map(Vec::len).sum();
        tracing::info!(
            "Page '{}' submitted {} downloads, skipped {}",
            ctx.page,
            submitted,
            skipped
        );

        if self.wait_all {
            wait_for_all(
                ctx.page,
                ctx.env.pool.as_ref(),
                ctx.existing.iter().chain(&buckets),
                ctx.env.result_timeout,
            );
        }
        Ok(buckets)
    }
}

/// Blocks until every pending item in `buckets` is terminal
///
/// This polls the pool directly and leaves each handle's cache untouched.
/// The remaining count is logged whenever it changes. With a timeout the
/// wait gives up and leaves the stragglers pending.
fn wait_for_all<'a>(
    page: &str,
    pool: &dyn TaskPool,
    buckets: impl IntoIterator<Item = &'a Bucket>,
    timeout: Option<Duration>,
) {
    let pending: Vec<&AsyncResult> = buckets
        .into_iter()
        .flatten()
        .filter_map(Item::as_pending)
        .collect();
    if pending.is_empty() {
        return;
    }

    let started = Instant::now();
    let total = pending.len();
    let mut last_remaining = total;
    loop {
        let remaining = pending
            .iter()
            .filter(|result| result.peek().is_none() && !pool.query(result.id()).is_terminal())
            .count();

        if remaining == 0 {
            tracing::info!("Page '{}' finished all {} downloads", page, total);
            return;
        }
        if remaining != last_remaining {
            tracing::info!("Page '{}' waiting on {}/{} downloads", page, remaining, total);
            last_remaining = remaining;
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                tracing::warn!(
                    "Page '{}' stopped waiting after {:?} with {} downloads pending",
                    page,
                    limit,
                    remaining
                );
                return;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
