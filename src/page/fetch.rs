use crate::fetch::{DelayRange, FetchRequest, Fetcher};
use crate::page::{Bucket, Item, SubmitContext};
use crate::pool::AsyncResult;
use crate::{Result, WeaveError};
use futures::FutureExt;
use std::sync::Arc;

/// Where a fetch-type node gets its URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// Literal URLs, one inner list per page-bucket
    Pages(Vec<Vec<String>>),

    /// Links found in the parent's result, bucket by bucket
    Parent,
}

impl UrlSource {
    /// A single page-bucket holding every URL
    pub fn flat<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Pages(vec![urls.into_iter().map(Into::into).collect()])
    }

    pub fn pages(pages: Vec<Vec<String>>) -> Self {
        Self::Pages(pages)
    }

    /// Materializes the URL buckets
    ///
    /// Parent items without a usable link are dropped from their bucket,
    /// which itself is kept so bucket counts line up with the parent.
    pub(crate) fn resolve(&self, page: &str, input: Option<&[Bucket]>) -> Result<Vec<Vec<String>>> {
        match self {
            Self::Pages(pages) => Ok(pages.clone()),
            Self::Parent => {
                let input = input.ok_or_else(|| WeaveError::MissingInput {
                    page: page.to_string(),
                })?;
                Ok(input
                    .iter()
                    .map(|bucket| {
                        bucket
                            .iter()
                            .filter_map(|item| match item.as_url() {
                                Some(url) if !url.is_empty() => Some(url.to_string()),
                                _ => {
                                    tracing::debug!("Page '{}' skipping item without a link", page);
                                    None
                                }
                            })
                            .collect()
                    })
                    .collect())
            }
        }
    }
}

impl From<Vec<String>> for UrlSource {
    fn from(urls: Vec<String>) -> Self {
        Self::flat(urls)
    }
}

impl From<Vec<&str>> for UrlSource {
    fn from(urls: Vec<&str>) -> Self {
        Self::flat(urls)
    }
}

impl From<Vec<Vec<String>>> for UrlSource {
    fn from(pages: Vec<Vec<String>>) -> Self {
        Self::Pages(pages)
    }
}

/// Submits every URL to the pool as a text fetch
pub struct FetchNode {
    pub(crate) urls: UrlSource,
    pub(crate) fetcher: Option<Arc<dyn Fetcher>>,
    pub(crate) delay: DelayRange,
}

impl FetchNode {
    pub fn new(urls: impl Into<UrlSource>) -> Self {
        Self {
            urls: urls.into(),
            fetcher: None,
            delay: DelayRange::default(),
        }
    }

    /// Fetches the links found in the parent's result
    pub fn from_parent() -> Self {
        Self::new(UrlSource::Parent)
    }

    /// Overrides the orchestrator's fetcher for this node
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_delay(mut self, delay: DelayRange) -> Self {
        self.delay = delay;
        self
    }

    pub fn urls(&self) -> &UrlSource {
        &self.urls
    }

    pub fn delay(&self) -> DelayRange {
        self.delay
    }

    pub(crate) fn parse(
        &self,
        input: Option<&[Bucket]>,
        ctx: &mut SubmitContext<'_>,
    ) -> Result<Vec<Bucket>> {
        let pages = self.urls.resolve(ctx.page, input)?;
        if let Some(fetcher) = &self.fetcher {
            ctx.fetcher = Arc::clone(fetcher);
        }
        submit_pages(&pages, self.delay, ctx)
    }
}

/// Shared submission loop of fetch and paginated nodes
///
/// URLs are recorded as seen even when the node ignores dedup, so later
/// nodes still skip them.
pub(crate) fn submit_pages(
    pages: &[Vec<String>],
    delay: DelayRange,
    ctx: &mut SubmitContext<'_>,
) -> Result<Vec<Bucket>> {
    let mut buckets = Vec::with_capacity(pages.len());
    let mut submitted = 0usize;

    for urls in pages {
        let mut bucket = Bucket::with_capacity(urls.len());
        for url in urls {
            let unseen = ctx.records.insert(url);
            if !unseen && !ctx.ignore_dedup {
                tracing::debug!("Page '{}' already fetched {}, skipping", ctx.page, url);
                continue;
            }

            let fetcher = Arc::clone(&ctx.fetcher);
            let request = FetchRequest::text(url.clone(), ctx.headers.clone());
            let task = async move { fetcher.fetch(request).await }.boxed();
            let id = ctx.env.pool.submit(None, task)?;
            tracing::trace!("Page '{}' submitted {} as {}", ctx.page, url, id);

            bucket.push(Item::Pending(
                AsyncResult::new(Arc::clone(&ctx.env.pool), id).with_timeout(ctx.env.result_timeout),
            ));
            submitted += 1;
            delay.sleep();
        }
        buckets.push(bucket);
    }

    tracing::info!(
        "Page '{}' submitted {} fetches over {} pages",
        ctx.page,
        submitted,
        buckets.len()
    );
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::tests::echo_env;
    use crate::page::Page;
    use crate::pool::testing::ScriptedPool;
    use crate::pool::Payload;
    use crate::state::DedupRecords;

    fn quiet(urls: impl Into<UrlSource>) -> FetchNode {
        FetchNode::new(urls).with_delay(DelayRange::none())
    }

    fn text_of(item: &Item) -> String {
        match item.as_pending().unwrap().get() {
            Ok(Payload::Text(text)) => text.clone(),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_one_bucket_per_page() {
        let pool = Arc::new(ScriptedPool::new());
        let pages = vec![
            vec!["http://a/1".to_string(), "http://a/2".to_string()],
            vec!["http://a/3".to_string()],
            vec![],
        ];
        let mut page = Page::new(quiet(pages)).named("root");
        page.attach(echo_env(pool.clone()));

        let mut records = DedupRecords::new();
        let result = page.perform(None, &mut records).unwrap();
        let sizes: Vec<_> = result.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1, 0]);
        assert_eq!(text_of(&result[1][0]), "<p>http://a/3</p>");
    }

    #[test]
    fn test_duplicate_url_submitted_once() {
        let pool = Arc::new(ScriptedPool::new());
        let mut page = Page::new(quiet(vec!["http://a/1", "http://a/1"])).named("root");
        page.attach(echo_env(pool.clone()));

        let mut records = DedupRecords::new();
        page.perform(None, &mut records).unwrap();
        assert_eq!(pool.submitted().len(), 1);
        assert_eq!(page.result()[0].len(), 1);
    }

    #[test]
    fn test_ignore_dedup_submits_twice() {
        let pool = Arc::new(ScriptedPool::new());
        let mut page = Page::new(quiet(vec!["http://a/1", "http://a/1"]))
            .named("root")
            .ignore_dedup(true);
        page.attach(echo_env(pool.clone()));

        let mut records = DedupRecords::new();
        page.perform(None, &mut records).unwrap();
        assert_eq!(pool.submitted().len(), 2);
        assert!(records.contains("http://a/1"));
    }

    #[test]
    fn test_seen_urls_shared_across_nodes() {
        let pool = Arc::new(ScriptedPool::new());
        let mut records = DedupRecords::new();

        let mut first = Page::new(quiet(vec!["http://a/1"])).named("first");
        first.attach(echo_env(pool.clone()));
        first.perform(None, &mut records).unwrap();

        let mut second = Page::new(quiet(vec!["http://a/1", "http://a/2"])).named("second");
        second.attach(echo_env(pool.clone()));
        second.perform(None, &mut records).unwrap();

        assert_eq!(pool.submitted().len(), 2);
        assert_eq!(second.result()[0].len(), 1);
    }

    #[test]
    fn test_links_from_parent_keep_bucket_count() {
        let pool = Arc::new(ScriptedPool::new());
        let mut page = Page::new(FetchNode::from_parent().with_delay(DelayRange::none())).named("next");
        page.attach(echo_env(pool.clone()));

        let input = vec![
            vec![Item::from("http://a/1"), Item::from("")],
            vec![],
            vec![Item::from("http://a/2")],
        ];
        let mut records = DedupRecords::new();
        let result = page.perform(Some(&input), &mut records).unwrap();
        assert_eq!(result.len(), input.len());
        assert_eq!(result[0].len(), 1);
        assert_eq!(text_of(&result[2][0]), "<p>http://a/2</p>");
    }

    #[test]
    fn test_parent_source_without_input() {
        let pool = Arc::new(ScriptedPool::new());
        let mut page = Page::new(FetchNode::from_parent()).named("next");
        page.attach(echo_env(pool));

        let mut records = DedupRecords::new();
        let result = page.perform(None, &mut records);
        assert!(matches!(result, Err(WeaveError::MissingInput { .. })));
    }

    #[test]
    fn test_node_fetcher_overrides_env() {
        let pool = Arc::new(ScriptedPool::new());
        let custom: Arc<dyn Fetcher> = Arc::new(crate::fetch::fetcher_fn(|_: FetchRequest| async move {
            Ok(Payload::Text("custom".to_string()))
        }));
        let mut page = Page::new(quiet(vec!["http://a/1"]).with_fetcher(custom)).named("root");
        page.attach(echo_env(pool));

        let mut records = DedupRecords::new();
        let result = page.perform(None, &mut records).unwrap();
        assert_eq!(text_of(&result[0][0]), "custom");
    }
}
