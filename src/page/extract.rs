use crate::extract::{find_all, identity, ItemsFn, MatchedElement, Predicate, QuerySet};
use crate::page::{Bucket, Item};
use crate::{Result, WeaveError};
use scraper::Html;

/// Queries the documents produced by its parent
///
/// Queries run first, in order, until one matches. The predicate, when set,
/// runs if there are no queries or none of them matched, and its matches are
/// merged into the page's bucket.
pub struct ExtractNode {
    queries: QuerySet,
    predicate: Option<Predicate>,
    items_fn: ItemsFn,
}

impl ExtractNode {
    /// Compiles the alternative selectors, primary first
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractNode)` - Node with at least one valid selector
    /// * `Err(WeaveError::InvalidQuery)` - A selector failed to compile
    /// * `Err(WeaveError::EmptyQuery)` - No selector was given
    pub fn new<I, S>(expressions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let queries = QuerySet::parse(expressions)?;
        if queries.is_empty() {
            return Err(WeaveError::EmptyQuery);
        }
        Ok(Self {
            queries,
            predicate: None,
            items_fn: identity(),
        })
    }

    /// Node extracting only through `predicate`
    pub fn from_predicate(predicate: Predicate) -> Self {
        Self {
            queries: QuerySet::default(),
            predicate: Some(predicate),
            items_fn: identity(),
        }
    }

    /// Adds a predicate used when no query matches
    pub fn fallback(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Function applied to each page-bucket's full match list
    pub fn map_items(mut self, items_fn: ItemsFn) -> Self {
        self.items_fn = items_fn;
        self
    }

    pub fn queries(&self) -> &QuerySet {
        &self.queries
    }

    pub fn has_fallback(&self) -> bool {
        self.predicate.is_some()
    }

    /// One bucket of matches per input bucket
    ///
    /// Items that cannot be turned into a document are skipped, so a page
    /// whose fetches all failed yields an empty bucket.
    pub(crate) fn parse(&self, input: &[Bucket], page: &str) -> Vec<Bucket> {
        input
            .iter()
            .map(|bucket| {
                bucket
                    .iter()
                    .filter_map(|item| document_source(item, page))
                    .flat_map(|html| self.select(&Html::parse_document(&html)))
                    .map(Item::Element)
                    .collect()
            })
            .collect()
    }

    pub(crate) fn postprocess(&self, buckets: Vec<Bucket>) -> Vec<Bucket> {
        buckets.into_iter().map(|bucket| (self.items_fn)(bucket)).collect()
    }

    fn select(&self, document: &Html) -> Vec<MatchedElement> {
        let mut matches = self.queries.select(document);
        if matches.is_empty() {
            if let Some(predicate) = &self.predicate {
                matches.extend(find_all(document, predicate));
            }
        }
        matches
    }
}

/// Markup behind one input item, resolving pending fetches
fn document_source(item: &Item, page: &str) -> Option<String> {
    match item {
        Item::Text(text) => Some(text.clone()),
        Item::Element(element) => Some(element.html.clone()),
        Item::Pending(result) => match result.get() {
            Ok(payload) => match payload.to_text() {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("Page '{}' cannot decode {}: {}", page, result.id(), e);
                    None
                }
            },
            Err(failure) => {
                tracing::debug!("Page '{}' skipping failed {}: {}", page, result.id(), failure);
                None
            }
        },
    }
}
