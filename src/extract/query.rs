//! Query expressions evaluated against parsed HTML documents

use crate::extract::MatchedElement;
use crate::WeaveError;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::Arc;

/// Element test used by the predicate extraction strategy
pub type Predicate = Arc<dyn Fn(&ElementRef<'_>) -> bool + Send + Sync>;

/// Wraps a closure as a [`Predicate`]
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&ElementRef<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Predicate matching every element with the given tag name
pub fn tag_predicate(tag: impl Into<String>) -> Predicate {
    let tag = tag.into().to_ascii_lowercase();
    predicate(move |element| element.value().name() == tag)
}

/// Returns every element of `document` accepted by `predicate`, in document order
pub fn find_all(document: &Html, predicate: &Predicate) -> Vec<MatchedElement> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| predicate(element))
        .map(|element| MatchedElement::from_element(&element))
        .collect()
}

/// A compiled CSS selector
#[derive(Clone)]
pub struct Query {
    expression: String,
    selector: Selector,
}

impl Query {
    /// Compiles a CSS selector
    ///
    /// # Returns
    ///
    /// * `Ok(Query)` - The compiled query
    /// * `Err(WeaveError::InvalidQuery)` - The expression is not a valid selector
    pub fn css(expression: &str) -> Result<Self, WeaveError> {
        let selector = Selector::parse(expression).map_err(|e| WeaveError::InvalidQuery {
            query: expression.to_string(),
            message: format!("{:?}", e),
        })?;

        Ok(Self {
            expression: expression.to_string(),
            selector,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// All matches of this query, in document order
    pub fn select(&self, document: &Html) -> Vec<MatchedElement> {
        document
            .select(&self.selector)
            .map(|element| MatchedElement::from_element(&element))
            .collect()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Query").field(&self.expression).finish()
    }
}

/// Ordered alternative queries
///
/// The first alternative is the primary expression; later ones are only
/// evaluated when every earlier one matched nothing.
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    queries: Vec<Query>,
}

impl QuerySet {
    /// Compiles every expression, failing on the first invalid one
    pub fn parse<I, S>(expressions: I) -> Result<Self, WeaveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let queries = expressions
            .into_iter()
            .map(|expression| Query::css(expression.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(Query::expression)
    }

    /// Matches of the first alternative that matches anything
    ///
    /// Empty when no alternative matches.
    pub fn select(&self, document: &Html) -> Vec<MatchedElement> {
        for query in &self.queries {
            let matches = query.select(document);
            if !matches.is_empty() {
                return matches;
            }
            tracing::trace!("Query '{}' matched nothing", query.expression());
        }
        Vec::new()
    }
}

impl From<Query> for QuerySet {
    fn from(query: Query) -> Self {
        Self {
            queries: vec![query],
        }
    }
}
