//! Extraction module
//!
//! HTML querying used by extract pages:
//! - `Query` / `QuerySet`: CSS selectors tried in order until one matches
//! - `Predicate`: element-level test used as a fallback strategy
//! - Item functions applied to each page-bucket after extraction

mod element;
mod query;
mod transform;

pub use element::MatchedElement;
pub use query::{find_all, predicate, tag_predicate, Predicate, Query, QuerySet};
pub use transform::{attr, compose, identity, inner_html, items_fn, outer_html, text, ItemsFn};
