//! Per-bucket item functions
//!
//! An extract page hands each page-bucket's full match list to one of these
//! functions, so aggregations run once per page rather than once per item.

use crate::page::Item;
use std::sync::Arc;

/// Function mapping one page-bucket to its final items
pub type ItemsFn = Arc<dyn Fn(Vec<Item>) -> Vec<Item> + Send + Sync>;

/// Wraps a closure as an [`ItemsFn`]
pub fn items_fn<F>(f: F) -> ItemsFn
where
    F: Fn(Vec<Item>) -> Vec<Item> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Leaves the bucket untouched
pub fn identity() -> ItemsFn {
    items_fn(|items| items)
}

/// Replaces every element with its trimmed text
pub fn text() -> ItemsFn {
    items_fn(|items| {
        items
            .into_iter()
            .map(|item| match item {
                Item::Element(element) => Item::Text(element.trimmed_text().to_string()),
                other => other,
            })
            .collect()
    })
}

/// Replaces every element with the markup of its children
pub fn inner_html() -> ItemsFn {
    items_fn(|items| {
        items
            .into_iter()
            .map(|item| match item {
                Item::Element(element) => Item::Text(element.inner_html),
                other => other,
            })
            .collect()
    })
}

/// Replaces every element with its own markup
pub fn outer_html() -> ItemsFn {
    items_fn(|items| {
        items
            .into_iter()
            .map(|item| match item {
                Item::Element(element) => Item::Text(element.html),
                other => other,
            })
            .collect()
    })
}

/// Replaces every element with the value of `name`
///
/// Elements without the attribute are dropped.
pub fn attr(name: impl Into<String>) -> ItemsFn {
    let name = name.into();
    items_fn(move |items| {
        items
            .into_iter()
            .filter_map(|item| match item {
                Item::Element(element) => element.attr(&name).map(|v| Item::Text(v.to_string())),
                other => Some(other),
            })
            .collect()
    })
}

/// Chains functions left to right
pub fn compose(fns: Vec<ItemsFn>) -> ItemsFn {
    items_fn(move |items| fns.iter().fold(items, |acc, f| f(acc)))
}
