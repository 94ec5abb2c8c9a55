//! Hook signatures run around each page's perform

use crate::fetch::{DelayRange, Headers};
use crate::page::Page;
use crate::pool::TaskPool;
use crate::state::DedupRecords;
use std::sync::Arc;

/// What a hook can see of the orchestrator
pub struct HookContext<'a> {
    pub pool: &'a Arc<dyn TaskPool>,
    pub headers: &'a Headers,
    pub records: &'a DedupRecords,
}

/// Gate evaluated before a page performs; `false` skips the page and its subtree
pub type BeforeHook = Box<dyn Fn(&Page, &HookContext<'_>) -> bool + Send + Sync>;

/// Callback run after a page performed, before its children
pub type AfterHook = Box<dyn Fn(&Page, &HookContext<'_>) + Send + Sync>;

pub fn before<F>(f: F) -> BeforeHook
where
    F: Fn(&Page, &HookContext<'_>) -> bool + Send + Sync + 'static,
{
    Box::new(f)
}

pub fn after<F>(f: F) -> AfterHook
where
    F: Fn(&Page, &HookContext<'_>) + Send + Sync + 'static,
{
    Box::new(f)
}

/// Before hook that pauses for a random delay and always lets the page run
pub fn sleep_before(delay: DelayRange) -> BeforeHook {
    before(move |page, _| {
        tracing::debug!("Pausing before page '{}'", page.name());
        delay.sleep();
        true
    })
}
