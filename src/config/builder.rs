//! Turns a validated plan into a populated orchestrator

use crate::config::types::{DelayConfig, OutputMode, PageEntry, PageKindConfig, PlanConfig};
use crate::extract::{attr, inner_html, outer_html, tag_predicate, text, ItemsFn};
use crate::fetch::{DelayRange, Headers, HttpConfig};
use crate::orchestrator::{sleep_before, Orchestrator, OrchestratorSettings};
use crate::page::{url_template, DownloadNode, ExtractNode, FetchNode, Page, PaginatedFetchNode, UrlSource};
use crate::{Result, WeaveError};
use std::time::Duration;

/// Orchestrator settings described by `plan`
///
/// The user agent becomes a shared `User-Agent` header unless `[headers]`
/// already carries one.
pub fn settings_from_plan(plan: &PlanConfig) -> OrchestratorSettings {
    let mut headers: Headers = plan.headers.clone();
    let has_agent = headers.keys().any(|k| k.eq_ignore_ascii_case("user-agent"));
    if !has_agent {
        headers.insert("User-Agent".to_string(), plan.user_agent.agent.clone());
    }

    OrchestratorSettings {
        name: plan.orchestrator.name.clone(),
        max_concurrency: plan.orchestrator.max_concurrency as usize,
        headers,
        result_timeout: plan.orchestrator.result_timeout_secs.map(Duration::from_secs),
        http: HttpConfig {
            timeout: Duration::from_secs(plan.http.timeout_secs),
            connect_timeout: Duration::from_secs(plan.http.connect_timeout_secs),
            user_agent: plan.user_agent.agent.clone(),
        },
    }
}

/// Builds an orchestrator over a fresh pool and HTTP fetcher, then adds every page
pub fn build_orchestrator(plan: &PlanConfig) -> Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new(settings_from_plan(plan))?;
    populate(plan, &mut orchestrator)?;
    Ok(orchestrator)
}

/// Adds the plan's pages to `orchestrator` in declaration order
pub fn populate(plan: &PlanConfig, orchestrator: &mut Orchestrator) -> Result<()> {
    let default_delay = delay_range(&plan.orchestrator.delay);
    for entry in &plan.pages {
        let page = build_page(entry, default_delay)?;
        let before = entry.sleep_before.as_ref().map(|d| sleep_before(delay_range(d)));
        orchestrator.add_page(page, entry.parent.as_deref(), &entry.name, before, None)?;
        tracing::debug!("Plan page '{}' ({:?}) added", entry.name, entry.kind);
    }
    Ok(())
}

fn delay_range(config: &DelayConfig) -> DelayRange {
    DelayRange::from_millis(config.min_ms, config.max_ms)
}

fn url_source(entry: &PageEntry) -> UrlSource {
    match (&entry.urls, &entry.pages) {
        (Some(urls), _) => UrlSource::flat(urls.clone()),
        (None, Some(pages)) => UrlSource::pages(pages.clone()),
        (None, None) => UrlSource::Parent,
    }
}

fn items_fn(mode: OutputMode) -> Option<ItemsFn> {
    match mode {
        OutputMode::Elements => None,
        OutputMode::Text => Some(text()),
        OutputMode::Html => Some(outer_html()),
        OutputMode::InnerHtml => Some(inner_html()),
        OutputMode::Attr(name) => Some(attr(name)),
    }
}

fn invalid(entry: &PageEntry, message: &str) -> WeaveError {
    WeaveError::InvalidNode {
        page: entry.name.clone(),
        message: message.to_string(),
    }
}

/// Builds one page from its plan entry
fn build_page(entry: &PageEntry, default_delay: DelayRange) -> Result<Page> {
    let delay = entry.delay.as_ref().map(delay_range).unwrap_or(default_delay);

    let page = match entry.kind {
        PageKindConfig::Fetch => Page::new(FetchNode::new(url_source(entry)).with_delay(delay)),
        PageKindConfig::Paginated => {
            let base = entry
                .base_url
                .clone()
                .ok_or_else(|| invalid(entry, "missing base-url"))?;
            let template = entry
                .url_template
                .clone()
                .ok_or_else(|| invalid(entry, "missing url-template"))?;
            let max_pages = entry
                .max_pages
                .ok_or_else(|| invalid(entry, "missing max-pages"))?;
            let node = PaginatedFetchNode::with_url_fn(
                base,
                url_template(template, entry.start_index, max_pages),
            )
            .with_max_pages(max_pages)
            .with_delay(delay);
            Page::new(node)
        }
        PageKindConfig::Download => {
            let folder = entry
                .folder
                .clone()
                .ok_or_else(|| invalid(entry, "missing folder"))?;
            let node = DownloadNode::new(url_source(entry), folder)
                .skip_if_exists(entry.skip_if_exists)
                .wait_all(entry.wait_all)
                .with_delay(delay);
            Page::new(node)
        }
        PageKindConfig::Extract => {
            let mut node = if entry.query.is_empty() {
                let tag = entry
                    .fallback_tag
                    .clone()
                    .ok_or_else(|| invalid(entry, "needs a query or a fallback-tag"))?;
                ExtractNode::from_predicate(tag_predicate(tag))
            } else {
                let node = ExtractNode::new(&entry.query)?;
                match &entry.fallback_tag {
                    Some(tag) => node.fallback(tag_predicate(tag.clone())),
                    None => node,
                }
            };
            let mode = OutputMode::parse(entry.output.as_deref())
                .ok_or_else(|| invalid(entry, "unknown output mode"))?;
            if let Some(f) = items_fn(mode) {
                node = node.map_items(f);
            }
            Page::new(node)
        }
    };

    let page = page.ignore_dedup(entry.ignore_dedup);
    Ok(match &entry.headers {
        Some(headers) => page.with_headers(headers.clone()),
        None => page,
    })
}
