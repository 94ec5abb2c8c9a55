use crate::config::types::{
    DelayConfig, HttpSection, OrchestratorConfig, OutputMode, PageEntry, PageKindConfig,
    PlanConfig, UserAgentConfig,
};
use crate::extract::Query;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire plan
pub fn validate(plan: &PlanConfig) -> Result<(), ConfigError> {
    validate_orchestrator_config(&plan.orchestrator)?;
    validate_user_agent_config(&plan.user_agent)?;
    validate_http_section(&plan.http)?;
    validate_pages(&plan.pages)?;
    Ok(())
}

/// Validates orchestrator configuration
fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "orchestrator name cannot be empty".to_string(),
        ));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 256, got {}",
            config.max_concurrency
        )));
    }

    if config.result_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "result_timeout_secs must be >= 1 when set".to_string(),
        ));
    }

    validate_delay("orchestrator delay", &config.delay)
}

fn validate_delay(label: &str, delay: &DelayConfig) -> Result<(), ConfigError> {
    if delay.min_ms > delay.max_ms {
        return Err(ConfigError::Validation(format!(
            "{}: min_ms ({}) must not exceed max_ms ({})",
            label, delay.min_ms, delay.max_ms
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_section(config: &HttpSection) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "http timeouts must be >= 1 second".to_string(),
        ));
    }
    Ok(())
}

/// Validates the page list: names, parent order, and per-kind fields
fn validate_pages(pages: &[PageEntry]) -> Result<(), ConfigError> {
    if pages.is_empty() {
        return Err(ConfigError::Validation(
            "plan must declare at least one [[page]]".to_string(),
        ));
    }

    let mut declared: HashSet<&str> = HashSet::new();
    for page in pages {
        validate_page_name(&page.name)?;
        if declared.contains(page.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "page name '{}' is declared twice",
                page.name
            )));
        }

        if let Some(parent) = &page.parent {
            if !declared.contains(parent.as_str()) {
                return Err(ConfigError::UnknownParent {
                    page: page.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        validate_page_entry(page)?;
        declared.insert(page.name.as_str());
    }

    Ok(())
}

fn validate_page_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "page name cannot be empty".to_string(),
        ));
    }

    if name.contains('/') {
        return Err(ConfigError::Validation(format!(
            "page name '{}' cannot contain '/'",
            name
        )));
    }

    Ok(())
}

fn validate_page_entry(page: &PageEntry) -> Result<(), ConfigError> {
    if let Some(delay) = &page.delay {
        validate_delay(&format!("page '{}' delay", page.name), delay)?;
    }
    if let Some(delay) = &page.sleep_before {
        validate_delay(&format!("page '{}' sleep-before", page.name), delay)?;
    }

    match page.kind {
        PageKindConfig::Fetch => validate_url_source(page),
        PageKindConfig::Paginated => validate_paginated(page),
        PageKindConfig::Download => {
            match &page.folder {
                Some(folder) if !folder.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "download page '{}' needs a folder",
                        page.name
                    )))
                }
            }
            validate_url_source(page)
        }
        PageKindConfig::Extract => validate_extract(page),
    }
}

/// Literal URLs, or a parent to take links from
fn validate_url_source(page: &PageEntry) -> Result<(), ConfigError> {
    let literal: Vec<&String> = match (&page.urls, &page.pages) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::Validation(format!(
                "page '{}' sets both urls and pages",
                page.name
            )))
        }
        (Some(urls), None) => urls.iter().collect(),
        (None, Some(pages)) => pages.iter().flatten().collect(),
        (None, None) => {
            if page.parent.is_none() {
                return Err(ConfigError::Validation(format!(
                    "page '{}' needs urls, pages or a parent",
                    page.name
                )));
            }
            return Ok(());
        }
    };

    for url in literal {
        validate_url(&page.name, url)?;
    }
    Ok(())
}

fn validate_paginated(page: &PageEntry) -> Result<(), ConfigError> {
    let base = page.base_url.as_deref().ok_or_else(|| {
        ConfigError::Validation(format!("paginated page '{}' needs a base-url", page.name))
    })?;
    validate_url(&page.name, base)?;

    let template = page.url_template.as_deref().ok_or_else(|| {
        ConfigError::Validation(format!(
            "paginated page '{}' needs a url-template",
            page.name
        ))
    })?;
    if !template.contains("{index}") {
        return Err(ConfigError::Validation(format!(
            "url-template of page '{}' must contain {{index}}",
            page.name
        )));
    }

    match page.max_pages {
        Some(max) if max >= 1 => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "paginated page '{}' needs max-pages >= 1",
            page.name
        ))),
    }
}

fn validate_extract(page: &PageEntry) -> Result<(), ConfigError> {
    if page.parent.is_none() {
        return Err(ConfigError::Validation(format!(
            "extract page '{}' needs a parent",
            page.name
        )));
    }

    if page.query.is_empty() && page.fallback_tag.is_none() {
        return Err(ConfigError::Validation(format!(
            "extract page '{}' needs a query or a fallback-tag",
            page.name
        )));
    }

    for expression in &page.query {
        Query::css(expression).map_err(|e| ConfigError::Validation(e.to_string()))?;
    }

    if OutputMode::parse(page.output.as_deref()).is_none() {
        return Err(ConfigError::Validation(format!(
            "page '{}' has unknown output '{}'",
            page.name,
            page.output.as_deref().unwrap_or_default()
        )));
    }

    Ok(())
}

fn validate_url(page: &str, url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}' in page '{}': {}", url, page, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' in page '{}' must use http or https",
            url, page
        )));
    }
    Ok(())
}
