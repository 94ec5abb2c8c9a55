//! Fetch module
//!
//! This module contains everything a fetch-type page hands to the pool:
//! - The `Fetcher` trait (the pluggable fetch function)
//! - An HTTP implementation on top of reqwest
//! - Randomized delays used to throttle submission

mod delay;
mod http;

pub use delay::DelayRange;
pub use http::{build_http_client, HttpConfig, HttpFetcher, DEFAULT_USER_AGENT};

use crate::pool::{Payload, TaskFailure, TaskOutcome};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

/// Request headers, kept ordered so runs are reproducible
pub type Headers = BTreeMap<String, String>;

/// What a fetch should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Decoded body, for pages that will be parsed
    Text,

    /// Raw body, for downloads
    Bytes,
}

/// A single request handed to a [`Fetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Headers,
    pub kind: FetchKind,
}

impl FetchRequest {
    pub fn text(url: impl Into<String>, headers: Headers) -> Self {
        Self {
            url: url.into(),
            headers,
            kind: FetchKind::Text,
        }
    }

    pub fn bytes(url: impl Into<String>, headers: Headers) -> Self {
        Self {
            url: url.into(),
            headers,
            kind: FetchKind::Bytes,
        }
    }
}

/// Retrieves page content for the pool
///
/// Runs inside pool workers. Failures are reported as [`TaskFailure`]
/// values and never panic the worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `request.url`, returning text or bytes per `request.kind`
    async fn fetch(&self, request: FetchRequest) -> TaskOutcome;

    /// Fetches the raw body and writes it to `path`
    ///
    /// Parent directories are created as needed.
    async fn download(&self, request: FetchRequest, path: PathBuf) -> TaskOutcome {
        let request = FetchRequest {
            kind: FetchKind::Bytes,
            ..request
        };

        let bytes = match self.fetch(request).await? {
            Payload::Bytes(bytes) => bytes,
            Payload::Text(text) => text.into_bytes(),
            Payload::Saved(saved) => {
                tokio::fs::read(&saved)
                    .await
                    .map_err(|e| TaskFailure::Io(e.to_string()))?
            }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TaskFailure::Io(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| TaskFailure::Io(e.to_string()))?;

        Ok(Payload::Saved(path))
    }
}

/// Adapts an async closure into a [`Fetcher`]
pub struct FnFetcher<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Fetcher for FnFetcher<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = TaskOutcome> + Send + 'static,
{
    async fn fetch(&self, request: FetchRequest) -> TaskOutcome {
        (self.f)(request).await
    }
}

/// Wraps `f` so it can be used wherever a fetcher is expected
///
/// # Example
///
/// ```no_run
/// use sumi_weave::fetch::fetcher_fn;
/// use sumi_weave::pool::Payload;
///
/// let fetcher = fetcher_fn(|request| async move {
///     Ok(Payload::Text(format!("<p>{}</p>", request.url)))
/// });
/// ```
pub fn fetcher_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = TaskOutcome> + Send + 'static,
{
    FnFetcher { f }
}
