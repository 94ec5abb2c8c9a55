//! Integration tests for Sumi-Weave
//!
//! These tests run real orchestrators (coroutine pool plus HTTP fetcher)
//! against wiremock servers. The orchestrator blocks its calling thread, so
//! each test is a plain `#[test]` that keeps a separate runtime alive for
//! the mock server.

mod crawl;
mod download;
mod plan;

use wiremock::MockServer;

/// Starts a mock server on its own multi-thread runtime
pub fn mock_server() -> (tokio::runtime::Runtime, MockServer) {
    let runtime = tokio::runtime::Runtime::new().expect("test runtime");
    let server = runtime.block_on(MockServer::start());
    (runtime, server)
}

/// Number of requests the server received for `path`
pub fn hits(runtime: &tokio::runtime::Runtime, server: &MockServer, path: &str) -> usize {
    runtime
        .block_on(server.received_requests())
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
