use crate::{hits, mock_server};
use std::time::{Duration, Instant};
use sumi_weave::extract::{attr, text};
use sumi_weave::fetch::{DelayRange, Headers};
use sumi_weave::page::{ExtractNode, FetchNode, PaginatedFetchNode};
use sumi_weave::{Item, Orchestrator, OrchestratorSettings, Page, ResultTree};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn listing_html(base: &str, ids: &[u32]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<li><a class="item" href="{}/item/{}">#{}</a></li>"#, base, id, id))
        .collect();
    format!("<html><body><ul>{}</ul><a href=\"/about\">about</a></body></html>", links)
}

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        name: "it".to_string(),
        max_concurrency: 4,
        ..OrchestratorSettings::default()
    }
}

fn texts(buckets: &[Vec<Item>]) -> Vec<Vec<&str>> {
    buckets
        .iter()
        .map(|bucket| bucket.iter().filter_map(Item::as_text).collect())
        .collect()
}

/// Walks `path` through nested branches
fn subtree<'a>(tree: &'a ResultTree, path: &[&str]) -> &'a ResultTree {
    path.iter().fold(tree, |node, key| {
        node.get(key)
            .unwrap_or_else(|| panic!("missing result entry {}", key))
    })
}

#[test]
fn test_paginated_crawl_end_to_end() {
    let (runtime, server) = mock_server();
    let base = server.uri();

    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/list/0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&base, &[1, 2])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/list/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(&base, &[2, 3])))
            .mount(&server)
            .await;
        for id in 1..=3 {
            Mock::given(method("GET"))
                .and(path(format!("/item/{}", id)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!("<html><h1> Item {} </h1></html>", id)),
                )
                .mount(&server)
                .await;
        }
    });

    let listing = PaginatedFetchNode::new(base.clone(), |base, i| {
        (i < 2).then(|| format!("{}/list/{}", base, i))
    })
    .with_max_pages(10)
    .with_delay(DelayRange::none());

    let mut orch = Orchestrator::new(settings()).unwrap();
    orch.add_page(Page::new(listing), None, "listing", None, None)
        .unwrap()
        .add_page(
            Page::new(ExtractNode::new(["a.item"]).unwrap().map_items(attr("href"))),
            Some("listing"),
            "links",
            None,
            None,
        )
        .unwrap()
        .add_page(
            Page::new(FetchNode::from_parent().with_delay(DelayRange::none())),
            Some("links"),
            "details",
            None,
            None,
        )
        .unwrap()
        .add_page(
            Page::new(ExtractNode::new(["h1"]).unwrap().map_items(text())),
            Some("details"),
            "titles",
            None,
            None,
        )
        .unwrap();

    let results = orch.run().unwrap();
    let root = &results["listing"];

    let own = subtree(root, &["__listing__"]).as_leaf().unwrap();
    assert_eq!(own.len(), 2);
    assert!(own.iter().flatten().all(Item::is_pending));

    let links = subtree(root, &["links", "__links__"]).as_leaf().unwrap();
    let found: Vec<Vec<String>> = texts(links)
        .into_iter()
        .map(|bucket| bucket.into_iter().map(str::to_string).collect())
        .collect();
    assert_eq!(
        found,
        vec![
            vec![format!("{}/item/1", base), format!("{}/item/2", base)],
            vec![format!("{}/item/2", base), format!("{}/item/3", base)],
        ]
    );

    let titles = subtree(root, &["links", "details", "titles"]).as_leaf().unwrap();
    assert_eq!(texts(titles), vec![vec!["Item 1", "Item 2"], vec!["Item 3"]]);

    // Item 2 is linked from both listing pages but fetched once
    assert_eq!(hits(&runtime, &server, "/item/2"), 1);
    assert_eq!(orch.records().len(), 5);

    orch.close();
    assert!(orch.is_closed());
}

#[test]
fn test_failed_fetches_are_skipped_and_headers_sent() {
    let (runtime, server) = mock_server();
    let base = server.uri();

    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/ok"))
            .and(header("x-weave", "yes"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>fine</p>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
    });

    let mut headers = Headers::new();
    headers.insert("x-weave".to_string(), "yes".to_string());
    let mut orch = Orchestrator::new(OrchestratorSettings {
        headers,
        ..settings()
    })
    .unwrap();

    let pages = vec![
        vec![format!("{}/missing", base), format!("{}/ok", base)],
        vec![format!("{}/missing-too", base)],
    ];
    orch.add_page(
        Page::new(FetchNode::new(pages).with_delay(DelayRange::none())),
        None,
        "root",
        None,
        None,
    )
    .unwrap()
    .add_page(
        Page::new(ExtractNode::new(["p"]).unwrap().map_items(text())),
        Some("root"),
        "body",
        None,
        None,
    )
    .unwrap();

    let results = orch.run().unwrap();
    let body = subtree(&results["root"], &["body"]).as_leaf().unwrap();
    assert_eq!(texts(body), vec![vec!["fine"], vec![]]);

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json["root"]["__root__"][0][0]["status"], "failed");
    assert_eq!(json["root"]["__root__"][0][1]["status"], "finished");
    assert_eq!(json["root"]["body"][0][0], "fine");
    orch.close();
}

#[test]
fn test_result_timeout_releases_slow_pages() {
    let (runtime, server) = mock_server();
    let base = server.uri();

    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;
    });

    let mut orch = Orchestrator::new(OrchestratorSettings {
        result_timeout: Some(Duration::from_millis(300)),
        ..settings()
    })
    .unwrap();
    orch.add_page(
        Page::new(FetchNode::new(vec![format!("{}/slow", base)]).with_delay(DelayRange::none())),
        None,
        "root",
        None,
        None,
    )
    .unwrap()
    .add_page(
        Page::new(ExtractNode::new(["p"]).unwrap()),
        Some("root"),
        "body",
        None,
        None,
    )
    .unwrap();

    let started = Instant::now();
    let results = orch.run().unwrap();
    orch.close();

    assert!(started.elapsed() < Duration::from_secs(5));
    let body = subtree(&results["root"], &["body"]).as_leaf().unwrap();
    assert_eq!(body.len(), 1);
    assert!(body[0].is_empty());
}
