use crate::{hits, mock_server};
use sumi_weave::fetch::DelayRange;
use sumi_weave::page::{DownloadNode, ExtractNode, FetchNode};
use sumi_weave::{Item, Orchestrator, OrchestratorSettings, Page, Payload};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn orchestrator() -> Orchestrator {
    Orchestrator::new(OrchestratorSettings {
        name: "dl".to_string(),
        max_concurrency: 2,
        ..OrchestratorSettings::default()
    })
    .unwrap()
}

#[test]
fn test_download_then_skip_existing() {
    let (runtime, server) = mock_server();
    let base = server.uri();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/files/a.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/b.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![4u8, 5]))
            .mount(&server)
            .await;
    });

    let dir = TempDir::new().unwrap();
    let urls = vec![format!("{}/files/a.bin", base), format!("{}/files/b.bin", base)];
    let node = || {
        DownloadNode::new(urls.clone(), dir.path())
            .with_page_folder_names(vec!["batch".to_string()])
            .with_delay(DelayRange::none())
    };

    let mut first = orchestrator();
    first
        .add_page(Page::new(node()), None, "files", None, None)
        .unwrap();
    let results = first.run().unwrap();
    first.close();

    // wait_all guarantees the files are on disk once run returns
    let saved = dir.path().join("batch").join("a.bin");
    assert_eq!(std::fs::read(&saved).unwrap(), vec![1, 2, 3]);
    assert_eq!(std::fs::read(dir.path().join("batch").join("b.bin")).unwrap(), vec![4, 5]);

    let own = results["files"].as_leaf().unwrap();
    assert_eq!(own[0].len(), 2);
    let outcome = own[0][0].as_pending().unwrap().get();
    assert_eq!(outcome, &Ok(Payload::Saved(saved)));

    let mut second = orchestrator();
    second
        .add_page(Page::new(node()), None, "files", None, None)
        .unwrap();
    let results = second.run().unwrap();
    second.close();

    assert!(results["files"].as_leaf().unwrap()[0].is_empty());
    assert_eq!(hits(&runtime, &server, "/files/a.bin"), 1);
    assert_eq!(hits(&runtime, &server, "/files/b.bin"), 1);
}

#[test]
fn test_download_links_from_extracted_images() {
    let (runtime, server) = mock_server();
    let base = server.uri();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><body><img src="{0}/img/cat.png"><img src="{0}/img/dog.png?size=large"></body></html>"#,
                base
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cat".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/dog.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"dog".to_vec()))
            .mount(&server)
            .await;
    });

    let dir = TempDir::new().unwrap();
    let mut orch = orchestrator();
    orch.add_page(
        Page::new(FetchNode::new(vec![format!("{}/gallery", base)]).with_delay(DelayRange::none())),
        None,
        "gallery",
        None,
        None,
    )
    .unwrap()
    .add_page(
        Page::new(ExtractNode::new(["img"]).unwrap()),
        Some("gallery"),
        "images",
        None,
        None,
    )
    .unwrap()
    .add_page(
        Page::new(DownloadNode::from_parent(dir.path()).with_delay(DelayRange::none())),
        Some("images"),
        "files",
        None,
        None,
    )
    .unwrap();

    let results = orch.run().unwrap();
    orch.close();

    let images = results["gallery"].get("images").unwrap();
    let files = images.get("files").unwrap().as_leaf().unwrap();
    assert_eq!(files[0].len(), 2);
    assert!(files[0].iter().all(Item::is_pending));

    assert_eq!(std::fs::read(dir.path().join("0").join("cat.png")).unwrap(), b"cat");
    assert_eq!(std::fs::read(dir.path().join("0").join("dog.png")).unwrap(), b"dog");
}
