use crate::{hits, mock_server};
use std::io::Write;
use sumi_weave::config::{build_orchestrator, load_plan, plan_hash};
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn plan_toml(base: &str) -> String {
    format!(
        r#"
[orchestrator]
name = "plan-run"
max-concurrency = 4

[orchestrator.delay]
min-ms = 0
max-ms = 0

[user-agent]
agent = "weave-test/1.0"

[headers]
X-Plan = "listing"

[[page]]
name = "listing"
kind = "paginated"
base-url = "{base}"
url-template = "{{base}}/list/{{index}}"
start-index = 1
max-pages = 2

[[page]]
name = "links"
parent = "listing"
kind = "extract"
query = ["a.item"]
output = "attr:href"

[[page]]
name = "details"
parent = "links"
kind = "fetch"

[[page]]
name = "titles"
parent = "details"
kind = "extract"
query = ["h1.title", "h1"]
output = "text"
"#,
        base = base
    )
}

#[test]
fn test_plan_file_drives_full_crawl() {
    let (runtime, server) = mock_server();
    let base = server.uri();

    runtime.block_on(async {
        for (list, id) in [(1, 10), (2, 20)] {
            Mock::given(method("GET"))
                .and(path(format!("/list/{}", list)))
                .and(header("x-plan", "listing"))
                .and(header("user-agent", "weave-test/1.0"))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                    r#"<ul><li><a class="item" href="{}/item/{}">x</a></li></ul>"#,
                    base, id
                )))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/item/10"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<h1 class="title">Ten</h1>"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/20"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Twenty</h1>"))
            .mount(&server)
            .await;
    });

    let contents = plan_toml(&base);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();

    let (plan, hash) = load_plan(file.path()).unwrap();
    assert_eq!(hash, plan_hash(&contents));
    assert_eq!(hash.len(), 64);
    assert_eq!(plan.pages.len(), 4);

    let mut orch = build_orchestrator(&plan).unwrap();
    let results = orch.run().unwrap();
    let json = serde_json::to_value(&results).unwrap();
    orch.close();

    let titles = &json["listing"]["links"]["details"]["titles"];
    assert_eq!(titles, &serde_json::json!([["Ten"], ["Twenty"]]));
    assert_eq!(
        json["listing"]["links"]["__links__"],
        serde_json::json!([[format!("{}/item/10", base)], [format!("{}/item/20", base)]])
    );
    assert_eq!(hits(&runtime, &server, "/list/0"), 0);
    assert_eq!(hits(&runtime, &server, "/item/10"), 1);
}
