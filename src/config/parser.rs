use crate::config::types::PlanConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads a crawl plan and hashes the text it was parsed from
///
/// The hash is logged with each run so results can be traced back to the
/// plan that produced them.
///
/// # Returns
///
/// * `Ok((PlanConfig, String))` - Validated plan and its hex SHA-256 hash
/// * `Err(ConfigError)` - Failed to read, parse, or validate the plan
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_weave::config::load_plan;
///
/// let (plan, hash) = load_plan(Path::new("plan.toml")).unwrap();
/// println!("{} pages, plan {}", plan.pages.len(), hash);
/// ```
pub fn load_plan(path: &Path) -> Result<(PlanConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let plan = parse_plan(&content)?;
    Ok((plan, plan_hash(&content)))
}

/// Parses and validates plan text
pub fn parse_plan(content: &str) -> Result<PlanConfig, ConfigError> {
    let plan: PlanConfig = toml::from_str(content)?;
    validate(&plan)?;
    Ok(plan)
}

pub fn plan_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::PageKindConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_plan(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_plan() {
        let plan_content = r#"
[orchestrator]
name = "books"
max-concurrency = 4
result-timeout-secs = 60

[orchestrator.delay]
min-ms = 100
max-ms = 200

[user-agent]
agent = "weave-test/1.0"

[headers]
Accept-Language = "en"

[[page]]
name = "listing"
kind = "paginated"
base-url = "https://books.example.com"
url-template = "{base}/page/{index}"
start-index = 1
max-pages = 3

[[page]]
name = "links"
parent = "listing"
kind = "extract"
query = ["article h3 a", "a.title"]
output = "attr:href"
"#;

        let file = create_temp_plan(plan_content);
        let (plan, hash) = load_plan(file.path()).unwrap();

        assert_eq!(hash, plan_hash(plan_content));
        assert_eq!(plan.orchestrator.name, "books");
        assert_eq!(plan.orchestrator.max_concurrency, 4);
        assert_eq!(plan.orchestrator.delay.min_ms, 100);
        assert_eq!(plan.user_agent.agent, "weave-test/1.0");
        assert_eq!(plan.headers["Accept-Language"], "en");
        assert_eq!(plan.pages.len(), 2);
        assert_eq!(plan.pages[0].kind, PageKindConfig::Paginated);
        assert_eq!(plan.pages[0].start_index, 1);
        assert_eq!(plan.pages[1].query.len(), 2);
    }

    #[test]
    fn test_defaults_apply() {
        let plan = parse_plan(
            r#"
[[page]]
name = "root"
kind = "download"
urls = ["https://example.com/a.bin"]
folder = "out"
"#,
        )
        .unwrap();

        assert_eq!(plan.orchestrator.max_concurrency, 8);
        assert_eq!(plan.orchestrator.delay.max_ms, 1000);
        assert_eq!(plan.http.timeout_secs, 30);
        assert!(plan.pages[0].skip_if_exists);
        assert!(plan.pages[0].wait_all);
        assert!(!plan.pages[0].ignore_dedup);
    }

    #[test]
    fn test_load_plan_with_invalid_path() {
        let result = load_plan(Path::new("/nonexistent/plan.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_plan_with_invalid_toml() {
        let file = create_temp_plan("this is not valid TOML {{{");
        let result = load_plan(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let result = parse_plan(
            r#"
[[page]]
name = "root"
kind = "crawl"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_plan_with_validation_error() {
        let file = create_temp_plan(
            r#"
[orchestrator]
max-concurrency = 0

[[page]]
name = "root"
kind = "fetch"
urls = ["https://example.com/"]
"#,
        );
        let result = load_plan(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_plan_hash() {
        let hash = plan_hash("test content");
        assert_eq!(hash, plan_hash("test content"));
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, plan_hash("other content"));
    }
}
