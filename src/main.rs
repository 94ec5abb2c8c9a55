//! Sumi-Weave main entry point
//!
//! This is the command-line interface for running crawl plans.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_weave::config::{build_orchestrator, load_plan, PlanConfig};
use sumi_weave::{Orchestrator, Page, PageKind};
use tracing_subscriber::EnvFilter;

/// Sumi-Weave: a declarative page-graph scraper
///
/// Sumi-Weave reads a crawl plan describing a forest of pages, fetches them
/// through a bounded concurrent pool, extracts what each page asks for, and
/// prints the nested results as JSON.
#[derive(Parser, Debug)]
#[command(name = "sumi-weave")]
#[command(version = "1.0.0")]
#[command(about = "A declarative page-graph scraper", long_about = None)]
struct Cli {
    /// Path to TOML crawl plan
    #[arg(value_name = "PLAN")]
    plan: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the plan and show the page forest without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Write the JSON results to this file instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "dry_run")]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading plan from: {}", cli.plan.display());
    let (plan, hash) = load_plan(&cli.plan)
        .with_context(|| format!("Failed to load plan {}", cli.plan.display()))?;
    tracing::info!("Plan loaded successfully (hash: {})", hash);

    let mut orchestrator = build_orchestrator(&plan).context("Failed to build page forest")?;

    if cli.dry_run {
        handle_dry_run(&plan, &orchestrator);
        return Ok(());
    }

    handle_run(&mut orchestrator, cli.output)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_weave=info,warn"),
            1 => EnvFilter::new("sumi_weave=debug,info"),
            2 => EnvFilter::new("sumi_weave=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the settings and the page forest
fn handle_dry_run(plan: &PlanConfig, orchestrator: &Orchestrator) {
    println!("=== Sumi-Weave Dry Run ===\n");

    let settings = orchestrator.settings();
    println!("Orchestrator:");
    println!("  Name: {}", settings.name);
    println!("  Max concurrency: {}", settings.max_concurrency);
    println!(
        "  Delay: {}-{}ms",
        plan.orchestrator.delay.min_ms, plan.orchestrator.delay.max_ms
    );
    match settings.result_timeout {
        Some(timeout) => println!("  Result timeout: {}s", timeout.as_secs()),
        None => println!("  Result timeout: none"),
    }

    println!("\nShared headers ({}):", settings.headers.len());
    for (name, value) in &settings.headers {
        println!("  {}: {}", name, value);
    }

    println!("\nPages ({}):", plan.pages.len());
    for page in orchestrator.roots().values() {
        print_page(page, 1);
    }

    println!("\n✓ Plan is valid");
}

fn print_page(page: &Page, depth: usize) {
    let detail = match page.kind() {
        PageKind::Fetch(node) => format!("fetch {:?}", node.urls()),
        PageKind::Paginated(node) => format!(
            "paginated from {} (max {} pages)",
            node.base_url(),
            node.max_pages().map_or("?".to_string(), |n| n.to_string())
        ),
        PageKind::Download(node) => format!("download into {}", node.folder().display()),
        PageKind::Extract(node) => format!(
            "extract [{}]{}",
            node.queries().expressions().collect::<Vec<_>>().join(", "),
            if node.has_fallback() { " + fallback" } else { "" }
        ),
    };
    println!("{}- {}: {}", "  ".repeat(depth), page.name(), detail);
    for child in page.children().values() {
        print_page(child, depth + 1);
    }
}

/// Handles the main run: performs the forest, releases the pool, writes JSON
fn handle_run(orchestrator: &mut Orchestrator, output: Option<PathBuf>) -> anyhow::Result<()> {
    let results = match orchestrator.run() {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            orchestrator.close();
            return Err(e.into());
        }
    };

    // Pending items report their task status, so render before the pool goes away
    let json = serde_json::to_string_pretty(&results);
    orchestrator.close();
    let json = json?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
