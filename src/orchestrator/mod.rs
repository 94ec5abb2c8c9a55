//! Orchestrator - owns the page forest and drives a run
//!
//! This module wires pages into a forest and walks it:
//! - Injecting the shared pool, fetcher and headers into every page
//! - Resolving parents by name or by path
//! - Running pages depth-first, gated by their hooks
//! - Assembling the nested result tree
//! - Releasing the pool deterministically

pub mod hooks;
mod results;

pub use hooks::{after, before, sleep_before, AfterHook, BeforeHook, HookContext};
pub use results::{own_key, ResultTree, Results};

use crate::fetch::{Fetcher, Headers, HttpConfig, HttpFetcher};
use crate::page::{Bucket, Page, PageEnv};
use crate::pool::{CoroutinePool, TaskPool};
use crate::state::DedupRecords;
use crate::{PoolError, Result, WeaveError};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Parent label used in errors about root pages
const ROOT_LABEL: &str = "<root>";

/// Settings shared by every page of an orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Name of the pool and prefix of generated task names
    pub name: String,

    /// Upper bound on concurrently running fetch tasks
    pub max_concurrency: usize,

    /// Headers sent by pages without their own
    pub headers: Headers,

    /// Bound applied to every pending result; `None` waits indefinitely
    pub result_timeout: Option<Duration>,

    pub http: HttpConfig,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            name: "weave".to_string(),
            max_concurrency: 8,
            headers: Headers::new(),
            result_timeout: None,
            http: HttpConfig::default(),
        }
    }
}

/// Owns the page forest, the shared pool and the seen-URL records
pub struct Orchestrator {
    settings: OrchestratorSettings,
    pool: Arc<dyn TaskPool>,
    fetcher: Arc<dyn Fetcher>,
    roots: IndexMap<String, Page>,
    records: DedupRecords,
    closed: bool,
}

impl Orchestrator {
    /// Creates an orchestrator backed by a [`CoroutinePool`] and an [`HttpFetcher`]
    ///
    /// # Arguments
    ///
    /// * `settings` - Pool size, shared headers, timeouts
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to accept pages
    /// * `Err(WeaveError)` - The HTTP client could not be built
    pub fn new(settings: OrchestratorSettings) -> Result<Self> {
        let pool = Arc::new(CoroutinePool::new(
            settings.name.clone(),
            settings.max_concurrency,
        ));
        let fetcher = Arc::new(HttpFetcher::new(&settings.http)?);
        Ok(Self::with_parts(pool, fetcher, settings))
    }

    /// Creates an orchestrator over caller-supplied collaborators
    pub fn with_parts(
        pool: Arc<dyn TaskPool>,
        fetcher: Arc<dyn Fetcher>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            settings,
            pool,
            fetcher,
            roots: IndexMap::new(),
            records: DedupRecords::new(),
            closed: false,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn pool(&self) -> &Arc<dyn TaskPool> {
        &self.pool
    }

    pub fn records(&self) -> &DedupRecords {
        &self.records
    }

    /// Root pages in insertion order
    pub fn roots(&self) -> &IndexMap<String, Page> {
        &self.roots
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn env(&self) -> PageEnv {
        PageEnv {
            pool: Arc::clone(&self.pool),
            fetcher: Arc::clone(&self.fetcher),
            headers: self.settings.headers.clone(),
            result_timeout: self.settings.result_timeout,
        }
    }

    /// Adds `page` under the first page named `parent`, or as a root
    ///
    /// The parent is found depth-first in insertion order, so with repeated
    /// names the earliest match wins; use [`Orchestrator::add_page_at`] to be
    /// explicit. A sibling with the same name is rejected, and so is a root
    /// that would read a parent's result.
    pub fn add_page(
        &mut self,
        page: Page,
        parent: Option<&str>,
        name: &str,
        before: Option<BeforeHook>,
        after: Option<AfterHook>,
    ) -> Result<&mut Self> {
        let page = self.prepare(page, name, before, after);
        match parent {
            None => self.insert_root(page)?,
            Some(parent_name) => {
                let parent = find_mut(&mut self.roots, parent_name)
                    .ok_or_else(|| WeaveError::UnknownParent(parent_name.to_string()))?;
                insert_child(parent, page)?;
            }
        }
        Ok(self)
    }

    /// Adds `page` under the page at `parent_path`; an empty path adds a root
    ///
    /// A root must have its own URLs: pages reading their parent's result
    /// are rejected with `MissingInput`.
    pub fn add_page_at(
        &mut self,
        page: Page,
        parent_path: &[&str],
        name: &str,
        before: Option<BeforeHook>,
        after: Option<AfterHook>,
    ) -> Result<&mut Self> {
        let page = self.prepare(page, name, before, after);
        if parent_path.is_empty() {
            self.insert_root(page)?;
        } else {
            let parent = self
                .get_page_path_mut(parent_path)
                .ok_or_else(|| WeaveError::UnknownParent(parent_path.join("/")))?;
            insert_child(parent, page)?;
        }
        Ok(self)
    }

    fn prepare(
        &self,
        mut page: Page,
        name: &str,
        before: Option<BeforeHook>,
        after: Option<AfterHook>,
    ) -> Page {
        page.set_name(name.to_string());
        page.set_hooks(before, after);
        page.attach(self.env());
        page
    }

    fn insert_root(&mut self, mut page: Page) -> Result<()> {
        if page.requires_input() {
            return Err(WeaveError::MissingInput {
                page: page.name().to_string(),
            });
        }
        if self.roots.contains_key(page.name()) {
            return Err(WeaveError::DuplicateName {
                parent: ROOT_LABEL.to_string(),
                name: page.name().to_string(),
            });
        }
        page.set_parent(None);
        tracing::debug!("Added root page '{}'", page.name());
        self.roots.insert(page.name().to_string(), page);
        Ok(())
    }

    /// First page named `name`, depth-first in insertion order
    pub fn get_page(&self, name: &str) -> Option<&Page> {
        find(&self.roots, name)
    }

    pub fn get_page_mut(&mut self, name: &str) -> Option<&mut Page> {
        find_mut(&mut self.roots, name)
    }

    /// Page at `path`, starting from a root name
    pub fn get_page_path(&self, path: &[&str]) -> Option<&Page> {
        let (first, rest) = path.split_first()?;
        let mut page = self.roots.get(*first)?;
        for name in rest {
            page = page.child(name)?;
        }
        Some(page)
    }

    pub fn get_page_path_mut(&mut self, path: &[&str]) -> Option<&mut Page> {
        find_path_mut(&mut self.roots, path)
    }

    /// Starts the pool and performs the whole forest
    ///
    /// Roots run in insertion order, each followed depth-first by its
    /// subtree. The first page error aborts the run; the pool stays usable
    /// until [`Orchestrator::close`]. Running again appends to every page's
    /// result.
    pub fn run(&mut self) -> Result<Results> {
        self.ensure_open()?;
        self.pool.start()?;
        tracing::info!(
            "Running {} with {} root pages",
            self.settings.name,
            self.roots.len()
        );

        let mut walk = Walk {
            pool: &self.pool,
            headers: &self.settings.headers,
            records: &mut self.records,
        };
        let mut results = Results::new();
        for (name, page) in self.roots.iter_mut() {
            if let Some(tree) = walk.visit(page, None)? {
                results.insert(name.clone(), tree);
            }
        }

        tracing::info!(
            "Run of {} finished, {} URLs seen, {} tasks pending",
            self.settings.name,
            self.records.len(),
            self.pool.pending_count()
        );
        Ok(results)
    }

    /// Performs the page at `path` once more, fed with its parent's result
    ///
    /// Hooks and children are not run.
    pub fn perform_page(&mut self, path: &[&str]) -> Result<&[Bucket]> {
        self.ensure_open()?;
        self.pool.start()?;

        let label = path.join("/");
        let input: Option<Vec<Bucket>> = match path.split_last() {
            Some((_, parent_path)) if !parent_path.is_empty() => {
                let parent = self
                    .get_page_path(parent_path)
                    .ok_or_else(|| WeaveError::UnknownParent(parent_path.join("/")))?;
                Some(parent.result().to_vec())
            }
            _ => None,
        };

        let page = find_path_mut(&mut self.roots, path)
            .ok_or_else(|| WeaveError::UnknownParent(label))?;
        page.perform(input.as_deref(), &mut self.records)
    }

    /// Clears every page's result and state plus the seen-URL records
    pub fn reset(&mut self) {
        for page in self.roots.values_mut() {
            page.reset();
        }
        self.records.clear();
        tracing::debug!("Reset {}", self.settings.name);
    }

    /// Shuts down the pool; safe to call repeatedly
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.pool.close();
        self.closed = true;
        tracing::info!("Closed {}", self.settings.name);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(PoolError::Closed.into())
        } else {
            Ok(())
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.close();
    }
}

/// State carried down one depth-first run
struct Walk<'a> {
    pool: &'a Arc<dyn TaskPool>,
    headers: &'a Headers,
    records: &'a mut DedupRecords,
}

impl Walk<'_> {
    /// Runs `page` and its subtree, returning `None` when the gate declined
    fn visit(&mut self, page: &mut Page, input: Option<&[Bucket]>) -> Result<Option<ResultTree>> {
        if let Some(gate) = page.before_hook() {
            let allowed = gate(page, &self.context());
            if !allowed {
                tracing::info!("Skipping page '{}' and its subtree", page.path());
                page.mark_skipped()?;
                return Ok(None);
            }
        }

        page.perform(input, self.records)?;

        if let Some(hook) = page.after_hook() {
            hook(page, &self.context());
        }

        let name = page.name().to_string();
        let (own, children) = page.result_and_children_mut();
        if children.is_empty() {
            return Ok(Some(ResultTree::Leaf(own.to_vec())));
        }

        let mut branch = Results::new();
        branch.insert(own_key(&name), ResultTree::Leaf(own.to_vec()));
        for (child_name, child) in children.iter_mut() {
            if let Some(tree) = self.visit(child, Some(own))? {
                branch.insert(child_name.clone(), tree);
            }
        }
        Ok(Some(ResultTree::Branch(branch)))
    }

    fn context(&self) -> HookContext<'_> {
        HookContext {
            pool: self.pool,
            headers: self.headers,
            records: &*self.records,
        }
    }
}

fn find<'a>(pages: &'a IndexMap<String, Page>, name: &str) -> Option<&'a Page> {
    for page in pages.values() {
        if page.name() == name {
            return Some(page);
        }
        if let Some(found) = find(page.children(), name) {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a>(pages: &'a mut IndexMap<String, Page>, name: &str) -> Option<&'a mut Page> {
    for page in pages.values_mut() {
        if page.name() == name {
            return Some(page);
        }
        if let Some(found) = find_mut(page.children_mut(), name) {
            return Some(found);
        }
    }
    None
}

fn find_path_mut<'a>(pages: &'a mut IndexMap<String, Page>, path: &[&str]) -> Option<&'a mut Page> {
    let (first, rest) = path.split_first()?;
    let page = pages.get_mut(*first)?;
    if rest.is_empty() {
        Some(page)
    } else {
        find_path_mut(page.children_mut(), rest)
    }
}

fn insert_child(parent: &mut Page, page: Page) -> Result<()> {
    if parent.child(page.name()).is_some() {
        return Err(WeaveError::DuplicateName {
            parent: parent.path().to_string(),
            name: page.name().to_string(),
        });
    }
    tracing::debug!("Added page '{}' under '{}'", page.name(), parent.path());
    let name = page.name().to_string();
    parent.add_child(name, page);
    Ok(())
}
