//! Page nodes of the crawl graph
//!
//! A page produces a two-level result: one bucket per fetched page, each
//! holding the items of the one kind this node extracts. Variants are a closed
//! set dispatched through [`Page::perform`]:
//!
//! - `Fetch`: submits URLs to the pool, yielding pending results
//! - `Paginated`: like `Fetch`, discovering URLs page index by page index
//! - `Download`: submits download-and-persist tasks
//! - `Extract`: resolves its input and queries the returned HTML

mod download;
mod extract;
mod fetch;
mod naming;
mod paginated;

pub use download::DownloadNode;
pub use extract::ExtractNode;
pub use fetch::{FetchNode, UrlSource};
pub use naming::{sanitize_file_name, url_basename};
pub use paginated::{url_template, PaginatedFetchNode, UrlFn};

use crate::extract::MatchedElement;
use crate::fetch::{Fetcher, Headers};
use crate::orchestrator::{AfterHook, BeforeHook};
use crate::pool::{AsyncResult, Payload, TaskPool, TaskStatus};
use crate::state::{DedupRecords, NodeState};
use crate::{Result, WeaveError};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One entry of a page-bucket
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A URL or extracted text
    Text(String),

    /// A matched HTML element
    Element(MatchedElement),

    /// A fetch still owned by the pool
    Pending(AsyncResult),
}

impl Item {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_pending(&self) -> Option<&AsyncResult> {
        match self {
            Self::Pending(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Interprets the item as a link to follow
    ///
    /// Text is taken as-is; elements contribute their `href`, then `src`.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.trim()),
            Self::Element(element) => element.attr("href").or_else(|| element.attr("src")),
            Self::Pending(_) => None,
        }
    }
}

impl From<String> for Item {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Item {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Element(element) => element.serialize(serializer),
            Self::Pending(result) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("task", result.id().as_str())?;
                match result.status() {
                    TaskStatus::NotFinished => map.serialize_entry("status", "pending")?,
                    TaskStatus::NotSucceeded(failure) => {
                        map.serialize_entry("status", "failed")?;
                        map.serialize_entry("error", &failure.to_string())?;
                    }
                    TaskStatus::Finished(payload) => {
                        map.serialize_entry("status", "finished")?;
                        match payload {
                            Payload::Saved(path) => {
                                map.serialize_entry("path", &path.display().to_string())?
                            }
                            Payload::Text(text) => map.serialize_entry("bytes", &text.len())?,
                            Payload::Bytes(bytes) => map.serialize_entry("bytes", &bytes.len())?,
                        }
                    }
                }
                map.end()
            }
        }
    }
}

/// Items belonging to one fetched page
pub type Bucket = Vec<Item>;

/// Names from a root page down to one node
///
/// Used as the non-owning parent reference: the forest owns every page, a
/// child only remembers where its parent sits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Collaborators a page needs to submit work
///
/// Injected by the orchestrator when the page is added.
#[derive(Clone)]
pub struct PageEnv {
    pub pool: Arc<dyn TaskPool>,
    pub fetcher: Arc<dyn Fetcher>,
    pub headers: Headers,
    pub result_timeout: Option<Duration>,
}

/// Node-specific behavior
pub enum PageKind {
    Fetch(FetchNode),
    Paginated(PaginatedFetchNode),
    Download(DownloadNode),
    Extract(ExtractNode),
}

impl PageKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Paginated(_) => "paginated",
            Self::Download(_) => "download",
            Self::Extract(_) => "extract",
        }
    }
}

impl From<FetchNode> for PageKind {
    fn from(node: FetchNode) -> Self {
        Self::Fetch(node)
    }
}

impl From<PaginatedFetchNode> for PageKind {
    fn from(node: PaginatedFetchNode) -> Self {
        Self::Paginated(node)
    }
}

impl From<DownloadNode> for PageKind {
    fn from(node: DownloadNode) -> Self {
        Self::Download(node)
    }
}

impl From<ExtractNode> for PageKind {
    fn from(node: ExtractNode) -> Self {
        Self::Extract(node)
    }
}

/// What a fetch-type node sees while submitting
pub(crate) struct SubmitContext<'a> {
    pub page: &'a str,
    pub env: &'a PageEnv,
    pub fetcher: Arc<dyn Fetcher>,
    pub headers: &'a Headers,
    pub ignore_dedup: bool,
    pub records: &'a mut DedupRecords,
    /// Buckets already in the page's result before this parse
    pub existing: &'a [Bucket],
}

/// A node in the crawl graph
pub struct Page {
    name: String,
    kind: PageKind,
    result: Vec<Bucket>,
    parent: Option<NodePath>,
    children: IndexMap<String, Page>,
    before_hook: Option<BeforeHook>,
    after_hook: Option<AfterHook>,
    ignore_dedup: bool,
    headers: Option<Headers>,
    env: Option<PageEnv>,
    state: NodeState,
}

impl Page {
    pub fn new(kind: impl Into<PageKind>) -> Self {
        Self {
            name: String::new(),
            kind: kind.into(),
            result: Vec::new(),
            parent: None,
            children: IndexMap::new(),
            before_hook: None,
            after_hook: None,
            ignore_dedup: false,
            headers: None,
            env: None,
            state: NodeState::Unstarted,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Bypasses the orchestrator-wide seen-URL set for this node
    pub fn ignore_dedup(mut self, ignore: bool) -> Self {
        self.ignore_dedup = ignore;
        self
    }

    /// Headers used instead of the orchestrator's shared set
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PageKind {
        &self.kind
    }

    pub fn result(&self) -> &[Bucket] {
        &self.result
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn parent(&self) -> Option<&NodePath> {
        self.parent.as_ref()
    }

    /// Path of this page from its root
    pub fn path(&self) -> NodePath {
        match &self.parent {
            Some(parent) => parent.child(self.name.clone()),
            None => NodePath::root(self.name.clone()),
        }
    }

    pub fn children(&self) -> &IndexMap<String, Page> {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut IndexMap<String, Page> {
        &mut self.children
    }

    pub fn child(&self, name: &str) -> Option<&Page> {
        self.children.get(name)
    }

    /// Own result next to mutable children, for feeding one into the other
    pub(crate) fn result_and_children_mut(&mut self) -> (&[Bucket], &mut IndexMap<String, Page>) {
        (&self.result, &mut self.children)
    }

    pub fn is_ignoring_dedup(&self) -> bool {
        self.ignore_dedup
    }

    /// Whether this page can only run fed with a parent's result
    pub fn requires_input(&self) -> bool {
        match &self.kind {
            PageKind::Extract(_) => true,
            PageKind::Fetch(node) => *node.urls() == UrlSource::Parent,
            PageKind::Download(node) => *node.urls() == UrlSource::Parent,
            PageKind::Paginated(_) => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.env.is_some()
    }

    pub fn before_hook(&self) -> Option<&BeforeHook> {
        self.before_hook.as_ref()
    }

    pub fn after_hook(&self) -> Option<&AfterHook> {
        self.after_hook.as_ref()
    }

    pub fn set_hooks(&mut self, before: Option<BeforeHook>, after: Option<AfterHook>) {
        self.before_hook = before;
        self.after_hook = after;
    }

    /// Headers this page sends: its own override, else the injected set
    pub fn effective_headers(&self) -> Headers {
        match (&self.headers, &self.env) {
            (Some(headers), _) => headers.clone(),
            (None, Some(env)) => env.headers.clone(),
            (None, None) => Headers::new(),
        }
    }

    /// Injects collaborators into this page and its whole subtree
    pub fn attach(&mut self, env: PageEnv) {
        for child in self.children.values_mut() {
            child.attach(env.clone());
        }
        self.env = Some(env);
    }

    /// Registers `page` as a child under `name`
    ///
    /// An existing child with the same name is replaced and returned; the
    /// replacement is logged. The orchestrator's `add_page` refuses
    /// duplicates instead.
    pub fn add_child(&mut self, name: impl Into<String>, mut page: Page) -> Option<Page> {
        let name = name.into();
        page.name = name.clone();
        page.set_parent(Some(self.path()));
        if page.env.is_none() {
            if let Some(env) = &self.env {
                page.attach(env.clone());
            }
        }

        let replaced = self.children.insert(name.clone(), page);
        if replaced.is_some() {
            tracing::warn!("Page '{}' replaced existing child '{}'", self.name, name);
        }
        replaced
    }

    /// Moves this page under `parent`, rewriting descendant paths
    pub(crate) fn set_parent(&mut self, parent: Option<NodePath>) {
        self.parent = parent;
        let own = self.path();
        for child in self.children.values_mut() {
            child.set_parent(Some(own.clone()));
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
        self.set_parent(self.parent.clone());
    }

    /// Computes fresh buckets from `input` without touching `result`
    ///
    /// `input` is the parent's result. Nodes with a literal URL source ignore
    /// it; nodes deriving from their parent fail with `MissingInput` when it
    /// is absent.
    pub fn parse(
        &self,
        input: Option<&[Bucket]>,
        records: &mut DedupRecords,
    ) -> Result<Vec<Bucket>> {
        let headers = self.effective_headers();
        match &self.kind {
            PageKind::Extract(node) => {
                let input = input.ok_or_else(|| WeaveError::MissingInput {
                    page: self.name.clone(),
                })?;
                Ok(node.parse(input, &self.name))
            }
            PageKind::Fetch(node) => node.parse(input, &mut self.submit_context(&headers, records)?),
            PageKind::Paginated(node) => node.parse(&mut self.submit_context(&headers, records)?),
            PageKind::Download(node) => {
                node.parse(input, &mut self.submit_context(&headers, records)?)
            }
        }
    }

    fn submit_context<'a>(
        &'a self,
        headers: &'a Headers,
        records: &'a mut DedupRecords,
    ) -> Result<SubmitContext<'a>> {
        let env = self.env.as_ref().ok_or_else(|| WeaveError::Detached {
            page: self.name.clone(),
        })?;
        Ok(SubmitContext {
            page: &self.name,
            env,
            fetcher: Arc::clone(&env.fetcher),
            headers,
            ignore_dedup: self.ignore_dedup,
            records,
            existing: &self.result,
        })
    }

    /// Refines freshly parsed buckets; identity except for extract nodes
    pub fn postprocess(&self, buckets: Vec<Bucket>) -> Vec<Bucket> {
        match &self.kind {
            PageKind::Extract(node) => node.postprocess(buckets),
            _ => buckets,
        }
    }

    /// Runs parse then postprocess and appends the new buckets to `result`
    ///
    /// Performing a page again appends again; call [`Page::reset`] for a
    /// clean slate.
    pub fn perform(
        &mut self,
        input: Option<&[Bucket]>,
        records: &mut DedupRecords,
    ) -> Result<&[Bucket]> {
        self.transition(NodeState::Parsing)?;
        tracing::debug!("Performing {} page '{}'", self.kind.kind_name(), self.name);

        let fresh = match self.parse(input, records) {
            Ok(fresh) => fresh,
            Err(e) => {
                self.state = NodeState::Failed;
                return Err(e);
            }
        };

        self.transition(NodeState::Postprocessing)?;
        let fresh = self.postprocess(fresh);
        tracing::debug!(
            "Page '{}' produced {} buckets, {} items",
            self.name,
            fresh.len(),
            fresh.iter().map(Vec::len).sum::<usize>()
        );

        self.result.extend(fresh);
        self.transition(NodeState::Done)?;
        Ok(&self.result)
    }

    /// Records that the before hook declined this page
    pub(crate) fn mark_skipped(&mut self) -> Result<()> {
        self.transition(NodeState::Skipped)
    }

    /// Clears results and states of this page and its subtree
    pub fn reset(&mut self) {
        self.result.clear();
        self.state = NodeState::Unstarted;
        for child in self.children.values_mut() {
            child.reset();
        }
    }

    fn transition(&mut self, next: NodeState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(WeaveError::InvalidTransition {
                page: self.name.clone(),
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Page '{}': {} -> {}", self.name, self.state, next);
        self.state = next;
        Ok(())
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("kind", &self.kind.kind_name())
            .field("state", &self.state)
            .field("buckets", &self.result.len())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}
