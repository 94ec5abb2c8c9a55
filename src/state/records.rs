use indexmap::IndexSet;

/// URLs already submitted by fetch pages of one orchestrator
///
/// Shared by the whole forest for the orchestrator's lifetime. Submission
/// only happens on the orchestrating thread, so the set needs no locking.
#[derive(Debug, Clone, Default)]
pub struct DedupRecords {
    seen: IndexSet<String>,
}

impl DedupRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url`, returning true if it had not been seen before
    pub fn insert(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }
        self.seen.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Seen URLs in first-submission order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
