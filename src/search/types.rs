use crate::index::FileEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// One flooding query as it travels between peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// Identifies the query across every hop; used for duplicate suppression.
    pub query_id: String,
    pub term: String,
    /// Remaining hop budget.
    pub ttl: u32,
    pub fanout: usize,
    /// Peers already traversed on this request's path.
    #[serde(default)]
    pub visited: BTreeSet<String>,
    /// Time the receiver has to answer, in milliseconds. Absent on a fresh
    /// query and from peers that do not send it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_ms: Option<u64>,
}

impl SearchRequest {
    /// Starts a new query with a fresh identifier and an empty path.
    pub fn new(term: &str, ttl: u32, fanout: usize) -> Self {
        Self {
            query_id: uuid::Uuid::new_v4().to_string(),
            term: term.to_string(),
            ttl,
            fanout,
            visited: BTreeSet::new(),
            budget_ms: None,
        }
    }

    pub fn with_query_id(mut self, query_id: &str) -> Self {
        self.query_id = query_id.to_string();
        self
    }

    /// The request one hop further along: same id and term, one less hop,
    /// and `via` added to the path.
    pub fn forwarded(&self, via: &str) -> Self {
        let mut visited = self.visited.clone();
        visited.insert(via.to_string());

        Self {
            query_id: self.query_id.clone(),
            term: self.term.clone(),
            ttl: self.ttl.saturating_sub(1),
            fanout: self.fanout,
            visited,
            budget_ms: self.budget_ms,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget_ms = Some(u64::try_from(budget.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget_ms.map(Duration::from_millis)
    }
}

/// A file found somewhere in the overlay, addressable through `peer_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub peer_url: String,
    pub file_name: String,
    pub size: u64,
    pub checksum: String,
    pub extension: String,
}

impl SearchResult {
    pub fn from_entry(peer_url: &str, entry: FileEntry) -> Self {
        Self {
            peer_url: peer_url.to_string(),
            file_name: entry.name,
            size: entry.size,
            checksum: entry.checksum,
            extension: entry.extension,
        }
    }
}

/// Reply to a forwarded query.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForwardResponse {
    pub query_id: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(alias = "q", default)]
    pub query: String,
    pub ttl: Option<u32>,
    pub fanout: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub query_id: String,
    pub ttl: u32,
    pub fanout_used: usize,
    pub count: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    pub peer: String,
    pub base: String,
    pub files: Vec<FileEntry>,
}
