//! Case-insensitive label/notes search across all pages.
//!
//! # Invariants
//! - Blank queries return no hits.
//! - Hits follow page order, then node order within a page.
//! - At most `MAX_SEARCH_HITS` hits are returned.

use crate::graph::workspace::Workspace;
use crate::model::node::NodeId;
use crate::model::page::PageId;
use regex::{Regex, RegexBuilder};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_SEARCH_HITS: usize = 20;

const PREVIEW_CHARS_BEFORE: usize = 20;
const PREVIEW_CHARS_FROM_MATCH: usize = 40;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Query could not be compiled into a matcher.
    InvalidQuery { query_len: usize, message: String },
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query_len, message } => {
                write!(f, "invalid search query ({query_len} chars): {message}")
            }
        }
    }
}

impl Error for SearchError {}

/// One matching node.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub page_id: PageId,
    pub page_name: String,
    pub node_id: NodeId,
    pub label: String,
    pub label_matched: bool,
    /// Context around the first notes match, when the notes matched.
    pub preview: Option<String>,
}

/// Finds nodes whose label or notes contain `query`, ignoring case.
pub fn search(workspace: &Workspace, query: &str) -> SearchResult<Vec<SearchHit>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let matcher = build_matcher(query)?;

    let mut hits = Vec::new();
    for page in workspace.pages() {
        for node in &page.nodes {
            let label_matched = matcher.is_match(&node.label);
            let preview = matcher
                .find(&node.notes)
                .map(|found| notes_preview(&node.notes, found.start()));
            if !label_matched && preview.is_none() {
                continue;
            }
            hits.push(SearchHit {
                page_id: page.id,
                page_name: page.name.clone(),
                node_id: node.id,
                label: node.label.clone(),
                label_matched,
                preview,
            });
            if hits.len() == MAX_SEARCH_HITS {
                return Ok(hits);
            }
        }
    }
    Ok(hits)
}

fn build_matcher(query: &str) -> SearchResult<Regex> {
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .map_err(|err| SearchError::InvalidQuery {
            query_len: query.chars().count(),
            message: err.to_string(),
        })
}

fn notes_preview(notes: &str, match_start: usize) -> String {
    let before: Vec<char> = notes[..match_start]
        .chars()
        .rev()
        .take(PREVIEW_CHARS_BEFORE)
        .collect();
    let mut preview = String::from("...");
    preview.extend(before.into_iter().rev());
    preview.extend(notes[match_start..].chars().take(PREVIEW_CHARS_FROM_MATCH));
    preview.push_str("...");
    preview
}
