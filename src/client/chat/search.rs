//! In-room message search state.

use crate::shared::message::Message;

/// Queries shorter than this clear the results instead of hitting the server
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchState {
    #[default]
    Idle,
    Searching,
    /// Number of results of the current query
    Results(usize),
    Error(String),
}

/// Search panel of a chat session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchView {
    pub active: bool,
    pub query: String,
    pub state: SearchState,
    /// Newest first
    pub results: Vec<Message>,
}

impl SearchView {
    pub(crate) fn clear_results(&mut self) {
        self.results.clear();
        self.state = SearchState::Idle;
    }
}

pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= MIN_QUERY_CHARS
}

pub fn sort_newest_first(results: &mut [Message]) {
    results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
