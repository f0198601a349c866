//! Query defaults

/// Defaults applied to every request a `SearchQuery` builds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryConfig {
    /// Index searched when the query does not set one
    pub index: Option<String>,

    /// Page size used when the query does not call `limit`
    pub default_limit: Option<usize>,

    /// Ask the engine for an exact hit count
    pub track_total_hits: bool,
}

impl QueryConfig {
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    pub fn with_track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = track;
        self
    }
}
