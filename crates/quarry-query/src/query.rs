//! The search query builder
//!
//! A `SearchQuery` accumulates filter clauses (through `where_field`), the
//! surrounding request parameters (index, paging, sorting, source filtering,
//! script fields) and listener registrations. `fetch_all` / `fetch_one`
//! compile everything into a `SearchRequest`, run it through the executor
//! and notify listeners.

use std::sync::Arc;

use quarry_core::{Clause, ClauseKind, FieldRef, FilterSet, Script, SortOrder};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::condition::Where;
use crate::config::QueryConfig;
use crate::error::{QueryError, Result};
use crate::executor::{SearchExecutor, SearchRequest, SearchResponse};
use crate::listener::{ListenerFailure, ListenerSet, SearchListener};

/// Mutable builder for one boolean search query
pub struct SearchQuery {
    executor: Arc<dyn SearchExecutor>,
    config: QueryConfig,

    /// Target index (falls back to `config.index`)
    index: Option<String>,

    filters: FilterSet,
    listeners: ListenerSet,

    /// Listener callbacks that failed during the latest execution
    listener_failures: Vec<ListenerFailure>,

    limit: Option<usize>,
    offset: Option<usize>,
    sort: Vec<(String, SortOrder)>,
    includes: Vec<String>,
    excludes: Vec<String>,
    script_fields: Vec<(String, Script)>,
}

impl SearchQuery {
    /// Create a query with default configuration
    pub fn new(executor: Arc<dyn SearchExecutor>) -> Self {
        Self::with_config(executor, QueryConfig::default())
    }

    /// Create a query with custom defaults
    pub fn with_config(executor: Arc<dyn SearchExecutor>, config: QueryConfig) -> Self {
        Self {
            executor,
            config,
            index: None,
            filters: FilterSet::new(),
            listeners: ListenerSet::new(),
            listener_failures: Vec::new(),
            limit: None,
            offset: None,
            sort: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            script_fields: Vec::new(),
        }
    }

    // ========================================================================
    // Filters
    // ========================================================================

    /// Start a condition on `field`.
    ///
    /// Pass a single name, or a list of names to match text across several
    /// fields. Nothing is added until a condition method is called.
    pub fn where_field(&mut self, field: impl Into<FieldRef>) -> Where<'_> {
        Where::new(self, field.into())
    }

    /// Append a clause to `must`. The body is not validated.
    pub fn add_filter(&mut self, kind: ClauseKind, body: Value) -> &mut Self {
        debug!("must += {} {}", kind, body);
        self.filters.push_must(Clause::new(kind, body));
        self
    }

    /// Append a clause to `must_not`. The body is not validated.
    pub fn add_not_filter(&mut self, kind: ClauseKind, body: Value) -> &mut Self {
        debug!("must_not += {} {}", kind, body);
        self.filters.push_must_not(Clause::new(kind, body));
        self
    }

    /// Filter with an engine-side script
    pub fn where_script(&mut self, script: &Script) -> &mut Self {
        self.add_filter(ClauseKind::Script, json!({ "script": script.to_json() }))
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Drop every accumulated clause; listeners and parameters are kept
    pub fn clear_filters(&mut self) -> &mut Self {
        self.filters.clear();
        self
    }

    // ========================================================================
    // Request parameters
    // ========================================================================

    pub fn set_index(&mut self, index: impl Into<String>) -> &mut Self {
        self.index = Some(index.into());
        self
    }

    /// The index requests go to, if any
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref().or(self.config.index.as_deref())
    }

    /// Maximum number of hits (`size`)
    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Number of hits to skip (`from`)
    pub fn offset(&mut self, offset: usize) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Replace the sort with a single field
    pub fn order_by(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        self.sort.clear();
        self.add_order_by(field, order)
    }

    /// Add a tie-breaking sort field after the existing ones
    pub fn add_order_by(&mut self, field: impl Into<String>, order: SortOrder) -> &mut Self {
        self.sort.push((field.into(), order));
        self
    }

    /// Return only these `_source` fields
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Leave these fields out of `_source`
    pub fn exclude<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Compute `name` per hit with `script`
    pub fn add_script_field(&mut self, name: impl Into<String>, script: Script) -> &mut Self {
        self.script_fields.push((name.into(), script));
        self
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Register a listener. Registering the same listener twice notifies it twice.
    pub fn add_listener(&mut self, listener: Arc<dyn SearchListener>) -> &mut Self {
        self.listeners.add(listener);
        self
    }

    /// Remove the first registration of `listener`; no-op if absent
    pub fn remove_listener(&mut self, listener: &Arc<dyn SearchListener>) -> &mut Self {
        if !self.listeners.remove(listener) {
            debug!("remove_listener: listener was not registered");
        }
        self
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    /// Listener callbacks that returned an error during the latest execution
    pub fn listener_failures(&self) -> &[ListenerFailure] {
        &self.listener_failures
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// The request body as it will be sent
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.filters.to_bool_query());

        if let Some(size) = self.limit.or(self.config.default_limit) {
            body.insert("size".to_string(), json!(size));
        }
        if let Some(from) = self.offset {
            body.insert("from".to_string(), json!(from));
        }

        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|(field, order)| json!({ field.as_str(): order.as_str() }))
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }

        if !self.includes.is_empty() || !self.excludes.is_empty() {
            let mut source = Map::new();
            if !self.includes.is_empty() {
                source.insert("includes".to_string(), json!(self.includes));
            }
            if !self.excludes.is_empty() {
                source.insert("excludes".to_string(), json!(self.excludes));
            }
            body.insert("_source".to_string(), Value::Object(source));
        }

        if !self.script_fields.is_empty() {
            let mut fields = Map::new();
            for (name, script) in &self.script_fields {
                fields.insert(name.clone(), json!({ "script": script.to_json() }));
            }
            body.insert("script_fields".to_string(), Value::Object(fields));
        }

        if self.config.track_total_hits {
            body.insert("track_total_hits".to_string(), Value::Bool(true));
        }

        Value::Object(body)
    }

    /// Index and body, ready for an executor
    pub fn to_request(&self) -> SearchRequest {
        SearchRequest {
            index: self.index().map(str::to_string),
            body: self.body(),
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute the query and return the raw response
    pub async fn fetch_all(&mut self) -> Result<SearchResponse> {
        let request = self.to_request();
        self.execute(request).await
    }

    /// Execute the query for a single hit and return it, if any
    pub async fn fetch_one(&mut self) -> Result<Option<Value>> {
        let mut request = self.to_request();
        request.body["size"] = json!(1);
        let response = self.execute(request).await?;
        Ok(response.hits().first().cloned())
    }

    async fn execute(&mut self, request: SearchRequest) -> Result<SearchResponse> {
        let executor = Arc::clone(&self.executor);
        debug!(
            "Executing search on {:?} via {} executor",
            request.index,
            executor.name()
        );

        self.listener_failures.clear();
        match executor.execute(&request).await {
            Ok(response) => {
                info!(
                    "Search returned {} hits (total {:?})",
                    response.hits().len(),
                    response.total()
                );
                self.listener_failures = self.listeners.notify_success(&response);
                Ok(response)
            }
            Err(e) => {
                error!("Search failed: {}", e);
                self.listener_failures = self.listeners.notify_error(&e);
                Err(QueryError::Execution(e))
            }
        }
    }
}

impl std::fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQuery")
            .field("executor", &self.executor.name())
            .field("index", &self.index())
            .field("filters", &self.filters)
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::error::{ListenerError, TransportError};
    use crate::executor::MemoryExecutor;

    fn alice_response() -> Value {
        json!({
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_id": "20",
                    "_source": {
                        "id": 20,
                        "title": "title Alice record",
                        "channels": [1, 2, 3],
                        "publicDate": "2017-01-01T00:00:00+03:00"
                    }
                }]
            }
        })
    }

    #[derive(Default)]
    struct CountingListener {
        successes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl CountingListener {
        fn successes(&self) -> usize {
            self.successes.load(Ordering::SeqCst)
        }

        fn errors(&self) -> usize {
            self.errors.load(Ordering::SeqCst)
        }
    }

    impl SearchListener for CountingListener {
        fn on_success(&self, _response: &SearchResponse) -> std::result::Result<(), ListenerError> {
            self.successes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_error(&self, _error: &TransportError) -> std::result::Result<(), ListenerError> {
            self.errors.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Records its name into a shared log and always fails
    struct BrokenListener {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SearchListener for BrokenListener {
        fn on_success(&self, _response: &SearchResponse) -> std::result::Result<(), ListenerError> {
            self.log.lock().unwrap().push(self.name);
            Err(ListenerError::failed("boom"))
        }

        fn on_error(&self, _error: &TransportError) -> std::result::Result<(), ListenerError> {
            self.log.lock().unwrap().push(self.name);
            Err(ListenerError::failed("boom"))
        }
    }

    /// Records "<name>:ok" / "<name>:err" into a shared log
    struct RecordingListener {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl SearchListener for RecordingListener {
        fn on_success(&self, _response: &SearchResponse) -> std::result::Result<(), ListenerError> {
            self.log.lock().unwrap().push(format!("{}:ok", self.name));
            Ok(())
        }

        fn on_error(&self, _error: &TransportError) -> std::result::Result<(), ListenerError> {
            self.log.lock().unwrap().push(format!("{}:err", self.name));
            Ok(())
        }
    }

    fn broken_script() -> Script {
        let mut script = Script::new();
        script.add_line("this script with error");
        script
    }

    #[test]
    fn test_empty_body() {
        let query = SearchQuery::new(Arc::new(MemoryExecutor::responding(json!({}))));
        assert_eq!(
            query.body(),
            json!({ "query": { "bool": { "must": [], "must_not": [] } } })
        );
    }

    #[test]
    fn test_full_body() {
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(json!({}))));
        query
            .set_index("posts")
            .limit(10)
            .offset(20)
            .order_by("publicDate", SortOrder::Desc)
            .add_order_by("id", SortOrder::Asc)
            .select(["id", "title"])
            .exclude(["body"]);
        query.where_field("channel").is_in([1, 2]).where_field("id").not(21);

        assert_eq!(query.index(), Some("posts"));
        assert_eq!(
            query.body(),
            json!({
                "query": {
                    "bool": {
                        "must": [{ "terms": { "channel": [1, 2] } }],
                        "must_not": [{ "term": { "id": 21 } }]
                    }
                },
                "size": 10,
                "from": 20,
                "sort": [{ "publicDate": "desc" }, { "id": "asc" }],
                "_source": { "includes": ["id", "title"], "excludes": ["body"] }
            })
        );
    }

    #[test]
    fn test_order_by_replaces_sort() {
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(json!({}))));
        query
            .add_order_by("a", SortOrder::Asc)
            .order_by("b", SortOrder::Desc);
        assert_eq!(query.body()["sort"], json!([{ "b": "desc" }]));
    }

    #[test]
    fn test_config_defaults() {
        let config = QueryConfig::default()
            .with_index("articles")
            .with_default_limit(50)
            .with_track_total_hits(true);
        let mut query = SearchQuery::with_config(
            Arc::new(MemoryExecutor::responding(json!({}))),
            config,
        );

        let request = query.to_request();
        assert_eq!(request.index.as_deref(), Some("articles"));
        assert_eq!(request.body["size"], json!(50));
        assert_eq!(request.body["track_total_hits"], json!(true));

        query.set_index("posts").limit(5);
        let request = query.to_request();
        assert_eq!(request.index.as_deref(), Some("posts"));
        assert_eq!(request.body["size"], json!(5));
    }

    #[test]
    fn test_script_filter_and_fields() {
        let mut script = Script::new();
        script.add_line("doc['id'].value > params.min").add_param("min", 10);

        let mut double = Script::new();
        double.add_line("doc['id'].value * 2");

        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(json!({}))));
        query.where_script(&script).add_script_field("double_id", double);

        let body = query.body();
        assert_eq!(
            body["query"]["bool"]["must"][0],
            json!({
                "script": {
                    "script": {
                        "source": "doc['id'].value > params.min",
                        "lang": "painless",
                        "params": { "min": 10 }
                    }
                }
            })
        );
        assert_eq!(
            body["script_fields"]["double_id"]["script"]["source"],
            json!("doc['id'].value * 2")
        );
    }

    #[test]
    fn test_add_filter_is_passthrough() {
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(json!({}))));
        query
            .add_filter(ClauseKind::Term, json!("not even an object"))
            .add_not_filter(ClauseKind::Range, json!(null));

        assert_eq!(query.filters().must[0].body, json!("not even an object"));
        assert_eq!(query.filters().must_not[0].body, json!(null));
    }

    #[test]
    fn test_clear_filters_keeps_listeners() {
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(json!({}))));
        query.add_listener(Arc::new(CountingListener::default()));
        query.where_field("a").equal(1);

        query.clear_filters();
        assert!(query.filters().is_empty());
        assert_eq!(query.listeners().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_sends_compiled_request() {
        let executor = Arc::new(MemoryExecutor::responding(alice_response()));
        let mut query = SearchQuery::new(executor.clone());
        query.set_index("test");
        query.where_field("title").match_text("Alice").where_field("channels").equal(2);

        let response = query.fetch_all().await.unwrap();
        assert_eq!(response.total(), Some(1));

        let sent = executor.last_request().unwrap();
        assert_eq!(sent.index.as_deref(), Some("test"));
        assert_eq!(sent.body, query.body());
    }

    #[tokio::test]
    async fn test_fetch_one_limits_size() {
        let executor = Arc::new(MemoryExecutor::responding(alice_response()));
        let mut query = SearchQuery::new(executor.clone());
        query.limit(100);

        let hit = query.fetch_one().await.unwrap().unwrap();
        assert_eq!(hit["_id"], json!("20"));
        assert_eq!(executor.last_request().unwrap().body["size"], json!(1));
        // The query itself keeps its own limit
        assert_eq!(query.body()["size"], json!(100));
    }

    #[tokio::test]
    async fn test_fetch_one_without_hits() {
        let executor = Arc::new(MemoryExecutor::responding(json!({ "hits": { "hits": [] } })));
        let mut query = SearchQuery::new(executor);
        assert_eq!(query.fetch_one().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_one_notifies_on_success() {
        let listener = Arc::new(CountingListener::default());
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(alice_response())));
        query.add_listener(listener.clone());

        let hit = query.fetch_one().await.unwrap();
        assert!(hit.is_some());
        assert_eq!(listener.successes(), 1);
        assert_eq!(listener.errors(), 0);
    }

    #[tokio::test]
    async fn test_fetch_one_notifies_on_error() {
        let listener = Arc::new(CountingListener::default());
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::failing(TransportError::Timeout)));
        query.add_listener(listener.clone());

        let err = query.fetch_one().await.unwrap_err();
        assert_eq!(err.transport(), &TransportError::Timeout);
        assert_eq!(listener.errors(), 1);
        assert_eq!(listener.successes(), 0);
    }

    #[tokio::test]
    async fn test_error_listeners_notified_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::failing(
            TransportError::Rejected {
                status: 500,
                reason: "shard failure".to_string(),
            },
        )));
        query
            .add_listener(Arc::new(RecordingListener {
                name: "first",
                log: Arc::clone(&log),
            }))
            .add_listener(Arc::new(RecordingListener {
                name: "second",
                log: Arc::clone(&log),
            }));

        assert!(query.fetch_all().await.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["first:err", "second:err"]);
        assert!(query.listener_failures().is_empty());
    }

    #[tokio::test]
    async fn test_on_success_listener() {
        let listener = Arc::new(CountingListener::default());
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(alice_response())));
        query.add_listener(listener.clone());

        query.fetch_all().await.unwrap();
        assert_eq!(listener.successes(), 1);
        assert_eq!(listener.errors(), 0);
    }

    #[tokio::test]
    async fn test_on_error_listener() {
        let listener = Arc::new(CountingListener::default());
        let failure = TransportError::Rejected {
            status: 400,
            reason: "compile error".to_string(),
        };
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::failing(failure.clone())));
        query.where_script(&broken_script());
        query.add_listener(listener.clone());

        let err = query.fetch_all().await.unwrap_err();
        assert_eq!(err.transport(), &failure);
        assert_eq!(listener.errors(), 1);
        assert_eq!(listener.successes(), 0);
    }

    #[tokio::test]
    async fn test_remove_listener() {
        let counting = Arc::new(CountingListener::default());
        let listener: Arc<dyn SearchListener> = counting.clone();
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(alice_response())));
        query.add_listener(listener.clone());
        query.remove_listener(&listener);

        query.fetch_all().await.unwrap();
        assert_eq!(counting.successes(), 0);
        assert_eq!(counting.errors(), 0);
    }

    #[tokio::test]
    async fn test_removed_listener_not_called_on_error() {
        let counting = Arc::new(CountingListener::default());
        let listener: Arc<dyn SearchListener> = counting.clone();
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::failing(TransportError::Timeout)));
        query.add_listener(listener.clone()).remove_listener(&listener);

        assert!(query.fetch_all().await.is_err());
        assert_eq!(counting.successes(), 0);
        assert_eq!(counting.errors(), 0);
    }

    #[tokio::test]
    async fn test_broken_listener_does_not_mask_result() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let counting = Arc::new(CountingListener::default());
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(alice_response())));
        query
            .add_listener(Arc::new(BrokenListener {
                name: "first",
                log: Arc::clone(&log),
            }))
            .add_listener(counting.clone());

        let response = query.fetch_all().await.unwrap();
        assert_eq!(response.hits().len(), 1);
        assert_eq!(counting.successes(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert_eq!(query.listener_failures().len(), 1);
        assert_eq!(query.listener_failures()[0].position, 0);
    }

    #[tokio::test]
    async fn test_broken_listener_keeps_original_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::failing(
            TransportError::Connection("refused".to_string()),
        )));
        query
            .add_listener(Arc::new(BrokenListener {
                name: "a",
                log: Arc::clone(&log),
            }))
            .add_listener(Arc::new(BrokenListener {
                name: "b",
                log: Arc::clone(&log),
            }));

        let err = query.fetch_all().await.unwrap_err();
        assert_eq!(err.transport(), &TransportError::Connection("refused".to_string()));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(query.listener_failures().len(), 2);
    }

    #[tokio::test]
    async fn test_listener_failures_reset_per_execution() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let broken: Arc<dyn SearchListener> = Arc::new(BrokenListener {
            name: "a",
            log: Arc::clone(&log),
        });
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(alice_response())));
        query.add_listener(broken.clone());

        query.fetch_all().await.unwrap();
        assert_eq!(query.listener_failures().len(), 1);

        query.remove_listener(&broken);
        query.fetch_all().await.unwrap();
        assert!(query.listener_failures().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_listener_notified_per_registration() {
        let counting = Arc::new(CountingListener::default());
        let listener: Arc<dyn SearchListener> = counting.clone();
        let mut query = SearchQuery::new(Arc::new(MemoryExecutor::responding(alice_response())));
        query.add_listener(listener.clone()).add_listener(listener.clone());

        query.fetch_all().await.unwrap();
        assert_eq!(counting.successes(), 2);

        query.remove_listener(&listener);
        query.fetch_all().await.unwrap();
        assert_eq!(counting.successes(), 3);
    }
}
