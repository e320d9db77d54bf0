//! Search and retrieval over session snapshots.
//!
//! Session acquisition failures (missing configuration, gate timeout)
//! propagate. Anything that goes wrong after a snapshot is taken is
//! logged and reported as an empty or absent result.

use crate::core::error::{Result, ShelfError};
use crate::core::search::collector::{resolve_sorts, SortedCollector};
use crate::core::search::filter::SearchRequest;
use crate::core::search::query::QueryCompiler;
use crate::core::storage::{DocumentMapper, IndexSession, SessionRegistry};
use crate::core::types::{IndexResult, SearchHit, SearchResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{TantivyDocument, Term};

/// Executes requests against the current snapshot of an index
pub struct SearchEngine {
    sessions: Arc<SessionRegistry>,
    mapper: Arc<dyn DocumentMapper>,
}

impl SearchEngine {
    pub fn new(sessions: Arc<SessionRegistry>, mapper: Arc<dyn DocumentMapper>) -> Self {
        Self { sessions, mapper }
    }

    /// Execute a request against `index_name`
    pub async fn execute(
        &self,
        index_name: &str,
        request: &SearchRequest,
    ) -> Result<SearchResult<Value>> {
        let session = self.sessions.session(index_name).await?;
        let mapper = Arc::clone(&self.mapper);
        let request = request.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            search_snapshot(&session, &request, mapper.as_ref())
        })
        .await
        .map_err(|e| ShelfError::Search(format!("Search task failed: {e}")))
        .and_then(|result| result);

        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!("Could not perform search against index '{}': {}", index_name, e);
                Ok(SearchResult::empty())
            }
        }
    }

    /// Exact lookup on the configured key field
    pub async fn get_document_by_id(
        &self,
        index_name: &str,
        id: &str,
    ) -> Result<IndexResult<Value>> {
        let session = self.sessions.session(index_name).await?;
        let mapper = Arc::clone(&self.mapper);
        let id_owned = id.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            lookup_snapshot(&session, &id_owned, mapper.as_ref())
        })
        .await
        .map_err(|e| ShelfError::Search(format!("Lookup task failed: {e}")))
        .and_then(|result| result);

        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!(
                    "Could not get document for id {} in index '{}': {}",
                    id,
                    index_name,
                    e
                );
                Ok(IndexResult::absent())
            }
        }
    }
}

/// Run a request against a fresh snapshot of `session`.
///
/// The snapshot is dropped on every return path.
pub fn search_snapshot(
    session: &IndexSession,
    request: &SearchRequest,
    mapper: &dyn DocumentMapper,
) -> Result<SearchResult<Value>> {
    let start = Instant::now();
    let searcher = session.searcher();
    let schema = searcher.schema();

    let query = QueryCompiler::new(session.index(), schema).compile(&request.filters)?;
    let sorts = resolve_sorts(schema, &request.sorts)?;
    let collector = SortedCollector::new(sorts, session.config().result_cap);

    let collected = searcher
        .search(&query, &collector)
        .map_err(|e| ShelfError::Search(format!("Search execution failed: {e}")))?;

    let window = request.window(collected.hits.len());
    let mut hits = Vec::with_capacity(window.len());
    for collected_hit in &collected.hits[window] {
        let doc: TantivyDocument = searcher
            .doc(collected_hit.address)
            .map_err(|e| ShelfError::Search(format!("Failed to retrieve document: {e}")))?;
        hits.push(SearchHit {
            hit: mapper.from_document(&doc, schema)?,
            score: collected_hit.score,
        });
    }

    tracing::debug!(
        "Search on '{}': {} matches, {} returned in {}ms",
        session.index_name(),
        collected.count,
        hits.len(),
        start.elapsed().as_millis()
    );

    Ok(SearchResult {
        hits,
        count: collected.count,
        max_score: collected.max_score,
    })
}

/// First document whose key field equals `id`
pub fn lookup_snapshot(
    session: &IndexSession,
    id: &str,
    mapper: &dyn DocumentMapper,
) -> Result<IndexResult<Value>> {
    let searcher = session.searcher();
    let schema = searcher.schema();
    let key_field = &session.config().schema.key_field;

    let field = schema
        .get_field(key_field)
        .map_err(|e| ShelfError::Search(format!("Missing key field '{key_field}': {e}")))?;
    let query = TermQuery::new(Term::from_field_text(field, id), IndexRecordOption::Basic);

    let top = searcher
        .search(&query, &TopDocs::with_limit(1))
        .map_err(|e| ShelfError::Search(format!("Lookup failed: {e}")))?;

    let Some((score, address)) = top.into_iter().next() else {
        return Ok(IndexResult::absent());
    };

    let doc: TantivyDocument = searcher
        .doc(address)
        .map_err(|e| ShelfError::Search(format!("Failed to retrieve document: {e}")))?;

    Ok(IndexResult::found(mapper.from_document(&doc, schema)?, score))
}
