//! Fluent query composition.
//!
//! ```no_run
//! # use shelf::core::search::{Predicate, SortDirection, SortValueType};
//! # use shelf::core::provider::IndexProvider;
//! # async fn demo(provider: &IndexProvider) -> shelf::Result<()> {
//! let result = provider
//!     .search()
//!     .must(Predicate::term("TagIds", "11"))
//!     .sort_by("PublishedDate", SortDirection::Descending, SortValueType::Date)
//!     .paged(1, 10)
//!     .list_result_for("BlogPost")
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::core::error::Result;
use crate::core::search::engine::SearchEngine;
use crate::core::search::filter::{
    Predicate, QueryFilter, SearchRequest, SortDirection, SortSpec, SortValueType,
};
use crate::core::types::{Entity, IndexResult, SearchResult};
use serde_json::Value;
use std::sync::Arc;

/// Accumulates filters, sorts and paging; runs nothing until a terminal call
#[derive(Clone)]
pub struct QueryComposer {
    engine: Arc<SearchEngine>,
    request: SearchRequest,
}

impl QueryComposer {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self {
            engine,
            request: SearchRequest::default(),
        }
    }

    pub fn must(mut self, predicate: Predicate) -> Self {
        self.request.filters.push(QueryFilter::must(predicate));
        self
    }

    pub fn should(mut self, predicate: Predicate) -> Self {
        self.request.filters.push(QueryFilter::should(predicate));
        self
    }

    pub fn must_not(mut self, predicate: Predicate) -> Self {
        self.request.filters.push(QueryFilter::must_not(predicate));
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.request.filters.push(filter);
        self
    }

    /// Add a sort; earlier sorts take precedence
    pub fn sort_by(
        mut self,
        field: impl Into<String>,
        direction: SortDirection,
        value_type: SortValueType,
    ) -> Self {
        self.request
            .sorts
            .push(SortSpec::new(field, direction, value_type));
        self
    }

    /// 1-based page of `page_size` hits
    pub fn paged(mut self, page: usize, page_size: usize) -> Self {
        self.request.page = Some(page);
        self.request.page_size = Some(page_size);
        self
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub async fn list_result<T: Entity>(&self) -> Result<SearchResult<T>> {
        Ok(self.list_result_for(T::INDEX).await?.into_typed())
    }

    pub async fn list_result_for(&self, index_name: &str) -> Result<SearchResult<Value>> {
        self.engine.execute(index_name, &self.request).await
    }

    pub async fn single_result<T: Entity>(&self) -> Result<IndexResult<T>> {
        Ok(self.single_result_for(T::INDEX).await?.into_typed())
    }

    /// First hit of the executed request (paging and sorting still apply)
    pub async fn single_result_for(&self, index_name: &str) -> Result<IndexResult<Value>> {
        let result = self.list_result_for(index_name).await?;
        Ok(match result.hits.into_iter().next() {
            Some(first) => IndexResult::found(first.hit, first.score),
            None => IndexResult::absent(),
        })
    }

    pub async fn any<T: Entity>(&self) -> Result<bool> {
        self.any_for(T::INDEX).await
    }

    /// Whether the executed request returns at least one hit
    pub async fn any_for(&self, index_name: &str) -> Result<bool> {
        Ok(!self.list_result_for(index_name).await?.is_empty())
    }
}

impl std::fmt::Debug for QueryComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryComposer")
            .field("request", &self.request)
            .finish()
    }
}
