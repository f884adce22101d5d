//! Paginated search execution.

use std::sync::Arc;

use bson::{Document, doc};

use crate::core::{DocumentStore, FindOptions};
use crate::error::{StorageResult, ValidationError};
use crate::search::SearchAdapter;
use crate::serializer::RecordSerializer;
use crate::types::{
    CollectionPage, Cursor, PaginationCodec, SearchPage, SortSpec, collection_listing_sort,
    default_item_sort,
};

/// Fields appended to every item sort so skip-based paging is deterministic.
const TIE_BREAKERS: &[&str] = &["id", "collection"];

/// Runs assembled searches against the store.
#[derive(Debug, Clone)]
pub struct SearchExecutor {
    store: Arc<dyn DocumentStore>,
    serializer: Arc<dyn RecordSerializer>,
    items_index: String,
    collections_index: String,
}

impl SearchExecutor {
    /// Creates an executor over the given namespaces.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        serializer: Arc<dyn RecordSerializer>,
        collections_index: impl Into<String>,
        items_index: impl Into<String>,
    ) -> Self {
        Self {
            store,
            serializer,
            items_index: items_index.into(),
            collections_index: collections_index.into(),
        }
    }

    /// Executes an item search and returns one page.
    ///
    /// The sort is `sort` when non-empty, else the adapter's sort, else
    /// ascending `id`. The total match count is computed only when `token` is
    /// absent; later pages report `matched: None`.
    pub async fn execute(
        &self,
        adapter: &SearchAdapter,
        limit: u64,
        token: Option<&str>,
        sort: Option<&SortSpec>,
        collection_ids: Option<&[String]>,
    ) -> StorageResult<SearchPage> {
        check_limit(limit)?;

        let query = compose_query(adapter, collection_ids);
        let sort = resolve_sort(sort, adapter.sort());
        let skip = match token {
            Some(token) => PaginationCodec::decode_offset(token)?,
            None => 0,
        };
        tracing::debug!(
            "Executing item search: query={} sort={} skip={} limit={}",
            query,
            sort,
            skip,
            limit
        );

        let options = FindOptions::new().sort(sort).skip(skip).limit(limit + 1);
        let mut documents = self
            .store
            .find(&self.items_index, query.clone(), options)
            .await
            .inspect_err(|e| tracing::error!("Item search in {} failed: {}", self.items_index, e))?;

        let next_token = if documents.len() as u64 > limit {
            documents.truncate(limit as usize);
            let token = PaginationCodec::encode(&Cursor::Offset(skip + limit));
            tracing::debug!("Next token (for next page): {}", token);
            Some(token)
        } else {
            None
        };

        let matched = if token.is_none() {
            let count = self
                .store
                .count(&self.items_index, query)
                .await
                .inspect_err(|e| tracing::error!("Item count in {} failed: {}", self.items_index, e))?;
            Some(count)
        } else {
            None
        };

        let items = documents
            .into_iter()
            .map(|d| self.serializer.item_from_db(d))
            .collect();

        Ok(SearchPage {
            items,
            matched,
            next_token,
        })
    }

    /// Lists collections ascending by id, resuming after the last-seen id.
    pub async fn list_collections(
        &self,
        token: Option<&str>,
        limit: u64,
    ) -> StorageResult<CollectionPage> {
        check_limit(limit)?;

        let query = match token {
            Some(token) => {
                let last_seen = PaginationCodec::decode_last_seen(token)?;
                doc! { "id": { "$gt": last_seen } }
            }
            None => Document::new(),
        };

        let options = FindOptions::new()
            .sort(collection_listing_sort())
            .limit(limit + 1);
        let mut documents = self
            .store
            .find(&self.collections_index, query, options)
            .await
            .inspect_err(|e| {
                tracing::error!("Collection listing in {} failed: {}", self.collections_index, e)
            })?;

        let next_token = if documents.len() as u64 > limit {
            documents.truncate(limit as usize);
            documents
                .last()
                .and_then(|d| d.get_str("id").ok())
                .map(|id| PaginationCodec::encode(&Cursor::LastSeen(id.to_string())))
        } else {
            None
        };
        if let Some(token) = &next_token {
            tracing::debug!("Next token (for next page): {}", token);
        }

        let collections = documents
            .into_iter()
            .map(|d| self.serializer.collection_from_db(d))
            .collect();

        Ok(CollectionPage {
            collections,
            next_token,
        })
    }
}

fn check_limit(limit: u64) -> Result<(), ValidationError> {
    if limit == 0 {
        return Err(ValidationError::InvalidLimit {
            limit,
            message: "limit must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// ANDs the adapter fragments with the optional collection restriction.
fn compose_query(adapter: &SearchAdapter, collection_ids: Option<&[String]>) -> Document {
    let mut query = adapter.to_query();
    if let Some(ids) = collection_ids
        && !ids.is_empty()
    {
        query.insert("collection", doc! { "$in": ids.to_vec() });
    }
    query
}

fn resolve_sort(explicit: Option<&SortSpec>, requested: &SortSpec) -> Document {
    let sort = match explicit {
        Some(sort) if !sort.is_empty() => sort.clone(),
        _ if !requested.is_empty() => requested.clone(),
        _ => default_item_sort(),
    };
    sort.with_tie_breakers(TIE_BREAKERS).to_document()
}
