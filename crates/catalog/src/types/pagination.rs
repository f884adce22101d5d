//! Pagination types and the continuation-token codec.
//!
//! Tokens are URL-safe base64 over a UTF-8 string. Search paging encodes the
//! decimal skip offset; collection listing encodes the last-seen collection id.
//! Tokens carry no server-side state.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SearchError;

/// Decoded form of a continuation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// Number of matching records to skip.
    Offset(u64),
    /// Id of the last record on the previous page.
    LastSeen(String),
}

/// Reversible codec between [`Cursor`] values and opaque tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationCodec;

impl PaginationCodec {
    /// Encodes a cursor into a token.
    pub fn encode(cursor: &Cursor) -> String {
        match cursor {
            Cursor::Offset(n) => URL_SAFE.encode(n.to_string()),
            Cursor::LastSeen(id) => URL_SAFE.encode(id),
        }
    }

    /// Decodes a search token into a skip offset.
    pub fn decode_offset(token: &str) -> Result<u64, SearchError> {
        let raw = Self::decode_raw(token)?;
        raw.parse::<u64>().map_err(|_| invalid(token))
    }

    /// Decodes a listing token into the last-seen id.
    pub fn decode_last_seen(token: &str) -> Result<String, SearchError> {
        let raw = Self::decode_raw(token)?;
        if raw.is_empty() {
            return Err(invalid(token));
        }
        Ok(raw)
    }

    /// Decodes a token into the string it wraps.
    fn decode_raw(token: &str) -> Result<String, SearchError> {
        let bytes = URL_SAFE.decode(token).map_err(|_| invalid(token))?;
        String::from_utf8(bytes).map_err(|_| invalid(token))
    }
}

fn invalid(token: &str) -> SearchError {
    SearchError::InvalidToken {
        token: token.to_string(),
    }
}

/// One page of item search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Matching items for this page, in sort order.
    pub items: Vec<Value>,

    /// Total number of matches, computed only for the first page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<u64>,

    /// Token for the next page, if more results may exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl SearchPage {
    /// Returns the number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if a next page token is present.
    pub fn has_next(&self) -> bool {
        self.next_token.is_some()
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPage {
    /// Collections on this page, ascending by id.
    pub collections: Vec<Value>,

    /// Token for the next page, if more collections remain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}
