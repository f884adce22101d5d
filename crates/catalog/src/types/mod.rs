//! Core types for catalog records, sorting, pagination and search requests.

mod index;
mod pagination;
mod record;
mod search_request;
mod sort;

pub use index::{IndexDefinition, IndexKind};
pub use pagination::{CollectionPage, Cursor, PaginationCodec, SearchPage};
pub use record::{Collection, Item};
pub use search_request::{DatetimeFilter, SearchRequest};
pub use sort::{SortBy, SortDirection, SortSpec, default_item_sort};

pub(crate) use search_request::parse_instant;
pub(crate) use sort::collection_listing_sort;
