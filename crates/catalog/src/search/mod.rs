//! Item search: query assembly and paginated execution.

mod adapter;
mod executor;

pub use adapter::SearchAdapter;
pub use executor::SearchExecutor;
