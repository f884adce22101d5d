//! Catalog construction over a fresh in-memory store.

use std::sync::Arc;

use helios_catalog::backends::memory::MemoryStore;
use helios_catalog::types::Item;
use helios_catalog::{Catalog, CatalogConfig};

use super::fixtures::{ItemFixture, collection};

/// Name of the collection most tests write into.
pub const TEST_COLLECTION: &str = "test-collection";

/// A catalog plus direct access to its store.
pub struct TestCatalog {
    /// The store, for failure injection and direct inspection.
    pub store: Arc<MemoryStore>,
    /// The catalog under test.
    pub catalog: Catalog,
}

/// Creates an initialized catalog over an empty in-memory store.
pub async fn create_catalog() -> TestCatalog {
    create_catalog_with(CatalogConfig::default()).await
}

/// Creates an initialized catalog with a custom configuration.
pub async fn create_catalog_with(config: CatalogConfig) -> TestCatalog {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::new(store.clone(), config);
    catalog
        .initialize()
        .await
        .expect("Failed to initialize catalog");
    TestCatalog { store, catalog }
}

/// Creates an initialized catalog holding [`TEST_COLLECTION`].
pub async fn create_catalog_with_collection() -> TestCatalog {
    let test = create_catalog().await;
    test.catalog
        .create_collection(collection(TEST_COLLECTION))
        .await
        .expect("Failed to create test collection");
    test
}

/// Inserts `count` items named `item-000`, `item-001`, ... into `collection_id`.
pub async fn seed_items(catalog: &Catalog, collection_id: &str, count: usize) -> Vec<Item> {
    let items: Vec<Item> = (0..count)
        .map(|i| ItemFixture::new(format!("item-{:03}", i), collection_id).item())
        .collect();
    for item in &items {
        catalog
            .create_item(item.clone(), false)
            .await
            .expect("Failed to seed item");
    }
    items
}
