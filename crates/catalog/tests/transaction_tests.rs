//! Write-path integration tests: items, collections, bulk insert and rename.

mod common;

use bson::doc;
use serde_json::json;

use common::*;
use helios_catalog::ErrorKind;
use helios_catalog::backends::memory::{DUPLICATE_KEY_CODE, Operation};
use helios_catalog::core::DocumentStore;
use helios_catalog::error::{ConflictError, ResourceError, StorageError, ValidationError};
use helios_catalog::types::{Collection, Item, SearchRequest};

// ============================================================================
// Item Create Tests
// ============================================================================

/// Test that creating the same item twice conflicts unless `exist_ok`.
#[tokio::test]
async fn test_create_item_conflict() {
    let test = create_catalog_with_collection().await;
    let first = ItemFixture::new("scene", TEST_COLLECTION).with_property("gsd", json!(30));
    test.catalog.create_item(first.item(), false).await.unwrap();

    let err = test
        .catalog
        .create_item(first.item(), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(
        err,
        StorageError::Conflict(ConflictError::ItemExists { ref item_id, ref collection_id })
            if item_id == "scene" && collection_id == TEST_COLLECTION
    ));

    let second = ItemFixture::new("scene", TEST_COLLECTION).with_property("gsd", json!(10));
    test.catalog.create_item(second.item(), true).await.unwrap();

    let stored = test
        .catalog
        .get_one_item(TEST_COLLECTION, "scene")
        .await
        .unwrap();
    assert_eq!(stored["properties"]["gsd"], 10);
    assert_eq!(test.store.len("items"), 1);
}

/// Test that replacing an item keeps its internal identity.
#[tokio::test]
async fn test_create_item_replace_keeps_internal_id() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(item("scene", TEST_COLLECTION), false)
        .await
        .unwrap();
    let key = doc! { "id": "scene", "collection": TEST_COLLECTION };
    let before = test.store.find_one("items", key.clone()).await.unwrap().unwrap();

    test.catalog
        .create_item(item("scene", TEST_COLLECTION), true)
        .await
        .unwrap();
    let after = test.store.find_one("items", key).await.unwrap().unwrap();
    assert_eq!(before.get("_id"), after.get("_id"));
}

/// Test that an item cannot be created in a missing collection.
#[tokio::test]
async fn test_create_item_missing_collection() {
    let test = create_catalog().await;
    let err = test
        .catalog
        .create_item(item("scene", "nowhere"), false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::CollectionNotFound { .. })
    ));
    assert!(err.is_not_found());
}

/// Test that an item without a collection is rejected when parsed.
#[test]
fn test_item_requires_collection() {
    let err = Item::new(json!({ "id": "scene", "properties": {} })).unwrap_err();
    assert!(matches!(err, ValidationError::MissingRequiredField { .. }));
}

/// Test that the same item id may exist in two collections.
#[tokio::test]
async fn test_item_identity_is_per_collection() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_collection(collection("other"))
        .await
        .unwrap();
    test.catalog
        .create_item(item("scene", TEST_COLLECTION), false)
        .await
        .unwrap();
    test.catalog
        .create_item(item("scene", "other"), false)
        .await
        .unwrap();
    assert_eq!(test.store.len("items"), 2);
}

// ============================================================================
// Item Update and Delete Tests
// ============================================================================

/// Test updating an existing item and the not-found cases.
#[tokio::test]
async fn test_update_item() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(item("scene", TEST_COLLECTION), false)
        .await
        .unwrap();

    let updated = ItemFixture::new("scene", TEST_COLLECTION)
        .with_property("gsd", json!(15))
        .item();
    test.catalog
        .update_item(TEST_COLLECTION, "scene", updated)
        .await
        .unwrap();
    let stored = test
        .catalog
        .get_one_item(TEST_COLLECTION, "scene")
        .await
        .unwrap();
    assert_eq!(stored["properties"]["gsd"], 15);

    let err = test
        .catalog
        .update_item(TEST_COLLECTION, "missing", item("missing", TEST_COLLECTION))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::ItemNotFound { .. })
    ));

    let err = test
        .catalog
        .update_item(TEST_COLLECTION, "scene", item("other-id", TEST_COLLECTION))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

/// Test that deletion is scoped to the given collection.
#[tokio::test]
async fn test_delete_item_is_collection_scoped() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_collection(collection("other"))
        .await
        .unwrap();
    test.catalog
        .create_item(item("scene", TEST_COLLECTION), false)
        .await
        .unwrap();
    test.catalog
        .create_item(item("scene", "other"), false)
        .await
        .unwrap();

    test.catalog.delete_item("scene", "other").await.unwrap();

    assert!(test.catalog.get_one_item(TEST_COLLECTION, "scene").await.is_ok());
    let err = test.catalog.get_one_item("other", "scene").await.unwrap_err();
    assert!(err.is_not_found());

    let err = test.catalog.delete_item("scene", "other").await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Resource(ResourceError::ItemNotFound { .. })
    ));
}

// ============================================================================
// Bulk Insert Tests
// ============================================================================

/// Test that a bulk insert with one duplicate keeps the valid items and
/// reports the duplicate.
#[tokio::test]
async fn test_bulk_insert_partial_failure() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(item("existing", TEST_COLLECTION), false)
        .await
        .unwrap();

    let mut items: Vec<Item> = (0..5)
        .map(|i| item(&format!("bulk-{}", i), TEST_COLLECTION))
        .collect();
    items.insert(2, item("existing", TEST_COLLECTION));

    let err = test.catalog.bulk_insert(items).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    match &err {
        StorageError::Conflict(ConflictError::BulkInsert { inserted, failures }) => {
            assert_eq!(*inserted, 5);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 2);
            assert_eq!(failures[0].code, DUPLICATE_KEY_CODE);
            assert!(failures[0].message.contains("existing"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("existing"));

    let page = test
        .catalog
        .search(&SearchRequest::new().with_limit(100))
        .await
        .unwrap();
    assert_eq!(page.matched, Some(6));
}

/// Test that an empty bulk insert is a no-op.
#[tokio::test]
async fn test_bulk_insert_empty() {
    let test = create_catalog_with_collection().await;
    assert_eq!(test.catalog.bulk_insert(Vec::new()).await.unwrap(), 0);
}

/// Test that prepare_item runs the same checks as a single create.
#[tokio::test]
async fn test_prepare_item_checks() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(item("scene", TEST_COLLECTION), false)
        .await
        .unwrap();
    let transactions = test.catalog.transactions();

    let err = transactions
        .prepare_item(&item("scene", TEST_COLLECTION), false)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(
        transactions
            .prepare_item(&item("scene", TEST_COLLECTION), true)
            .await
            .is_ok()
    );

    let err = transactions
        .prepare_item(&item("scene", "nowhere"), false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Collection Tests
// ============================================================================

/// Test collection create, find and duplicate detection.
#[tokio::test]
async fn test_create_collection() {
    let test = create_catalog().await;
    test.catalog
        .create_collection(collection("landsat"))
        .await
        .unwrap();

    let found = test.catalog.find_collection("landsat").await.unwrap();
    assert_eq!(found["id"], "landsat");
    assert!(found.get("_id").is_none());

    let err = test
        .catalog
        .create_collection(collection("landsat"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Conflict(ConflictError::CollectionExists { .. })
    ));

    let err = test.catalog.find_collection("sentinel").await.unwrap_err();
    assert!(err.is_not_found());
}

/// Test an in-place collection update.
#[tokio::test]
async fn test_update_collection_in_place() {
    let test = create_catalog_with_collection().await;
    let mut content = collection_json(TEST_COLLECTION);
    content["description"] = json!("Updated description");

    test.catalog
        .update_collection(TEST_COLLECTION, Collection::new(content).unwrap())
        .await
        .unwrap();
    let found = test.catalog.find_collection(TEST_COLLECTION).await.unwrap();
    assert_eq!(found["description"], "Updated description");
    assert_eq!(test.store.len("collections"), 1);
}

/// Test that renaming a collection moves its items.
#[tokio::test]
async fn test_rename_collection_cascades() {
    let test = create_catalog_with_collection().await;
    seed_items(&test.catalog, TEST_COLLECTION, 3).await;

    test.catalog
        .update_collection(TEST_COLLECTION, collection("renamed"))
        .await
        .unwrap();

    assert!(test.catalog.find_collection(TEST_COLLECTION).await.unwrap_err().is_not_found());
    assert_eq!(test.catalog.find_collection("renamed").await.unwrap()["id"], "renamed");

    let page = test
        .catalog
        .search(&SearchRequest::new().with_collections(["renamed"]))
        .await
        .unwrap();
    assert_eq!(page.matched, Some(3));
    let page = test
        .catalog
        .search(&SearchRequest::new().with_collections([TEST_COLLECTION]))
        .await
        .unwrap();
    assert_eq!(page.matched, Some(0));
}

/// Test that a rename onto an existing collection id conflicts.
#[tokio::test]
async fn test_rename_collection_onto_existing() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_collection(collection("taken"))
        .await
        .unwrap();

    let err = test
        .catalog
        .update_collection(TEST_COLLECTION, collection("taken"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Conflict(ConflictError::CollectionExists { .. })
    ));
}

/// Test that deleting a collection deletes its items and nothing else.
#[tokio::test]
async fn test_delete_collection_cascades() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_collection(collection("other"))
        .await
        .unwrap();
    seed_items(&test.catalog, TEST_COLLECTION, 4).await;
    seed_items(&test.catalog, "other", 2).await;

    test.catalog.delete_collection(TEST_COLLECTION).await.unwrap();

    let remaining = test
        .store
        .count("items", doc! { "collection": TEST_COLLECTION })
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert_eq!(test.store.len("items"), 2);

    let err = test
        .catalog
        .delete_collection(TEST_COLLECTION)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Test the destructive maintenance helpers.
#[tokio::test]
async fn test_delete_all() {
    let test = create_catalog_with_collection().await;
    seed_items(&test.catalog, TEST_COLLECTION, 3).await;

    let transactions = test.catalog.transactions();
    assert_eq!(transactions.delete_all_items().await.unwrap(), 3);
    assert_eq!(transactions.delete_all_collections().await.unwrap(), 1);
    assert!(test.store.is_empty("items"));
    assert!(test.store.is_empty("collections"));
}

// ============================================================================
// Store Failure Tests
// ============================================================================

/// Test that a store failure on a write path becomes a conflict naming the keys.
#[tokio::test]
async fn test_write_store_failure_is_wrapped() {
    let test = create_catalog_with_collection().await;
    test.store.fail_next(Operation::Insert, "primary stepped down");

    let err = test
        .catalog
        .create_item(item("scene", TEST_COLLECTION), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    match &err {
        StorageError::Conflict(ConflictError::WriteFailed {
            operation, keys, ..
        }) => {
            assert_eq!(operation, "create_item");
            assert_eq!(keys, &format!("{}/scene", TEST_COLLECTION));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("primary stepped down"));
}

/// Test that a lookup failure before a delete is wrapped the same way.
#[tokio::test]
async fn test_delete_lookup_failure_is_wrapped() {
    let test = create_catalog_with_collection().await;
    seed_items(&test.catalog, TEST_COLLECTION, 1).await;
    test.store.fail_next(Operation::FindOne, "socket timeout");

    let err = test
        .catalog
        .delete_item("item-000", TEST_COLLECTION)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Conflict(ConflictError::WriteFailed { .. })
    ));
    // nothing was deleted
    assert_eq!(test.store.len("items"), 1);
}

/// Test that a store failure during a rename surfaces as a conflict.
#[tokio::test]
async fn test_rename_store_failure_is_wrapped() {
    let test = create_catalog_with_collection().await;
    seed_items(&test.catalog, TEST_COLLECTION, 2).await;
    test.store.fail_next(Operation::Update, "write concern timeout");

    let err = test
        .catalog
        .update_collection(TEST_COLLECTION, collection("renamed"))
        .await
        .unwrap_err();
    match err {
        StorageError::Conflict(ConflictError::WriteFailed { operation, .. }) => {
            assert_eq!(operation, "rename_collection");
        }
        other => panic!("unexpected error: {other}"),
    }
}
