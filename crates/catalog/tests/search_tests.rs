//! Item search integration tests.
//!
//! Searches run through [`Catalog::search`] against the in-memory store, so
//! every filter is translated, executed and serialized end to end.

mod common;

use serde_json::json;

use common::*;
use helios_catalog::backends::memory::Operation;
use helios_catalog::error::{BackendError, StorageError, ValidationError};
use helios_catalog::types::{SearchRequest, SortBy, SortSpec};
use helios_catalog::{ErrorKind, SearchAdapter};

// ============================================================================
// Spatial Tests
// ============================================================================

/// Test that a bbox containing the item returns exactly that item and a
/// disjoint bbox returns nothing.
#[tokio::test]
async fn test_bbox_search() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(sydney_item(TEST_COLLECTION).item(), false)
        .await
        .unwrap();
    test.catalog
        .create_item(
            ItemFixture::new("elsewhere", TEST_COLLECTION).at(-70.0, 40.0).item(),
            false,
        )
        .await
        .unwrap();

    let page = test
        .catalog
        .search(&SearchRequest::new().with_bbox(vec![100.0, -50.0, 170.0, -20.0]))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["sydney"]);
    assert_eq!(page.matched, Some(1));

    let page = test
        .catalog
        .search(&SearchRequest::new().with_bbox(vec![1.0, 2.0, 3.0, 4.0]))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.matched, Some(0));
}

/// Test that a 3D bbox is reduced to its 2D footprint.
#[tokio::test]
async fn test_bbox_3d_search() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(sydney_item(TEST_COLLECTION).item(), false)
        .await
        .unwrap();

    let page = test
        .catalog
        .search(&SearchRequest::new().with_bbox(vec![100.0, -50.0, 0.0, 170.0, -20.0, 1000.0]))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["sydney"]);
}

/// Test that a bbox of the wrong length is rejected before any store call.
#[tokio::test]
async fn test_invalid_bbox_rejected() {
    let test = create_catalog_with_collection().await;
    let err = test
        .catalog
        .search(&SearchRequest::new().with_bbox(vec![1.0, 2.0, 3.0]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

/// Test that `intersects` matches items by geometry.
#[tokio::test]
async fn test_intersects_search() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(sydney_item(TEST_COLLECTION).item(), false)
        .await
        .unwrap();

    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[150.0, -35.0], [155.0, -35.0], [155.0, -30.0], [150.0, -30.0], [150.0, -35.0]]]
    });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_intersects(polygon))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);

    let point = json!({ "type": "Point", "coordinates": [0.0, 0.0] });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_intersects(point))
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

// ============================================================================
// Sort Tests
// ============================================================================

/// Test that a search without `sortby` orders items ascending by id.
#[tokio::test]
async fn test_default_sort_is_id_ascending() {
    let test = create_catalog_with_collection().await;
    for id in ["charlie", "alpha", "echo", "bravo", "delta"] {
        test.catalog
            .create_item(item(id, TEST_COLLECTION), false)
            .await
            .unwrap();
    }

    let page = test.catalog.search(&SearchRequest::new()).await.unwrap();
    assert_eq!(
        ids(&page.items),
        vec!["alpha", "bravo", "charlie", "delta", "echo"]
    );
}

/// Test that `sortby` is honored with ties broken by id.
#[tokio::test]
async fn test_sortby_descending_with_tie_breaker() {
    let test = create_catalog_with_collection().await;
    for (id, cloud) in [("a", 10), ("b", 50), ("c", 10), ("d", 30)] {
        test.catalog
            .create_item(
                ItemFixture::new(id, TEST_COLLECTION)
                    .with_property("eo:cloud_cover", json!(cloud))
                    .item(),
                false,
            )
            .await
            .unwrap();
    }

    let request =
        SearchRequest::new().with_sortby(vec![SortBy::desc("properties.eo:cloud_cover")]);
    let page = test.catalog.search(&request).await.unwrap();
    assert_eq!(ids(&page.items), vec!["b", "d", "a", "c"]);
}

/// Test that an explicit executor sort overrides the adapter's sort.
#[tokio::test]
async fn test_explicit_sort_overrides_adapter_sort() {
    let test = create_catalog_with_collection().await;
    seed_items(&test.catalog, TEST_COLLECTION, 3).await;

    let adapter = test
        .catalog
        .make_search()
        .set_sort(Some(&[SortBy::asc("id")]));
    let explicit = SortSpec::new().then(SortBy::desc("id"));
    let page = test
        .catalog
        .executor()
        .execute(&adapter, 10, None, Some(&explicit), None)
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["item-002", "item-001", "item-000"]);
}

// ============================================================================
// Identity Tests
// ============================================================================

/// Test filtering by ids and collections.
#[tokio::test]
async fn test_ids_and_collections_search() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_collection(collection("other"))
        .await
        .unwrap();
    seed_items(&test.catalog, TEST_COLLECTION, 3).await;
    seed_items(&test.catalog, "other", 2).await;

    let page = test
        .catalog
        .search(&SearchRequest::new().with_ids(["item-000", "item-002"]))
        .await
        .unwrap();
    // the same ids exist in both collections
    assert_eq!(page.matched, Some(3));

    let page = test
        .catalog
        .search(
            &SearchRequest::new()
                .with_ids(["item-000", "item-002"])
                .with_collections(["other"]),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["item-000"]);
    assert!(page.items.iter().all(|i| i["collection"] == "other"));
}

/// Test that an executor search restricted to collection ids only returns
/// items of those collections.
#[tokio::test]
async fn test_executor_collection_restriction() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_collection(collection("other"))
        .await
        .unwrap();
    seed_items(&test.catalog, TEST_COLLECTION, 2).await;
    seed_items(&test.catalog, "other", 4).await;

    let adapter = SearchAdapter::new();
    let page = test
        .catalog
        .executor()
        .execute(&adapter, 10, None, None, Some(&["other".to_string()]))
        .await
        .unwrap();
    assert_eq!(page.matched, Some(4));
}

// ============================================================================
// Datetime Tests
// ============================================================================

async fn seed_dated(test: &TestCatalog) {
    for (id, datetime) in [
        ("jan", "2020-01-15T00:00:00Z"),
        ("feb", "2020-02-15T00:00:00Z"),
        ("mar", "2020-03-15T00:00:00Z"),
    ] {
        test.catalog
            .create_item(
                ItemFixture::new(id, TEST_COLLECTION)
                    .with_datetime(datetime)
                    .item(),
                false,
            )
            .await
            .unwrap();
    }
}

/// Test closed, open-start, open-end and single-instant datetime searches.
#[tokio::test]
async fn test_datetime_search() {
    let test = create_catalog_with_collection().await;
    seed_dated(&test).await;

    let search = |datetime: &'static str| {
        let catalog = test.catalog.clone();
        async move {
            let page = catalog
                .search(&SearchRequest::new().with_datetime(datetime))
                .await
                .unwrap();
            ids(&page.items)
        }
    };

    assert_eq!(
        search("2020-02-01T00:00:00Z/2020-03-01T00:00:00Z").await,
        vec!["feb"]
    );
    assert_eq!(search("../2020-02-15T00:00:00Z").await, vec!["feb", "jan"]);
    assert_eq!(search("2020-02-15T00:00:00Z/..").await, vec!["feb", "mar"]);
    assert_eq!(search("2020-03-15T00:00:00Z").await, vec!["mar"]);
}

/// Test that stored datetimes are rendered back as RFC 3339 strings.
#[tokio::test]
async fn test_datetime_round_trips_as_string() {
    let test = create_catalog_with_collection().await;
    seed_dated(&test).await;

    let item = test.catalog.get_one_item(TEST_COLLECTION, "jan").await.unwrap();
    assert_eq!(item["properties"]["datetime"], "2020-01-15T00:00:00Z");
    assert!(item.get("_id").is_none());
}

/// Test that an interval open at both ends matches every item.
#[tokio::test]
async fn test_datetime_open_window() {
    let test = create_catalog_with_collection().await;
    seed_dated(&test).await;

    let page = test
        .catalog
        .search(&SearchRequest::new().with_datetime("../.."))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["feb", "jan", "mar"]);
    assert_eq!(page.matched, Some(3));
}

/// Test that an inverted interval is a validation error.
#[tokio::test]
async fn test_inverted_datetime_interval_rejected() {
    let test = create_catalog_with_collection().await;
    let err = test
        .catalog
        .search(&SearchRequest::new().with_datetime("2020-03-01T00:00:00Z/2020-01-01T00:00:00Z"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::InvalidDatetime { .. })
    ));
}

// ============================================================================
// Query Extension Tests
// ============================================================================

/// Test per-property `query` comparisons, including numeric strings.
#[tokio::test]
async fn test_query_extension() {
    let test = create_catalog_with_collection().await;
    for (id, gsd) in [("coarse", 30), ("fine", 10), ("medium", 15)] {
        test.catalog
            .create_item(
                ItemFixture::new(id, TEST_COLLECTION)
                    .with_property("gsd", json!(gsd))
                    .item(),
                false,
            )
            .await
            .unwrap();
    }

    let page = test
        .catalog
        .search(&SearchRequest::new().with_query("gsd", "lte", json!(15)))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["fine", "medium"]);

    let page = test
        .catalog
        .search(&SearchRequest::new().with_query("gsd", "gt", json!("10")))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["coarse", "medium"]);

    let page = test
        .catalog
        .search(&SearchRequest::new().with_query("gsd", "neq", json!(30)))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["fine", "medium"]);
}

/// Test that an unknown `query` operator is rejected.
#[tokio::test]
async fn test_query_unknown_operator_rejected() {
    let test = create_catalog_with_collection().await;
    let err = test
        .catalog
        .search(&SearchRequest::new().with_query("gsd", "near", json!(1)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::UnsupportedOperator { .. })
    ));
}

// ============================================================================
// CQL2 Tests
// ============================================================================

/// Test a combined CQL2 filter using queryable aliases.
#[tokio::test]
async fn test_cql2_filter_with_aliases() {
    let test = create_catalog_with_collection().await;
    for (id, cloud, platform) in [
        ("a", 5, "landsat-8"),
        ("b", 40, "landsat-8"),
        ("c", 5, "sentinel-2a"),
    ] {
        test.catalog
            .create_item(
                ItemFixture::new(id, TEST_COLLECTION)
                    .with_property("eo:cloud_cover", json!(cloud))
                    .with_property("platform", json!(platform))
                    .item(),
                false,
            )
            .await
            .unwrap();
    }

    let filter = json!({
        "op": "and",
        "args": [
            { "op": "<", "args": [{ "property": "cloud_cover" }, 10] },
            { "op": "like", "args": [{ "property": "platform" }, "LANDSAT%"] }
        ]
    });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["a"]);

    let filter = json!({
        "op": "not",
        "args": [{ "op": "in", "args": [{ "property": "id" }, ["a", "b"]] }]
    });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["c"]);
}

/// Test a CQL2 temporal comparison against stored datetimes.
#[tokio::test]
async fn test_cql2_timestamp_comparison() {
    let test = create_catalog_with_collection().await;
    seed_dated(&test).await;

    let filter = json!({
        "op": ">=",
        "args": [{ "property": "datetime" }, { "timestamp": "2020-02-01T00:00:00Z" }]
    });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["feb", "mar"]);
}

/// Test plain string datetimes in CQL2 and `query` comparisons.
#[tokio::test]
async fn test_datetime_string_comparisons() {
    let test = create_catalog_with_collection().await;
    seed_dated(&test).await;

    let search = |request: SearchRequest| {
        let catalog = test.catalog.clone();
        async move { ids(&catalog.search(&request).await.unwrap().items) }
    };

    let filter = json!({ "op": ">=", "args": [{ "property": "datetime" }, "2020-02-01T00:00:00Z"] });
    assert_eq!(
        search(SearchRequest::new().with_filter(filter)).await,
        vec!["feb", "mar"]
    );

    let filter = json!({ "op": "=", "args": [{ "property": "datetime" }, "2020-01-15T00:00:00Z"] });
    assert_eq!(search(SearchRequest::new().with_filter(filter)).await, vec!["jan"]);

    let filter = json!({
        "op": "between",
        "args": [{ "property": "datetime" }, "2020-01-01", "2020-02-28"]
    });
    assert_eq!(
        search(SearchRequest::new().with_filter(filter)).await,
        vec!["feb", "jan"]
    );

    let request = SearchRequest::new().with_query("datetime", "lt", json!("2020-02-01T00:00:00Z"));
    assert_eq!(search(request).await, vec!["jan"]);
}

/// Test temporal literals against datetimes held as strings.
#[tokio::test]
async fn test_timestamp_literal_on_string_property() {
    let test = create_catalog_with_collection().await;
    for (id, updated) in [("old", "2020-06-01T00:00:00Z"), ("new", "2021-06-01T00:00:00Z")] {
        test.catalog
            .create_item(
                ItemFixture::new(id, TEST_COLLECTION)
                    .with_property("updated", json!(updated))
                    .item(),
                false,
            )
            .await
            .unwrap();
    }

    let filter = json!({
        "op": ">=",
        "args": [{ "property": "updated" }, { "timestamp": "2021-01-01T00:00:00Z" }]
    });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["new"]);

    let filter = json!({ "op": ">=", "args": [{ "property": "datetime" }, { "timestamp": "2020-01-01T00:00:00Z" }] });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
}

/// Test CQL2 `s_intersects`.
#[tokio::test]
async fn test_cql2_spatial_filter() {
    let test = create_catalog_with_collection().await;
    test.catalog
        .create_item(sydney_item(TEST_COLLECTION).item(), false)
        .await
        .unwrap();

    let filter = json!({
        "op": "s_intersects",
        "args": [
            { "property": "geometry" },
            {
                "type": "Polygon",
                "coordinates": [[[100.0, -50.0], [170.0, -50.0], [170.0, -20.0], [100.0, -20.0], [100.0, -50.0]]]
            }
        ]
    });
    let page = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["sydney"]);
}

/// Test that a malformed filter fails before the store is queried.
#[tokio::test]
async fn test_cql2_invalid_filter_makes_no_store_call() {
    let test = create_catalog_with_collection().await;
    // would surface as a backend error if the store were reached
    test.store.fail_next(Operation::Find, "should not be called");

    let filter = json!({ "op": "in", "args": [{ "property": "id" }, "a"] });
    let err = test
        .catalog
        .search(&SearchRequest::new().with_filter(filter))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::NotAList { .. })
    ));

    // the injected failure is still pending
    let err = test.catalog.search(&SearchRequest::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::Backend(_)));
}

// ============================================================================
// Read Failure Tests
// ============================================================================

/// Test that a store failure on the search path is re-raised unchanged.
#[tokio::test]
async fn test_search_store_failure_is_transient() {
    let test = create_catalog_with_collection().await;
    test.store.fail_next(Operation::Find, "connection reset");

    let err = test.catalog.search(&SearchRequest::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientStore);
    assert!(matches!(
        err,
        StorageError::Backend(BackendError::Unavailable { .. })
    ));
}

/// Test that a missing limit uses the default and large limits are clamped.
#[tokio::test]
async fn test_limit_defaults_and_clamping() {
    let config = helios_catalog::CatalogConfig {
        default_limit: 2,
        max_limit: 3,
        ..Default::default()
    };
    let test = create_catalog_with(config).await;
    test.catalog
        .create_collection(collection(TEST_COLLECTION))
        .await
        .unwrap();
    seed_items(&test.catalog, TEST_COLLECTION, 5).await;

    let page = test.catalog.search(&SearchRequest::new()).await.unwrap();
    assert_eq!(page.items.len(), 2);

    let page = test
        .catalog
        .search(&SearchRequest::new().with_limit(100))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 3);

    let err = test
        .catalog
        .search(&SearchRequest::new().with_limit(0))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
