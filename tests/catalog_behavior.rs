//! Behavior-driven tests for catalog discovery.
//!
//! These tests verify how the catalog normalizes tag groups and which
//! missing tags are fatal.

use tickdex_core::{
    seed_dow_jones, Catalog, CoreError, InMemoryStore, SeedOptions, Tag, Warehouse,
    WarehouseConfig, WarehouseStore,
};

fn store_with_core_tags() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .tag(Tag::TAGS, Tag::INDEXES)
        .tag(Tag::TAGS, Tag::PRODUCTS)
        .tag(Tag::INDEXES, "DJIA")
        .tag(Tag::PRODUCTS, "MSFT")
        .tag(Tag::PRODUCTS, "AAPL");
    store
}

// =============================================================================
// Catalog: Normalization
// =============================================================================

#[tokio::test]
async fn when_store_returns_unsorted_duplicates_catalog_groups_are_sorted_sets() {
    // Given: A store whose tag listings are unsorted and contain duplicates
    let store = InMemoryStore::new();
    store
        .tag(Tag::INDEXES, "NDX")
        .tag(Tag::INDEXES, "DJIA")
        .tag(Tag::INDEXES, "NDX")
        .tag(Tag::PRODUCTS, "MSFT")
        .tag(Tag::PRODUCTS, "AAPL")
        .tag(Tag::PRODUCTS, "MSFT")
        .tag(Tag::PRODUCTS, "IBM");

    // When: The catalog is discovered
    let catalog = Catalog::discover(&store).await.expect("discover");

    // Then: Each group equals the input set in ascending order
    assert_eq!(catalog.indexes(), ["DJIA", "NDX"]);
    assert_eq!(catalog.products(), ["AAPL", "IBM", "MSFT"]);
}

#[tokio::test]
async fn when_tags_meta_tag_lists_extra_tags_they_are_resolved_too() {
    // Given: A store with an additional sector tag registered under @tags
    let store = store_with_core_tags();
    store
        .tag(Tag::TAGS, "@tech")
        .tag("@tech", "MSFT")
        .tag("@tech", "AAPL");

    // When: The catalog is discovered
    let catalog = Catalog::discover(&store).await.expect("discover");

    // Then: The extra group is available next to the reserved ones
    let tech = Tag::parse("@tech").expect("valid tag");
    assert_eq!(catalog.group(&tech), ["AAPL", "MSFT"]);
    let tags: Vec<&str> = catalog.tags().map(Tag::as_str).collect();
    assert_eq!(tags, ["@indexes", "@products", "@tech"]);
}

#[tokio::test]
async fn when_tags_meta_tag_is_read_it_is_not_listed_as_a_group() {
    // Given: A store where @tags lists the reserved groups and itself
    let store = store_with_core_tags();
    store.tag(Tag::TAGS, Tag::TAGS);

    // When: The catalog is discovered
    let catalog = Catalog::discover(&store).await.expect("discover");

    // Then: Only the groups it names are present
    assert!(catalog.group(&Tag::tags()).is_empty());
    assert!(catalog.tags().all(|tag| tag.as_str() != Tag::TAGS));
}

#[tokio::test]
async fn when_meta_tag_is_absent_required_groups_still_load() {
    let store = InMemoryStore::new();
    store.tag(Tag::INDEXES, "DJIA").tag(Tag::PRODUCTS, "AAPL");

    let catalog = Catalog::discover(&store).await.expect("discover");

    assert_eq!(catalog.indexes(), ["DJIA"]);
    assert!(catalog.contains_product("AAPL"));
}

#[tokio::test]
async fn when_listed_tag_vanished_it_is_skipped() {
    // Given: @tags references a tag that no longer exists
    let store = store_with_core_tags();
    store.tag(Tag::TAGS, "@retired");

    // When: The catalog is discovered
    let catalog = Catalog::discover(&store).await.expect("discover");

    // Then: Discovery succeeds without that group
    let retired = Tag::parse("@retired").expect("valid tag");
    assert!(catalog.group(&retired).is_empty());
    assert!(catalog.tags().all(|tag| tag != &retired));
}

// =============================================================================
// Catalog: Failures
// =============================================================================

#[tokio::test]
async fn when_indexes_tag_is_missing_discovery_fails_with_tag_not_found() {
    let store = InMemoryStore::new();
    store.tag(Tag::PRODUCTS, "AAPL");

    let error = Catalog::discover(&store).await.expect_err("must fail");

    assert!(matches!(error, CoreError::TagNotFound { ref tag } if tag == "@indexes"));
    assert!(!error.transient());
}

#[tokio::test]
async fn when_products_tag_is_missing_discovery_fails_with_tag_not_found() {
    let store = InMemoryStore::new();
    store.tag(Tag::INDEXES, "DJIA");

    let error = Catalog::discover(&store).await.expect_err("must fail");

    assert!(matches!(error, CoreError::TagNotFound { ref tag } if tag == "@products"));
}

#[tokio::test]
async fn when_store_is_down_discovery_reports_store_unavailable() {
    let store = store_with_core_tags();
    store.set_unavailable(true);

    let error = Catalog::discover(&store).await.expect_err("must fail");

    assert_eq!(error.code(), "store.unavailable");
}

// =============================================================================
// Catalog: Seeded Warehouse
// =============================================================================

#[tokio::test]
async fn when_warehouse_is_seeded_catalog_lists_djia_and_thirty_products() {
    // Given: A warehouse seeded with the Dow Jones fixture
    let warehouse = Warehouse::open(WarehouseConfig::in_memory()).expect("warehouse open");
    seed_dow_jones(
        &warehouse,
        &SeedOptions {
            points: 2,
            seed: Some(42),
            ..SeedOptions::default()
        },
    )
    .expect("seed");

    // When: The catalog is discovered through the store adapter
    let catalog = Catalog::discover(&WarehouseStore::new(warehouse))
        .await
        .expect("discover");

    // Then: The index and every constituent are present
    assert_eq!(catalog.indexes(), ["DJIA"]);
    assert_eq!(catalog.products().len(), 30);
    assert!(catalog.contains_product("AAPL"));
    assert!(catalog.products().windows(2).all(|pair| pair[0] < pair[1]));
}
