//! Integration tests for the PostgreSQL catalog repository.
//!
//! These tests require a real PostgreSQL database and use SQLx test macros
//! to ensure proper test isolation and cleanup.
//!
//! Run with: `cargo test --test postgres_catalog`

use catalog_indexer_repository::{CatalogError, CatalogRepository, PostgresCatalogRepository};
use catalog_indexer_shared::SourceTable;

/// Seeds 2 brands, 3 series and 5 models.
///
/// - brand 1 (BYD): series 10 (models 100, 101), series 11 (model 102)
/// - brand 2 (Audi): series 20 (models 200, 201)
async fn seed_catalog(pool: &sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO car_brand (id, name, country) VALUES (1, 'BYD', 'CN'), (2, 'Audi', 'DE')",
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO car_series (id, brand_id, name, level, energy_type) VALUES \
         (10, 1, 'Qin PLUS', 'compact', 'PHEV'), \
         (11, 1, 'Han', 'midsize', 'BEV'), \
         (20, 2, 'A4L', 'midsize', 'ICE')",
    )
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        r#"INSERT INTO car_model (id, series_id, name, year, price_guidance, status, extra_tags) VALUES
         (100, 10, 'Qin PLUS DM-i 55km', '2025', 9.98, 1, '{"tags": ["charger included"]}'),
         (101, 10, 'Qin PLUS DM-i 120km', '2026', 12.58, 1, '["no purchase tax"]'),
         (102, 11, 'Han EV 610km', '2025', 20.98, 1, NULL),
         (200, 20, 'A4L 40 TFSI', '2025', 32.18, 0, '"subsidy"'),
         (201, 20, 'A4L 45 TFSI quattro', '2026', NULL, 2, NULL)"#,
    )
    .execute(pool)
    .await
    .unwrap();
}

// ============================================================================
// Fan-out
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_resolve_series_to_models(pool: sqlx::PgPool) {
    seed_catalog(&pool).await;
    let repository = PostgresCatalogRepository::new(pool);

    let ids = repository
        .resolve_parent(SourceTable::Series, &[10, 20])
        .await
        .unwrap();

    assert_eq!(ids, vec![100, 101, 200, 201]);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_resolve_brand_fans_out_across_all_series(pool: sqlx::PgPool) {
    seed_catalog(&pool).await;
    let repository = PostgresCatalogRepository::new(pool);

    let byd = repository
        .resolve_parent(SourceTable::Brand, &[1])
        .await
        .unwrap();
    assert_eq!(byd, vec![100, 101, 102]);

    let both = repository
        .resolve_parent(SourceTable::Brand, &[1, 2])
        .await
        .unwrap();
    assert_eq!(both, vec![100, 101, 102, 200, 201]);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_resolve_unknown_parent_is_empty(pool: sqlx::PgPool) {
    seed_catalog(&pool).await;
    let repository = PostgresCatalogRepository::new(pool);

    let ids = repository
        .resolve_parent(SourceTable::Brand, &[99])
        .await
        .unwrap();
    assert!(ids.is_empty());
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_resolve_model_table_is_rejected(pool: sqlx::PgPool) {
    let repository = PostgresCatalogRepository::new(pool);

    let result = repository.resolve_parent(SourceTable::Model, &[1]).await;
    assert!(matches!(result, Err(CatalogError::UnsupportedTable(_))));
}

// ============================================================================
// Document fetch
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_fetch_documents_flattens_ancestors(pool: sqlx::PgPool) {
    seed_catalog(&pool).await;
    let repository = PostgresCatalogRepository::new(pool);

    let docs = repository.fetch_documents(&[100, 200]).await.unwrap();
    assert_eq!(docs.len(), 2);

    let qin = &docs[0];
    assert_eq!(qin.id, 100);
    assert_eq!(qin.series_name, "Qin PLUS");
    assert_eq!(qin.series_level, "compact");
    assert_eq!(qin.energy_type, "PHEV");
    assert_eq!(qin.brand_name, "BYD");
    assert_eq!(qin.tags_text, "charger included");
    assert!((qin.price - 9.98).abs() < f64::EPSILON);

    let audi = &docs[1];
    assert_eq!(audi.brand_name, "Audi");
    assert_eq!(audi.status, 0);
    assert_eq!(audi.tags_text, "subsidy");
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_fetch_documents_omits_missing_ids(pool: sqlx::PgPool) {
    seed_catalog(&pool).await;
    let repository = PostgresCatalogRepository::new(pool);

    let docs = repository.fetch_documents(&[101, 999, 201]).await.unwrap();
    let ids: Vec<i64> = docs.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![101, 201]);

    // Null price falls back to zero
    assert_eq!(docs[1].price, 0.0);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_fetch_documents_empty_input(pool: sqlx::PgPool) {
    let repository = PostgresCatalogRepository::new(pool);
    assert!(repository.fetch_documents(&[]).await.unwrap().is_empty());
}

// ============================================================================
// Keyset pagination
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_list_model_ids_pages(pool: sqlx::PgPool) {
    seed_catalog(&pool).await;
    let repository = PostgresCatalogRepository::new(pool);

    let first = repository.list_model_ids(None, 2).await.unwrap();
    assert_eq!(first, vec![100, 101]);

    let second = repository.list_model_ids(Some(101), 2).await.unwrap();
    assert_eq!(second, vec![102, 200]);

    let last = repository.list_model_ids(Some(200), 2).await.unwrap();
    assert_eq!(last, vec![201]);

    let done = repository.list_model_ids(Some(201), 2).await.unwrap();
    assert!(done.is_empty());
}
