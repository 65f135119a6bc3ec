//! Kardex, alert and stock view tests

mod common;

use chrono::{Duration, Utc};
use common::{Fixture, USER};
use inventory_backend::services::{KardexQuery, MovementQuery, TransferRequest};
use inventory_backend::AppError;
use rust_decimal::Decimal;
use shared::{DateRange, MovementType, Pagination, StockStatus};

#[tokio::test]
async fn test_kardex_is_newest_first_with_current_stock() {
    let fx = Fixture::new();
    let product = fx.product("KDX-0001", 0).await;
    let a = fx.warehouse("BOD-A").await;
    let first = fx.entry(product.id, a.id, 10).await;
    let second = fx
        .movement(product.id, a.id, MovementType::Exit, 3)
        .await
        .unwrap();
    let third = fx.entry(product.id, a.id, 1).await;

    let kardex = fx
        .reporting
        .kardex(product.id, KardexQuery::default())
        .await
        .unwrap();

    let ids: Vec<i64> = kardex.movements.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
    assert_eq!(kardex.current_stock, 8);
    assert_eq!(kardex.product.id, product.id);
}

#[tokio::test]
async fn test_kardex_warehouse_filter_matches_either_side() {
    let fx = Fixture::new();
    let product = fx.product("KDX-0002", 0).await;
    let a = fx.warehouse("BOD-A").await;
    let b = fx.warehouse("BOD-B").await;
    let c = fx.warehouse("BOD-C").await;
    fx.entry(product.id, a.id, 10).await;
    fx.entry(product.id, c.id, 2).await;
    fx.transfers
        .transfer(
            USER,
            TransferRequest {
                product_id: product.id,
                source_warehouse_id: a.id,
                destination_warehouse_id: b.id,
                quantity: 4,
                note: None,
            },
        )
        .await
        .unwrap();

    let query = KardexQuery {
        warehouse_id: Some(b.id),
        ..Default::default()
    };
    let kardex = fx.reporting.kardex(product.id, query).await.unwrap();
    // Both transfer rows name B as destination
    assert_eq!(kardex.movements.len(), 2);
    assert!(kardex.movements.iter().all(|m| m.involves_warehouse(b.id)));

    let query = KardexQuery {
        warehouse_id: Some(a.id),
        ..Default::default()
    };
    let kardex = fx.reporting.kardex(product.id, query).await.unwrap();
    assert_eq!(kardex.movements.len(), 3);
}

#[tokio::test]
async fn test_kardex_date_range() {
    let fx = Fixture::new();
    let product = fx.product("KDX-0003", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 10).await;

    let future = KardexQuery {
        range: DateRange::new(Some(Utc::now() + Duration::hours(1)), None),
        warehouse_id: None,
    };
    assert!(fx.reporting.kardex(product.id, future).await.unwrap().movements.is_empty());

    let around = KardexQuery {
        range: DateRange::new(
            Some(Utc::now() - Duration::hours(1)),
            Some(Utc::now() + Duration::hours(1)),
        ),
        warehouse_id: None,
    };
    assert_eq!(fx.reporting.kardex(product.id, around).await.unwrap().movements.len(), 1);
}

#[tokio::test]
async fn test_kardex_unknown_product() {
    let fx = Fixture::new();
    let err = fx
        .reporting
        .kardex(404, KardexQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_kardex_csv_export() {
    let fx = Fixture::new();
    let product = fx.product("KDX-0004", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 10).await;
    fx.movement(product.id, a.id, MovementType::Exit, 4)
        .await
        .unwrap();

    let csv = fx
        .reporting
        .kardex_csv(product.id, KardexQuery::default())
        .await
        .unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("fecha,tipo_movimiento,motivo,"));
    assert!(lines[1].contains(",SALIDA,VENTA,"));
    assert!(lines[2].contains(",ENTRADA,COMPRA,"));
}

#[tokio::test]
async fn test_low_stock_alerts_reconcile_first() {
    let fx = Fixture::new();
    let low = fx.product("ALR-0001", 10).await;
    let empty = fx.product("ALR-0002", 5).await;
    let healthy = fx.product("ALR-0003", 2).await;
    let unset = fx.product("ALR-0004", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(low.id, a.id, 4).await;
    fx.entry(healthy.id, a.id, 50).await;

    // A stale cache must not hide the real state
    fx.memory.corrupt_cached_stock(healthy.id, 0).await.unwrap();
    fx.memory.corrupt_cached_stock(low.id, 100).await.unwrap();

    let alerts = fx.reporting.low_stock_alerts().await.unwrap();
    let ids: Vec<i64> = alerts.iter().map(|alert| alert.product.id).collect();
    assert_eq!(ids, vec![low.id, empty.id, unset.id]);

    assert_eq!(alerts[0].current_stock, 4);
    assert_eq!(alerts[0].min_stock, 10);
    assert_eq!(alerts[0].alert_percentage, Decimal::new(40, 0));
    assert_eq!(alerts[1].alert_percentage, Decimal::ZERO);
    assert_eq!(alerts[2].alert_percentage, Decimal::ZERO);

    assert_eq!(fx.cached_stock(healthy.id).await, 50);
}

#[tokio::test]
async fn test_consolidated_stock_and_status() {
    let fx = Fixture::new();
    let product = fx.product("CON-0001", 5).await;
    let a = fx.warehouse("BOD-A").await;
    let b = fx.warehouse("BOD-B").await;

    let stock = fx.reporting.consolidated_stock(product.id).await.unwrap();
    assert_eq!(stock.total, 0);
    assert_eq!(stock.status, StockStatus::OutOfStock);

    fx.entry(product.id, a.id, 2).await;
    fx.entry(product.id, b.id, 3).await;
    let stock = fx.reporting.consolidated_stock(product.id).await.unwrap();
    assert_eq!(stock.total, 5);
    assert_eq!(stock.by_warehouse.len(), 2);
    assert_eq!(stock.status, StockStatus::LowStock);

    fx.entry(product.id, b.id, 1).await;
    let stock = fx.reporting.consolidated_stock(product.id).await.unwrap();
    assert_eq!(stock.status, StockStatus::Normal);
    assert_eq!(stock.product.current_stock, 6);
}

#[tokio::test]
async fn test_warehouse_stock_lists_positive_levels_only() {
    let fx = Fixture::new();
    let p1 = fx.product("WST-0001", 0).await;
    let p2 = fx.product("WST-0002", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(p1.id, a.id, 3).await;
    fx.entry(p2.id, a.id, 2).await;
    fx.movement(p2.id, a.id, MovementType::Exit, 2).await.unwrap();

    let levels = fx.reporting.warehouse_stock(a.id).await.unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].product_id, p1.id);

    let err = fx.reporting.warehouse_stock(404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_movement_history_filters_and_paging() {
    let fx = Fixture::new();
    let p1 = fx.product("HIS-0001", 0).await;
    let p2 = fx.product("HIS-0002", 0).await;
    let a = fx.warehouse("BOD-A").await;
    for _ in 0..5 {
        fx.entry(p1.id, a.id, 1).await;
    }
    fx.movement(p1.id, a.id, MovementType::Exit, 2).await.unwrap();
    fx.entry(p2.id, a.id, 7).await;

    let all = fx
        .reporting
        .list_movements(MovementQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 7);

    let exits = fx
        .reporting
        .list_movements(MovementQuery {
            movement_type: Some(MovementType::Exit),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].quantity, 2);

    let page = fx
        .reporting
        .list_movements(MovementQuery {
            product_id: Some(p1.id),
            page: Pagination { skip: 1, limit: 2 },
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.iter().all(|m| m.product_id == p1.id));
    assert!(page[0].id > page[1].id);
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() {
    let fx = Fixture::new();
    let product = fx.product("REC-0001", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 8).await;
    fx.memory.corrupt_cached_stock(product.id, 3).await.unwrap();
    let movements = fx.movements_of(product.id).await.len();

    let first = fx.reconciliation.reconcile_product(product.id).await.unwrap();
    let second = fx.reconciliation.reconcile_product(product.id).await.unwrap();

    assert_eq!(first.current_stock, 8);
    assert_eq!(second.current_stock, 8);
    assert_eq!(fx.movements_of(product.id).await.len(), movements);

    let err = fx.reconciliation.reconcile_product(404).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
