//! Physical count reconciler tests

mod common;

use common::{Fixture, USER};
use inventory_backend::services::CountItem;
use inventory_backend::AppError;
use shared::{MovementReason, MovementType};

fn item(product_id: i64, warehouse_id: i64, counted: i64) -> CountItem {
    CountItem {
        product_id,
        warehouse_id,
        counted,
    }
}

#[tokio::test]
async fn test_count_above_recorded_emits_positive_adjustment() {
    let fx = Fixture::new();
    let product = fx.product("ALM-0001", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 1).await;

    let movements = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, 6)], None)
        .await
        .unwrap();

    assert_eq!(movements.len(), 1);
    let adjustment = &movements[0];
    assert_eq!(adjustment.movement_type, MovementType::PositiveAdjustment);
    assert_eq!(adjustment.reason, MovementReason::PhysicalCount);
    assert_eq!(adjustment.quantity, 5);
    assert_eq!((adjustment.stock_before, adjustment.stock_after), (1, 6));
    assert_eq!(fx.level(product.id, a.id).await, 6);
    assert_eq!(fx.cached_stock(product.id).await, 6);

    // Counting the recorded quantity again changes nothing
    let again = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, 6)], None)
        .await
        .unwrap();
    assert!(again.is_empty());
    assert_eq!(fx.movements_of(product.id).await.len(), 2);
}

#[tokio::test]
async fn test_count_below_recorded_emits_negative_adjustment() {
    let fx = Fixture::new();
    let product = fx.product("ALM-0002", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 10).await;

    let movements = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, 0)], Some("Conteo anual".into()))
        .await
        .unwrap();

    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::NegativeAdjustment);
    assert_eq!(movements[0].quantity, 10);
    assert_eq!(movements[0].origin_warehouse_id, Some(a.id));
    assert_eq!(movements[0].note.as_deref(), Some("Conteo anual"));
    assert_eq!(fx.cached_stock(product.id).await, 0);
}

#[tokio::test]
async fn test_count_of_unstocked_pair_creates_level() {
    let fx = Fixture::new();
    let product = fx.product("ALM-0003", 0).await;
    let a = fx.warehouse("BOD-A").await;

    let movements = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, 0)], None)
        .await
        .unwrap();
    assert!(movements.is_empty());
    assert_eq!(fx.store_levels(product.id).await, 1);
}

#[tokio::test]
async fn test_batch_returns_movements_in_item_order() {
    let fx = Fixture::new();
    let p1 = fx.product("ALM-0004", 0).await;
    let p2 = fx.product("ALM-0005", 0).await;
    let a = fx.warehouse("BOD-A").await;
    let b = fx.warehouse("BOD-B").await;
    fx.entry(p1.id, a.id, 5).await;

    let movements = fx
        .counts
        .apply_physical_count(
            USER,
            &[
                item(p2.id, b.id, 7),
                item(p1.id, a.id, 5),
                item(p1.id, b.id, 2),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].product_id, p2.id);
    assert_eq!(movements[1].product_id, p1.id);
    assert_eq!(movements[1].destination_warehouse_id, Some(b.id));

    assert_eq!(fx.cached_stock(p1.id).await, 7);
    assert_eq!(fx.cached_stock(p2.id).await, 7);
}

#[tokio::test]
async fn test_failing_item_rolls_back_whole_batch() {
    let fx = Fixture::new();
    let product = fx.product("ALM-0006", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 4).await;

    let err = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, 9), item(product.id, 404, 1)], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(fx.level(product.id, a.id).await, 4);
    assert_eq!(fx.cached_stock(product.id).await, 4);
    assert_eq!(fx.movements_of(product.id).await.len(), 1);
}

#[tokio::test]
async fn test_invalid_batches_rejected() {
    let fx = Fixture::new();
    let product = fx.product("ALM-0007", 0).await;
    let a = fx.warehouse("BOD-A").await;

    let empty = fx.counts.apply_physical_count(USER, &[], None).await.unwrap_err();
    assert!(matches!(empty, AppError::InvalidArgument(_)));

    let negative = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, -1)], None)
        .await
        .unwrap_err();
    assert!(matches!(negative, AppError::InvalidArgument(_)));

    let duplicated = fx
        .counts
        .apply_physical_count(USER, &[item(product.id, a.id, 1), item(product.id, a.id, 2)], None)
        .await
        .unwrap_err();
    assert!(matches!(duplicated, AppError::InvalidArgument(_)));

    assert!(fx.movements_of(product.id).await.is_empty());
}
