//! Concurrent operations on shared stock levels

mod common;

use std::sync::Arc;

use common::{Fixture, USER};
use inventory_backend::services::{MovementRequest, TransferRequest};
use inventory_backend::AppError;
use shared::{MovementReason, MovementType};

fn exit(product_id: i64, warehouse_id: i64, quantity: i64) -> MovementRequest {
    MovementRequest {
        product_id,
        warehouse_id,
        movement_type: MovementType::Exit,
        reason: MovementReason::Sale,
        quantity,
        note: None,
        document_ref: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_exits_never_overdraw() {
    let fx = Arc::new(Fixture::new());
    let product = fx.product("CC-0001", 0).await;
    let a = fx.warehouse("BOD-A").await;
    fx.entry(product.id, a.id, 20).await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = fx.engine.clone();
            let request = exit(product.id, a.id, 3);
            tokio::spawn(async move { engine.apply_movement(USER, request).await })
        })
        .collect();

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(AppError::InsufficientStock { .. }) => rejections += 1,
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    assert_eq!(successes, 6);
    assert_eq!(rejections, 4);
    assert_eq!(fx.level(product.id, a.id).await, 2);
    assert_eq!(fx.cached_stock(product.id).await, 2);
    assert_eq!(fx.movements_of(product.id).await.len(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opposite_transfers_conserve_stock() {
    let fx = Arc::new(Fixture::new());
    let product = fx.product("CC-0002", 0).await;
    let a = fx.warehouse("BOD-A").await;
    let b = fx.warehouse("BOD-B").await;
    fx.entry(product.id, a.id, 50).await;
    fx.entry(product.id, b.id, 50).await;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let transfers = fx.transfers.clone();
            let (source, destination) = if i % 2 == 0 { (a.id, b.id) } else { (b.id, a.id) };
            let request = TransferRequest {
                product_id: product.id,
                source_warehouse_id: source,
                destination_warehouse_id: destination,
                quantity: 7,
                note: None,
            };
            tokio::spawn(async move { transfers.transfer(USER, request).await })
        })
        .collect();

    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) | Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error {:?}", other),
        }
    }

    let level_a = fx.level(product.id, a.id).await;
    let level_b = fx.level(product.id, b.id).await;
    assert!(level_a >= 0 && level_b >= 0);
    assert_eq!(level_a + level_b, 100);
    assert_eq!(fx.cached_stock(product.id).await, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disjoint_pairs_all_succeed() {
    let fx = Arc::new(Fixture::new());
    let a = fx.warehouse("BOD-A").await;
    let mut products = Vec::new();
    for i in 0..8 {
        let product = fx.product(&format!("CC-1{:03}", i), 0).await;
        fx.entry(product.id, a.id, 5).await;
        products.push(product);
    }

    let handles: Vec<_> = products
        .iter()
        .map(|product| {
            let engine = fx.engine.clone();
            let request = exit(product.id, a.id, 5);
            tokio::spawn(async move { engine.apply_movement(USER, request).await })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task panicked").expect("exit succeeds");
    }
    for product in &products {
        assert_eq!(fx.cached_stock(product.id).await, 0);
    }
}
