//! Integration tests for the movement pipeline.
//!
//! Tests: InventoryService → InventoryGateway (in-memory) → stored records
//!
//! Verifies:
//! - Checkouts/returns reconcile item quantities and persist the movement
//! - Batches are all-or-nothing
//! - Deletion reverses stock and is guarded
//! - Failed writes are compensated; failed compensation is reported
//! - Timeouts and concurrent writers surface as errors, never as lost updates

use std::sync::Arc;
use std::time::Duration;

use stocktrack_core::{ItemId, ValidationError};
use stocktrack_inventory::{
    Item, ItemCategory, ItemUpdate, MovementType, MovementUpdate, NewItem, NewMovement,
    ProposedLine,
};
use stocktrack_parties::{PartyDetails, Responsible, Seller};

use crate::config::ServiceConfig;
use crate::gateway::{FaultPlan, GatewayError, GatewayOp, InMemoryGateway};
use crate::service::{InventoryService, ServiceError};

type Service = InventoryService<Arc<InMemoryGateway>>;

fn service() -> Service {
    service_on(Arc::new(InMemoryGateway::new()))
}

fn service_on(gateway: Arc<InMemoryGateway>) -> Service {
    InventoryService::new(gateway, ServiceConfig::default())
}

fn details(name: &str) -> PartyDetails {
    PartyDetails {
        name: name.to_string(),
        whatsapp: String::new(),
        address: String::new(),
    }
}

async fn seed_item(svc: &Service, code: &str, category: ItemCategory, total: i64) -> Item {
    svc.create_item(NewItem {
        code: code.to_string(),
        name: format!("Item {code}"),
        category,
        total_quantity: total,
    })
    .await
    .unwrap()
}

async fn seed_responsible(svc: &Service, name: &str) -> Responsible {
    svc.create_responsible(details(name)).await.unwrap()
}

async fn seed_seller(svc: &Service, name: &str) -> Seller {
    svc.create_seller(details(name)).await.unwrap()
}

fn movement(responsible: &Responsible, lines: &[(&Item, i64)]) -> NewMovement {
    NewMovement {
        responsible_id: responsible.id,
        seller_id: None,
        date: None,
        lines: lines
            .iter()
            .map(|(item, quantity)| ProposedLine {
                item_id: item.id,
                quantity: *quantity,
            })
            .collect(),
        new_point: false,
    }
}

async fn quantities(svc: &Service, id: ItemId) -> (i64, i64, i64) {
    let item = svc.get_item(id).await.unwrap();
    assert!(item.is_balanced());
    (item.available_quantity, item.in_use_quantity, item.total_quantity)
}

#[tokio::test]
async fn checkout_moves_units_to_in_use() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    let m = svc.create_checkout(movement(&ana, &[(&item, 4)])).await.unwrap();

    assert_eq!(quantities(&svc, item.id).await, (6, 4, 10));
    assert_eq!(m.kind, MovementType::Checkout);
    assert_eq!(m.lines.len(), 1);
    assert_eq!(m.lines[0].quantity, 4);
    assert_eq!(m.lines[0].item_code, "VX-01");
    assert_eq!(m.responsible_name, "Ana");
    assert_eq!(svc.list_movements().await.unwrap(), vec![m]);
}

#[tokio::test]
async fn return_after_checkout_restores_stock() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    svc.create_checkout(movement(&ana, &[(&item, 4)])).await.unwrap();
    let r = svc.create_return(movement(&ana, &[(&item, 4)])).await.unwrap();

    assert_eq!(r.kind, MovementType::Return);
    assert_eq!(quantities(&svc, item.id).await, (10, 0, 10));
    assert_eq!(svc.list_movements().await.unwrap().len(), 2);
}

#[tokio::test]
async fn insufficient_stock_changes_nothing() {
    let svc = service();
    let item = seed_item(&svc, "SUP-01", ItemCategory::Supplies, 3).await;
    let ana = seed_responsible(&svc, "Ana").await;

    let err = svc
        .create_checkout(movement(&ana, &[(&item, 5)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InsufficientStock { requested: 5, limit: 3, .. })
    ));
    assert_eq!(quantities(&svc, item.id).await, (3, 0, 3));
    assert_eq!(svc.get_item(item.id).await.unwrap().version, 1);
    assert!(svc.list_movements().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_checkout_reverts_stock() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    let m = svc.create_checkout(movement(&ana, &[(&item, 4)])).await.unwrap();

    svc.delete_movement(m.id).await.unwrap();

    assert_eq!(quantities(&svc, item.id).await, (10, 0, 10));
    assert!(svc.list_movements().await.unwrap().is_empty());
    assert!(matches!(
        svc.delete_movement(m.id).await.unwrap_err(),
        ServiceError::NotFound { entity: "movement", .. }
    ));
}

#[tokio::test]
async fn one_bad_line_rejects_the_whole_batch() {
    let svc = service();
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let b = seed_item(&svc, "B", ItemCategory::Supplies, 1).await;
    let ana = seed_responsible(&svc, "Ana").await;

    let err = svc
        .create_checkout(movement(&ana, &[(&a, 4), (&b, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InsufficientStock { item_id, .. }) if item_id == b.id
    ));
    assert_eq!(quantities(&svc, a.id).await, (10, 0, 10));
    assert_eq!(quantities(&svc, b.id).await, (1, 0, 1));
    assert!(svc.list_movements().await.unwrap().is_empty());
}

#[tokio::test]
async fn returns_are_capped_by_in_use() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    svc.create_checkout(movement(&ana, &[(&item, 2)])).await.unwrap();

    let err = svc
        .create_return(movement(&ana, &[(&item, 3)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InsufficientStock { limit: 2, .. })
    ));
    assert_eq!(quantities(&svc, item.id).await, (8, 2, 10));
}

#[tokio::test]
async fn movement_references_must_resolve() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    let mut unknown_responsible = movement(&ana, &[(&item, 1)]);
    unknown_responsible.responsible_id = stocktrack_core::ResponsibleId::new();
    assert_eq!(
        svc.create_checkout(unknown_responsible).await.unwrap_err(),
        ServiceError::Validation(ValidationError::MissingResponsible)
    );

    let mut unknown_seller = movement(&ana, &[(&item, 1)]);
    unknown_seller.seller_id = Some(stocktrack_core::SellerId::new());
    assert!(matches!(
        svc.create_checkout(unknown_seller).await.unwrap_err(),
        ServiceError::NotFound { entity: "seller", .. }
    ));

    assert_eq!(
        svc.create_checkout(movement(&ana, &[])).await.unwrap_err(),
        ServiceError::Validation(ValidationError::EmptyLineList)
    );

    let ghost = ItemId::new();
    let mut unknown_item = movement(&ana, &[]);
    unknown_item.lines.push(ProposedLine {
        item_id: ghost,
        quantity: 1,
    });
    assert_eq!(
        svc.create_checkout(unknown_item).await.unwrap_err(),
        ServiceError::Validation(ValidationError::ItemNotFound { item_id: ghost })
    );

    assert_eq!(quantities(&svc, item.id).await, (10, 0, 10));
}

#[tokio::test]
async fn deleting_a_return_is_blocked_when_units_went_out_again() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    svc.create_checkout(movement(&ana, &[(&item, 10)])).await.unwrap();
    let ret = svc.create_return(movement(&ana, &[(&item, 10)])).await.unwrap();
    svc.create_checkout(movement(&ana, &[(&item, 10)])).await.unwrap();

    let err = svc.delete_movement(ret.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(quantities(&svc, item.id).await, (0, 10, 10));
    assert_eq!(svc.list_movements().await.unwrap().len(), 3);
}

#[tokio::test]
async fn deleting_a_movement_skips_items_that_no_longer_exist() {
    let svc = service();
    let kept = seed_item(&svc, "KEEP", ItemCategory::Supplies, 5).await;
    let gone = seed_item(&svc, "GONE", ItemCategory::Supplies, 5).await;
    let ana = seed_responsible(&svc, "Ana").await;

    svc.create_checkout(movement(&ana, &[(&gone, 2), (&kept, 1)]))
        .await
        .unwrap();
    let ret = svc
        .create_return(movement(&ana, &[(&gone, 2), (&kept, 1)]))
        .await
        .unwrap();
    svc.delete_item(gone.id).await.unwrap();

    svc.delete_movement(ret.id).await.unwrap();
    assert_eq!(svc.list_movements().await.unwrap().len(), 1);
    assert_eq!(quantities(&svc, kept.id).await, (4, 1, 5));
}

#[tokio::test]
async fn reassigning_updates_snapshots_only() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    let bruno = seed_responsible(&svc, "Bruno").await;
    let banca = seed_seller(&svc, "Banca 7").await;

    let mut input = movement(&ana, &[(&item, 3)]);
    input.seller_id = Some(banca.id);
    let m = svc.create_checkout(input).await.unwrap();
    assert_eq!(m.seller_name.as_deref(), Some("Banca 7"));

    let moved = svc
        .update_movement(
            m.id,
            MovementUpdate {
                responsible_id: Some(bruno.id),
                seller_id: None,
                clear_seller: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.responsible_id, bruno.id);
    assert_eq!(moved.responsible_name, "Bruno");
    assert_eq!(moved.seller_id, None);
    assert_eq!(moved.lines, m.lines);
    assert_eq!(svc.get_movement(m.id).await.unwrap(), moved);
    assert_eq!(quantities(&svc, item.id).await, (7, 3, 10));
}

#[tokio::test]
async fn deletion_guards() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    let namesake = seed_responsible(&svc, " ANA ").await;
    let idle = seed_responsible(&svc, "Carla").await;
    let banca = seed_seller(&svc, "Banca 7").await;
    let free_seller = seed_seller(&svc, "Banca 9").await;

    let mut input = movement(&ana, &[(&item, 1)]);
    input.seller_id = Some(banca.id);
    svc.create_checkout(input).await.unwrap();
    let before = svc.get_item(item.id).await.unwrap();

    assert!(matches!(svc.delete_item(item.id).await.unwrap_err(), ServiceError::Conflict(_)));
    assert_eq!(svc.get_item(item.id).await.unwrap(), before);
    assert_eq!(quantities(&svc, item.id).await, (9, 1, 10));
    assert!(matches!(svc.delete_seller(banca.id).await.unwrap_err(), ServiceError::Conflict(_)));
    assert!(matches!(svc.delete_responsible(ana.id).await.unwrap_err(), ServiceError::Conflict(_)));
    assert!(matches!(
        svc.delete_responsible(namesake.id).await.unwrap_err(),
        ServiceError::Conflict(_)
    ));

    svc.delete_seller(free_seller.id).await.unwrap();
    svc.delete_responsible(idle.id).await.unwrap();
    assert_eq!(svc.list_sellers().await.unwrap().len(), 1);
    assert_eq!(svc.list_responsibles().await.unwrap().len(), 2);
}

#[tokio::test]
async fn item_codes_are_unique() {
    let svc = service();
    seed_item(&svc, "VX-01", ItemCategory::VxMachines, 1).await;
    let other = seed_item(&svc, "VX-02", ItemCategory::VxMachines, 1).await;

    let dup = svc
        .create_item(NewItem {
            code: " VX-01 ".to_string(),
            name: "Duplicate".to_string(),
            category: ItemCategory::VxMachines,
            total_quantity: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(dup, ServiceError::Conflict(_)));

    let rename = svc
        .update_item(
            other.id,
            ItemUpdate {
                code: Some("VX-01".to_string()),
                ..ItemUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(rename, ServiceError::Conflict(_)));

    assert_eq!(svc.find_item_by_code("VX-02").await.unwrap().id, other.id);
    assert!(matches!(
        svc.find_item_by_code("NOPE").await.unwrap_err(),
        ServiceError::NotFound { .. }
    ));
}

#[tokio::test]
async fn total_cannot_drop_below_in_use() {
    let svc = service();
    let item = seed_item(&svc, "VX-01", ItemCategory::VxMachines, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    svc.create_checkout(movement(&ana, &[(&item, 4)])).await.unwrap();

    let err = svc
        .update_item(
            item.id,
            ItemUpdate {
                total_quantity: Some(3),
                ..ItemUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ServiceError::Validation(ValidationError::TotalBelowInUse { total: 3, in_use: 4 })
    );

    let grown = svc
        .update_item(
            item.id,
            ItemUpdate {
                total_quantity: Some(12),
                ..ItemUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!((grown.available_quantity, grown.in_use_quantity), (8, 4));
}

#[tokio::test]
async fn failed_item_write_is_compensated() {
    let svc = service();
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let b = seed_item(&svc, "B", ItemCategory::Supplies, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    svc.gateway()
        .set_faults(FaultPlan::new().fail(GatewayOp::UpdateItem, 1, 1))
        .unwrap();

    let err = svc
        .create_checkout(movement(&ana, &[(&a, 2), (&b, 3)]))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Persistence(GatewayError::Storage(_))));
    assert_eq!(quantities(&svc, a.id).await, (10, 0, 10));
    assert_eq!(quantities(&svc, b.id).await, (10, 0, 10));
    assert!(svc.list_movements().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_compensation_is_a_partial_failure() {
    let svc = service();
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let b = seed_item(&svc, "B", ItemCategory::Supplies, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    svc.gateway()
        .set_faults(FaultPlan::new().fail(GatewayOp::UpdateItem, 1, 2))
        .unwrap();

    let err = svc
        .create_checkout(movement(&ana, &[(&a, 2), (&b, 3)]))
        .await
        .unwrap_err();

    match err {
        ServiceError::PartialFailure {
            operation,
            cause,
            compensation,
            ..
        } => {
            assert_eq!(operation, "create");
            assert!(matches!(*cause, ServiceError::Persistence(_)));
            assert!(matches!(*compensation, ServiceError::Persistence(_)));
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_record_delete_restores_stock() {
    let svc = service();
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let b = seed_item(&svc, "B", ItemCategory::Supplies, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    let m = svc
        .create_checkout(movement(&ana, &[(&a, 2), (&b, 3)]))
        .await
        .unwrap();

    svc.gateway()
        .set_faults(FaultPlan::new().fail(GatewayOp::DeleteMovement, 0, 1))
        .unwrap();

    let err = svc.delete_movement(m.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(GatewayError::Storage(_))));
    assert_eq!(quantities(&svc, a.id).await, (8, 2, 10));
    assert_eq!(quantities(&svc, b.id).await, (7, 3, 10));
    assert_eq!(svc.list_movements().await.unwrap().len(), 1);
}

#[tokio::test]
async fn slow_gateway_times_out() {
    let gateway = Arc::new(InMemoryGateway::new().with_latency(Duration::from_millis(200)));
    let svc = InventoryService::new(
        gateway,
        ServiceConfig {
            gateway_timeout: Duration::from_millis(20),
            database_url: None,
        },
    );

    let err = svc.list_items().await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::Persistence(GatewayError::Timeout {
            operation: "list_items",
            after: Duration::from_millis(20),
        })
    );
}

fn late_reply_service(plan: FaultPlan) -> Service {
    InventoryService::new(
        Arc::new(InMemoryGateway::new().with_faults(plan)),
        ServiceConfig {
            gateway_timeout: Duration::from_millis(30),
            database_url: None,
        },
    )
}

#[tokio::test]
async fn item_write_that_lands_after_timeout_is_reverted() {
    // Second item write commits, then the reply arrives too late.
    let svc = late_reply_service(FaultPlan::new().stall_after_write(
        GatewayOp::UpdateItem,
        1,
        1,
        Duration::from_millis(200),
    ));
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let b = seed_item(&svc, "B", ItemCategory::Supplies, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    let err = svc
        .create_checkout(movement(&ana, &[(&a, 2), (&b, 3)]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::Persistence(GatewayError::Timeout {
            operation: "update_item",
            after: Duration::from_millis(30),
        })
    );
    assert_eq!(quantities(&svc, a.id).await, (10, 0, 10));
    assert_eq!(quantities(&svc, b.id).await, (10, 0, 10));
    assert!(svc.list_movements().await.unwrap().is_empty());
}

#[tokio::test]
async fn movement_insert_that_lands_after_timeout_is_kept() {
    let svc = late_reply_service(FaultPlan::new().stall_after_write(
        GatewayOp::InsertMovement,
        0,
        1,
        Duration::from_millis(200),
    ));
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;

    let m = svc.create_checkout(movement(&ana, &[(&a, 4)])).await.unwrap();

    assert_eq!(quantities(&svc, a.id).await, (6, 4, 10));
    assert_eq!(svc.list_movements().await.unwrap(), vec![m]);
}

#[tokio::test]
async fn movement_delete_that_lands_after_timeout_keeps_stock_reversed() {
    let svc = late_reply_service(FaultPlan::new());
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 10).await;
    let ana = seed_responsible(&svc, "Ana").await;
    let m = svc.create_checkout(movement(&ana, &[(&a, 4)])).await.unwrap();

    svc.gateway()
        .set_faults(FaultPlan::new().stall_after_write(
            GatewayOp::DeleteMovement,
            0,
            1,
            Duration::from_millis(200),
        ))
        .unwrap();

    svc.delete_movement(m.id).await.unwrap();
    assert_eq!(quantities(&svc, a.id).await, (10, 0, 10));
    assert!(svc.list_movements().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_writers_cannot_oversell() {
    // Two services over one store stand in for two processes.
    let gateway = Arc::new(InMemoryGateway::new().with_latency(Duration::from_millis(10)));
    let first = service_on(gateway.clone());
    let second = service_on(gateway);

    let item = seed_item(&first, "VX-01", ItemCategory::VxMachines, 5).await;
    let ana = seed_responsible(&first, "Ana").await;

    let (r1, r2) = tokio::join!(
        first.create_checkout(movement(&ana, &[(&item, 3)])),
        second.create_checkout(movement(&ana, &[(&item, 3)])),
    );

    let results = [r1, r2];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ServiceError::Conflict(_)))));
    assert_eq!(quantities(&first, item.id).await, (2, 3, 5));
    assert_eq!(first.list_movements().await.unwrap().len(), 1);
}

#[test]
fn stale_version_maps_to_conflict() {
    let err = ServiceError::from(GatewayError::VersionConflict {
        entity: "item",
        id: "x".to_string(),
        expected: stocktrack_core::ExpectedVersion::Exact(1),
        actual: 2,
    });
    assert!(matches!(err, ServiceError::Conflict(msg) if msg.contains("found 2")));
}

#[tokio::test]
async fn stats_reflect_current_state() {
    let svc = service();
    let a = seed_item(&svc, "A", ItemCategory::Supplies, 7).await;
    seed_item(&svc, "B", ItemCategory::Benches, 2).await;
    let ana = seed_responsible(&svc, "Ana").await;
    seed_seller(&svc, "Banca 7").await;

    for _ in 0..3 {
        svc.create_checkout(movement(&ana, &[(&a, 1)])).await.unwrap();
    }
    svc.create_return(movement(&ana, &[(&a, 1)])).await.unwrap();

    let stats = svc.stats().await.unwrap();
    assert_eq!(stats.total_checkouts, 3);
    assert_eq!(stats.total_returns, 1);
    assert_eq!(
        stats.stock_by_category,
        std::collections::BTreeMap::from([(ItemCategory::Supplies, 5), (ItemCategory::Benches, 2)])
    );
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.total_sellers, 1);
    assert_eq!(stats.total_responsibles, 1);
}
