//! Stock engine services

pub mod movement;
pub mod physical_count;
pub mod reconciliation;
pub mod reporting;
pub mod transfer;
pub mod warehouse;

pub use movement::{AdjustmentRequest, MovementEngine, MovementRequest};
pub use physical_count::{CountItem, PhysicalCountReconciler};
pub use reconciliation::ReconciliationService;
pub use reporting::{Kardex, KardexQuery, MovementQuery, ReportingService};
pub use transfer::{TransferOrchestrator, TransferReceipt, TransferRequest};
pub use warehouse::WarehouseService;
