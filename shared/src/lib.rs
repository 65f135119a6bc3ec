//! Shared types and models for the multi-warehouse inventory platform
//!
//! This crate holds the domain vocabulary (products, warehouses, stock levels,
//! movements) and the pure stock rules. It performs no IO; the backend crate
//! persists these types and drives the rules inside database transactions.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
