//! Domain models for the inventory platform

mod movement;
mod product;
mod stock;
mod warehouse;

pub use movement::*;
pub use product::*;
pub use stock::*;
pub use warehouse::*;
