//! HTTP request handlers

pub mod health;
pub mod kardex;
pub mod movement;
pub mod stock;
pub mod warehouse;

pub use health::*;
pub use kardex::*;
pub use movement::*;
pub use stock::*;
pub use warehouse::*;
