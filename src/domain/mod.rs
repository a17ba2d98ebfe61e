//! Domain layer - core business logic and entities

pub mod arbitrage;
pub mod subscription;
pub mod trade;
