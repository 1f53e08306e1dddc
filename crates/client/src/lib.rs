//! Remote decision client implementations for Rookery.
//!
//! All clients implement the `rookery_core::DecisionClient` trait.

pub mod gateway;

pub use gateway::GatewayClient;
